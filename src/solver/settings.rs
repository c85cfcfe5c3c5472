use crate::algebra::*;
use derive_builder::Builder;

/// Solver settings.
///
/// Defaults are produced with `Settings::default()`; individual values
/// can be overridden through [`SettingsBuilder`](SettingsBuilder):
///
/// ```no_run
/// use lorentz::solver::SettingsBuilder;
///
/// let settings = SettingsBuilder::<f64>::default()
///     .maxit(50)
///     .verbose(true)
///     .build()
///     .unwrap();
/// ```

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Settings<T: FloatT> {
    ///step shortening applied to the combined search direction
    #[builder(default = "(0.99).as_T()")]
    pub gamma: T,

    ///static KKT regularization
    #[builder(default = "(2e-7).as_T()")]
    pub delta: T,

    ///line search curvature floor.  A direction with no blocking
    ///constraint yields the practically-infinite step 1/eps
    #[builder(default = "(1e-13).as_T()")]
    pub eps: T,

    ///primal/dual feasibility tolerance
    #[builder(default = "(1e-8).as_T()")]
    pub feastol: T,

    ///absolute duality gap tolerance
    #[builder(default = "(1e-8).as_T()")]
    pub abstol: T,

    ///relative duality gap tolerance
    #[builder(default = "(1e-8).as_T()")]
    pub reltol: T,

    ///reduced-accuracy feasibility tolerance
    #[builder(default = "(1e-4).as_T()")]
    pub feastol_inacc: T,

    ///reduced-accuracy absolute gap tolerance
    #[builder(default = "(5e-5).as_T()")]
    pub abstol_inacc: T,

    ///reduced-accuracy relative gap tolerance
    #[builder(default = "(5e-5).as_T()")]
    pub reltol_inacc: T,

    ///maximum iterative refinement steps per KKT solve
    #[builder(default = "9")]
    pub nitref: u32,

    ///maximum interior-point iterations
    #[builder(default = "100")]
    pub maxit: u32,

    ///linear system solve accuracy target for iterative refinement
    #[builder(default = "(1e-14).as_T()")]
    pub linsysacc: T,

    ///iterative refinement stagnation factor
    #[builder(default = "(6.0).as_T()")]
    pub irerrfact: T,

    ///minimum step length
    #[builder(default = "(1e-6).as_T()")]
    pub stepmin: T,

    ///maximum step length
    #[builder(default = "(0.999).as_T()")]
    pub stepmax: T,

    ///minimum centering parameter
    #[builder(default = "(1e-4).as_T()")]
    pub sigmamin: T,

    ///maximum centering parameter
    #[builder(default = "(1.0).as_T()")]
    pub sigmamax: T,

    ///Ruiz equilibration sweeps
    #[builder(default = "3")]
    pub equil_iters: u32,

    ///enable data equilibration
    #[builder(default = "true")]
    pub equilibrate_enable: bool,

    ///direct linear solver (only "qdldl" is built in)
    #[builder(default = r#""qdldl".to_string()"#)]
    pub direct_solve_method: String,

    ///per-iteration progress printing
    #[builder(default = "false")]
    pub verbose: bool,
}

impl<T> Default for Settings<T>
where
    T: FloatT,
{
    fn default() -> Settings<T> {
        SettingsBuilder::<T>::default().build().unwrap()
    }
}

/// Automatic pre-build settings validation
impl<T> SettingsBuilder<T>
where
    T: FloatT,
{
    fn validate(&self) -> Result<(), String> {
        if let Some(ref direct_solve_method) = self.direct_solve_method {
            validate_direct_solve_method(direct_solve_method.as_str())?;
        }
        Ok(())
    }
}

fn validate_direct_solve_method(direct_solve_method: &str) -> Result<(), String> {
    match direct_solve_method {
        "qdldl" => Ok(()),
        _ => Err(format!(
            "Invalid direct_solve_method: {:?}",
            direct_solve_method
        )),
    }
}

#[test]
fn test_settings_validate() {
    // all standard settings
    SettingsBuilder::<f64>::default().build().unwrap();

    // fail on unknown direct solve method
    assert!(SettingsBuilder::<f64>::default()
        .direct_solve_method("foo".to_string())
        .build()
        .is_err());
}
