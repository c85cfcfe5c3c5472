use super::cones::ConeSet;
use super::info::SolveInfo;
use super::problemdata::ProblemData;
use super::settings::Settings;
use crate::algebra::*;

// ---------------------------------
// per-iteration console reporting, enabled by settings.verbose
// ---------------------------------

pub(crate) fn print_banner<T: FloatT>(
    settings: &Settings<T>,
    data: &ProblemData<T>,
    cones: &ConeSet<T>,
) {
    if !settings.verbose {
        return;
    }
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    println!("---------------------------------------------------------");
    println!("            lorentz v{}  -  conic IP solver", VERSION);
    println!("---------------------------------------------------------");
    println!(
        "problem:  variables n = {}, equalities p = {}, conic rows m = {}",
        data.n, data.p, data.m
    );
    println!(
        "cones  :  orthant dim = {}, second-order cones = {:?}",
        data.l, data.soc_dims
    );
    println!(
        "settings: feastol = {:.1e}, abstol = {:.1e}, reltol = {:.1e}, maxit = {}",
        settings.feastol, settings.abstol, settings.reltol, settings.maxit
    );
    println!();
    println!(
        "{:>4} {:>11} {:>11} {:>9} {:>9} {:>9} {:>9} {:>9} {:>6} {:>6}  {}",
        "iter", "pcost", "dcost", "gap", "pres", "dres", "k/t", "mu", "step", "sigma", "IR"
    );
}

pub(crate) fn print_status<T: FloatT>(info: &SolveInfo<T>, settings: &Settings<T>) {
    if !settings.verbose {
        return;
    }
    println!(
        "{:>4} {:>11.4e} {:>11.4e} {:>9.2e} {:>9.2e} {:>9.2e} {:>9.2e} {:>9.2e} {:>6.4} {:>6.4}  {} {} {}",
        info.iter,
        info.pcost,
        info.dcost,
        info.gap,
        info.pres,
        info.dres,
        info.kapovert,
        info.mu,
        info.step,
        info.sigma,
        info.nitref1,
        info.nitref2,
        info.nitref3,
    );
}

pub(crate) fn print_footer<T: FloatT>(info: &SolveInfo<T>, settings: &Settings<T>) {
    if !settings.verbose {
        return;
    }
    println!();
    println!("terminated with status: {}", info.status);
    println!("---------------------------------------------------------");
}
