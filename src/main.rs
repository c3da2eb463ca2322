use log::{error, info, LevelFilter};
use std::env;
use std::error::Error;
use std::path::Path;
use std::process;

mod chart;
mod data_management;
mod logging;
mod model;
mod solver;
mod stats;
mod utilities;

fn main() {
    if let Err(e) = logging::init(LevelFilter::Info) {
        eprintln!("cannot start logging: {}", e);
        process::exit(1);
    }

    // process command line arguments (for now just an optional parameter file)
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() > 1 {
        error!("usage: mask-sird [PARMS_YAML] ({} arguments given)", args.len());
        process::exit(2);
    }
    let parameter_file = args.first().map(String::as_str);

    // The model data store handles all models inputs and outputs
    let model_data_store = data_management::ModelDataStore::new(parameter_file, Path::new("."));

    process::exit(exit_code(run(&model_data_store)));
}

// A failed run is reported once, through the logger, and becomes status 1.
fn exit_code(outcome: Result<(), Box<dyn Error>>) -> i32 {
    match outcome {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

fn run(model_data_store: &data_management::ModelDataStore) -> Result<(), Box<dyn Error>> {
    let model_parms = model_data_store.get_model_parms()?;
    info!("--------------------Mask SIRD Model-----------------------");
    for line in model_parms.to_string().lines() {
        info!("{}", line);
    }

    let y0 = model_parms.initial.compartments(model_parms.disease.population);
    info!("initial state {} (total {:.0})", y0, y0.total());

    let (trajectory, solver_stats) = stats::simulate(&model_parms)?;
    info!("integration done: {}", solver_stats);

    if let Some((day, peak)) = trajectory.peak_infected() {
        info!(
            "infected peak {:.0} ({:.2}% of population) on day {:.1}",
            peak,
            100.0 * peak / trajectory.population,
            day
        );
    }
    if let Some(last) = trajectory.final_normalized() {
        info!(
            "after {} days: susceptible {:.4} infected {:.4} recovered {:.4} deceased {:.4}",
            model_parms.horizon, last.susceptible, last.infected, last.recovered, last.deceased
        );
    }

    let figure_path = model_data_store.figure_path(&model_parms);
    chart::draw(&trajectory, &model_parms.title, &figure_path)?;
    info!("figure saved to {}", figure_path.display());
    chart::show(&figure_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_run_exits_non_zero() {
        assert_eq!(exit_code(Ok(())), 0);
        assert_eq!(exit_code(Err("time grid is empty".into())), 1);
    }
}
