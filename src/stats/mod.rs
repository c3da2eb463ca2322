/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// stats module
//
// runs the model over the time grid and summarises the resulting trajectory
//
////////////////////////////////////////////////////////////////////////////////////
use super::data_management::ModelParameters;
use super::model::{Compartment, Compartments};
use super::solver::{self, Solution, SolverError, SolverStats};

pub struct Trajectory {
    pub times: Vec<f64>,
    pub rows: Vec<Compartments>, // one row per time point
    pub population: f64,
}

impl Trajectory {
    pub fn from_solution(solution: &Solution, population: f64) -> Trajectory {
        Trajectory {
            times: solution.times.clone(),
            rows: solution
                .states
                .iter()
                .map(Compartments::from_array)
                .collect(),
            population,
        }
    }

    // (time, value / N) pairs for one compartment
    pub fn normalized_series(&self, compartment: Compartment) -> Vec<(f64, f64)> {
        self.times
            .iter()
            .zip(self.rows.iter())
            .map(|(t, row)| (*t, compartment.of(row) / self.population))
            .collect()
    }

    // day and size of the largest infected count on the grid
    pub fn peak_infected(&self) -> Option<(f64, f64)> {
        self.times
            .iter()
            .zip(self.rows.iter())
            .map(|(t, row)| (*t, row.infected))
            .fold(None, |peak, (t, infected)| match peak {
                Some((_, best)) if best >= infected => peak,
                _ => Some((t, infected)),
            })
    }

    pub fn final_normalized(&self) -> Option<Compartments> {
        self.rows.last().map(|row| row.normalized(self.population))
    }
}

// Integrate the disease model over the parameter set's time grid.
pub fn simulate(parms: &ModelParameters) -> Result<(Trajectory, SolverStats), SolverError> {
    let grid = parms.time_grid();
    let y0 = parms.initial.compartments(parms.disease.population);
    let solution = solver::integrate(parms.disease, y0.to_array(), &grid, &parms.solver)?;
    Ok((
        Trajectory::from_solution(&solution, parms.disease.population),
        solution.stats,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn default_run() -> Trajectory {
        simulate(&ModelParameters::default()).unwrap().0
    }

    fn non_decreasing(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[1] >= w[0] * (1.0 - 1e-12))
    }

    fn non_increasing(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[1] <= w[0] * (1.0 + 1e-12))
    }

    #[test]
    fn first_row_is_the_initial_state() {
        let trajectory = default_run();
        assert_eq!(trajectory.rows.len(), 200);
        assert_eq!(trajectory.times.len(), 200);
        let first = trajectory.rows[0].normalized(trajectory.population);
        assert_abs_diff_eq!(first.susceptible, 0.983654, epsilon = 1e-6);
        assert_abs_diff_eq!(first.infected, 0.00101, epsilon = 1e-5);
        assert_abs_diff_eq!(first.recovered, 0.01534, epsilon = 1e-5);
        assert_abs_diff_eq!(first.deceased, 0.000907, epsilon = 1e-6);
    }

    #[test]
    fn trajectory_shape() {
        let trajectory = default_run();
        let column = |c: Compartment| -> Vec<f64> {
            trajectory.rows.iter().map(|row| c.of(row)).collect()
        };

        assert!(non_increasing(&column(Compartment::Susceptible)));
        assert!(non_decreasing(&column(Compartment::Recovered)));
        assert!(non_decreasing(&column(Compartment::Deceased)));

        let infected = column(Compartment::Infected);
        let (peak_day, peak) = trajectory.peak_infected().unwrap();
        let peak_index = trajectory.times.iter().position(|t| *t == peak_day).unwrap();
        assert!(peak_index > 0 && peak_index < infected.len() - 1);
        assert!(non_decreasing(&infected[..=peak_index]));
        assert!(non_increasing(&infected[peak_index..]));
        assert!(peak_day > 80.0 && peak_day < 95.0, "peak on day {}", peak_day);
        assert_relative_eq!(peak / trajectory.population, 0.01312, max_relative = 5e-3);
    }

    #[test]
    fn total_keeps_initial_excess() {
        // S0 leaves O0 in, so every row sums to N + O0
        let trajectory = default_run();
        for row in &trajectory.rows {
            assert_relative_eq!(row.total(), 9_616_621.0 + 8724.0, max_relative = 1e-8);
        }
    }

    #[test]
    fn final_state() {
        let last = default_run().final_normalized().unwrap();
        assert_abs_diff_eq!(last.susceptible, 0.6964, epsilon = 1e-3);
        assert_abs_diff_eq!(last.recovered, 0.2412, epsilon = 1e-3);
        assert_abs_diff_eq!(last.deceased, 0.0628, epsilon = 1e-3);
    }

    #[test]
    fn normalized_series_pairs_time_and_fraction() {
        let trajectory = default_run();
        let series = trajectory.normalized_series(Compartment::Deceased);
        assert_eq!(series.len(), 200);
        assert_eq!(series[0].0, 0.0);
        assert_eq!(series[0].1, 8724.0 / 9_616_621.0);
        assert_eq!(series[199].0, 200.0);
    }

    #[test]
    fn empty_trajectory_has_no_summary() {
        let trajectory = Trajectory {
            times: Vec::new(),
            rows: Vec::new(),
            population: 1.0,
        };
        assert!(trajectory.peak_infected().is_none());
        assert!(trajectory.final_normalized().is_none());
    }
}
