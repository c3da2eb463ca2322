/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// solver module
//
// adaptive Runge-Kutta integration (Dormand-Prince 5(4)) through ode_solvers
// the solution is reported at the points of an evenly spaced time grid
//
////////////////////////////////////////////////////////////////////////////////////

use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, System, Vector4};
use std::convert::TryFrom;
use std::error::Error;
use std::fmt;

pub type State = Vector4<f64>;

// step size control constants (the Dopri5::new defaults)
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const STIFFNESS_CHECK: u32 = 1000;

// relative slack allowed when matching grid points
const GRID_TOLERANCE: f64 = 1e-6;

// Settings -----------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolverSettings {
    pub rtol: f64,        // relative tolerance
    pub atol: f64,        // absolute tolerance
    pub max_steps: usize, // steps allowed over the whole run
}

impl Default for SolverSettings {
    fn default() -> SolverSettings {
        SolverSettings {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            max_steps: 100_000,
        }
    }
}

// Errors -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    EmptyGrid,
    NonIncreasingGrid { index: usize },
    UnevenGrid { index: usize },
    NonFinite { t: f64 },
    MissingOutput { t: f64 },
    Integration(String), // reported by ode_solvers
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverError::EmptyGrid => write!(f, "time grid is empty"),
            SolverError::NonIncreasingGrid { index } => {
                write!(f, "time grid is not strictly increasing at index {}", index)
            }
            SolverError::UnevenGrid { index } => {
                write!(f, "time grid is not evenly spaced at index {}", index)
            }
            SolverError::NonFinite { t } => write!(f, "non-finite state at t = {}", t),
            SolverError::MissingOutput { t } => write!(f, "no solver output at t = {}", t),
            SolverError::Integration(reason) => write!(f, "integration failed: {}", reason),
        }
    }
}

impl Error for SolverError {}

// Results ------------------------------------------------------------------------------------------------
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SolverStats {
    pub evaluations: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl fmt::Display for SolverStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} steps accepted, {} rejected, {} derivative evaluations",
            self.accepted, self.rejected, self.evaluations
        )
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub times: Vec<f64>,
    pub states: Vec<[f64; 4]>, // one row per grid point
    pub stats: SolverStats,
}

fn to_array(y: &State) -> [f64; 4] {
    [y[0], y[1], y[2], y[3]]
}

// Integrate `system` from `y0` at `grid[0]` and report the state at every grid point.
// Row 0 of the solution is `y0` itself.
pub fn integrate<S>(
    system: S,
    y0: [f64; 4],
    grid: &[f64],
    settings: &SolverSettings,
) -> Result<Solution, SolverError>
where
    S: System<f64, State>,
{
    let t0 = *grid.first().ok_or(SolverError::EmptyGrid)?;
    if let Some(index) = grid.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(SolverError::NonIncreasingGrid { index: index + 1 });
    }
    if !y0.iter().all(|v| v.is_finite()) {
        return Err(SolverError::NonFinite { t: t0 });
    }
    if grid.len() == 1 {
        return Ok(Solution {
            times: grid.to_vec(),
            states: vec![y0],
            stats: SolverStats::default(),
        });
    }

    // dense output is produced every `spacing` days, so the grid must be regular
    let last = grid[grid.len() - 1];
    let spacing = (last - t0) / (grid.len() - 1) as f64;
    let tolerance = GRID_TOLERANCE * spacing;
    if let Some(index) = grid
        .iter()
        .enumerate()
        .position(|(i, t)| (t - (t0 + i as f64 * spacing)).abs() > tolerance)
    {
        return Err(SolverError::UnevenGrid { index });
    }

    // run half a step past the last grid point so rounding in the dense output
    // time cannot drop it
    let t_end = last + 0.5 * spacing;
    let mut stepper = Dopri5::from_param(
        system,
        t0,
        t_end,
        spacing,
        State::new(y0[0], y0[1], y0[2], y0[3]),
        settings.rtol,
        settings.atol,
        SAFETY_FACTOR,
        BETA,
        FAC_MIN,
        FAC_MAX,
        t_end - t0,
        0.0,
        u32::try_from(settings.max_steps).unwrap_or(u32::MAX),
        STIFFNESS_CHECK,
        OutputType::Dense,
    );
    let stats = stepper
        .integrate()
        .map_err(|e| SolverError::Integration(format!("{:?}", e)))?;

    let mut outputs = stepper.x_out().iter().zip(stepper.y_out().iter());
    let mut states = Vec::with_capacity(grid.len());
    states.push(y0);
    for &t in &grid[1..] {
        let (_, y) = outputs
            .find(|(x, _)| (**x - t).abs() <= tolerance)
            .ok_or(SolverError::MissingOutput { t })?;
        if !y.iter().all(|v| v.is_finite()) {
            return Err(SolverError::NonFinite { t });
        }
        states.push(to_array(y));
    }

    Ok(Solution {
        times: grid.to_vec(),
        states,
        stats: SolverStats {
            evaluations: stats.num_eval as usize,
            accepted: stats.accepted_steps as usize,
            rejected: stats.rejected_steps as usize,
        },
    })
}
