/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// model module
//
// compartments are Susceptible, Infected, Recovered and Deceased (O)
// transmission runs along two pathways: contacts where masks are effective
// and contacts where they are not
//
////////////////////////////////////////////////////////////////////////////////////

use super::solver::State;
use ode_solvers::System;
use std::fmt;

// built-in scenario ---------------------------------------------------------------------------------------
pub const POPULATION: f64 = 9_616_621.0;
pub const INITIAL_INFECTED: f64 = 9670.0;
pub const INITIAL_RECOVERED: f64 = 147_528.0;
pub const INITIAL_DECEASED: f64 = 8724.0;
pub const CONTACT_RATE: f64 = 0.49;
pub const INFECTIOUS_PERIOD: f64 = 5.2; // days
pub const FATALITY_RATE: f64 = 0.0527;
pub const MASK_EFFECTIVENESS: f64 = 0.5;
pub const MASK_USAGE: f64 = 0.8;
pub const HORIZON: f64 = 200.0; // days
pub const SAMPLES: usize = 200;
pub const SCENARIO_TITLE: &str = "20% Effectiveness, 40% Usage";
pub const OUTPUT_STEM: &str = "20_40";

// Compartments -------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Compartments {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub deceased: f64,
}

impl Compartments {
    pub fn new(susceptible: f64, infected: f64, recovered: f64, deceased: f64) -> Compartments {
        Compartments {
            susceptible,
            infected,
            recovered,
            deceased,
        }
    }

    pub fn from_array(y: &[f64; 4]) -> Compartments {
        Compartments::new(y[0], y[1], y[2], y[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.susceptible, self.infected, self.recovered, self.deceased]
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered + self.deceased
    }

    // each compartment as a fraction of the population
    pub fn normalized(&self, population: f64) -> Compartments {
        Compartments::new(
            self.susceptible / population,
            self.infected / population,
            self.recovered / population,
            self.deceased / population,
        )
    }
}

impl fmt::Display for Compartments {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "S {:.1} I {:.1} R {:.1} O {:.1}",
            self.susceptible, self.infected, self.recovered, self.deceased
        )
    }
}

// Compartment labels ------------------------------------------------------------------------------------
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Compartment {
    Susceptible,
    Infected,
    Recovered,
    Deceased,
}

impl Compartment {
    pub const ALL: [Compartment; 4] = [
        Compartment::Susceptible,
        Compartment::Infected,
        Compartment::Recovered,
        Compartment::Deceased,
    ];

    pub fn of(&self, state: &Compartments) -> f64 {
        match self {
            Compartment::Susceptible => state.susceptible,
            Compartment::Infected => state.infected,
            Compartment::Recovered => state.recovered,
            Compartment::Deceased => state.deceased,
        }
    }

    // legend text
    pub fn label(&self) -> &'static str {
        match self {
            Compartment::Susceptible => "Susceptible",
            Compartment::Infected => "Infected",
            Compartment::Recovered => "Recovered with immunity",
            Compartment::Deceased => "Deceased",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// Initial conditions -------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InitialConditions {
    pub infected: f64,
    pub recovered: f64,
    pub deceased: f64,
}

impl InitialConditions {
    // Susceptibles are what is left once infected and recovered are taken out.
    // Deaths are not subtracted, so S + I + R + O exceeds N by O0 at t = 0.
    pub fn compartments(&self, population: f64) -> Compartments {
        Compartments::new(
            population - self.infected - self.recovered,
            self.infected,
            self.recovered,
            self.deceased,
        )
    }
}

impl Default for InitialConditions {
    fn default() -> InitialConditions {
        InitialConditions {
            infected: INITIAL_INFECTED,
            recovered: INITIAL_RECOVERED,
            deceased: INITIAL_DECEASED,
        }
    }
}

// Disease parameters -------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DiseaseParms {
    pub population: f64,
    pub beta: f64,   // contact rate
    pub gamma: f64,  // recovery rate, 1 / mean infectious period
    pub lambda: f64, // fatality rate
    pub alpha: f64,  // fraction of the population wearing masks
    pub mi: f64,     // mask effectiveness
}

impl DiseaseParms {
    // New infections per day, split into the (masked, unmasked) pathways.
    pub fn new_infections(&self, susceptible: f64, infected: f64) -> (f64, f64) {
        let contacts = self.beta * susceptible * infected;
        let masked = contacts * (1.0 - self.alpha) * self.mi / self.population;
        let unmasked = contacts * (1.0 - self.mi) / self.population;
        (masked, unmasked)
    }

    // dS/dt, dI/dt, dR/dt, dO/dt
    pub fn rates(&self, state: &Compartments) -> Compartments {
        let (masked, unmasked) = self.new_infections(state.susceptible, state.infected);
        let infections = masked + unmasked;
        Compartments::new(
            -infections,
            infections - (self.gamma * state.infected + self.lambda * state.infected),
            self.gamma * state.infected,
            self.lambda * state.infected,
        )
    }
}

impl Default for DiseaseParms {
    fn default() -> DiseaseParms {
        DiseaseParms {
            population: POPULATION,
            beta: CONTACT_RATE,
            gamma: 1.0 / INFECTIOUS_PERIOD,
            lambda: FATALITY_RATE,
            alpha: MASK_USAGE,
            mi: MASK_EFFECTIVENESS,
        }
    }
}

impl fmt::Display for DiseaseParms {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "N {} beta {} gamma {:.4} lambda {} mask usage {} mask effectiveness {}",
            self.population, self.beta, self.gamma, self.lambda, self.alpha, self.mi
        )
    }
}

impl System<f64, State> for DiseaseParms {
    fn system(&self, _t: f64, y: &State, dy: &mut State) {
        let d = self.rates(&Compartments::new(y[0], y[1], y[2], y[3]));
        dy[0] = d.susceptible;
        dy[1] = d.infected;
        dy[2] = d.recovered;
        dy[3] = d.deceased;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_states() -> Vec<Compartments> {
        vec![
            Compartments::new(9_459_423.0, 9670.0, 147_528.0, 8724.0),
            Compartments::new(5_000_000.0, 2_000_000.0, 2_500_000.0, 116_621.0),
            Compartments::new(1.0, 3.0, 0.5, 0.0),
            Compartments::new(0.0, 1000.0, 10.0, 10.0),
        ]
    }

    fn sample_parms() -> Vec<DiseaseParms> {
        vec![
            DiseaseParms::default(),
            DiseaseParms {
                alpha: 0.0,
                mi: 0.0,
                ..DiseaseParms::default()
            },
            DiseaseParms {
                population: 1000.0,
                beta: 2.5,
                gamma: 0.1,
                lambda: 0.3,
                alpha: 1.7,
                mi: -0.2,
            },
        ]
    }

    #[test]
    fn derivatives_sum_to_zero() {
        for parms in sample_parms() {
            for state in sample_states() {
                let d = parms.rates(&state);
                let scale = d.susceptible.abs() + d.infected.abs() + 1.0;
                assert!(d.total().abs() <= 1e-12 * scale, "{} -> {}", state, d);
            }
        }
    }

    #[test]
    fn disease_free_state_is_fixed_point() {
        for parms in sample_parms() {
            let d = parms.rates(&Compartments::new(9_000_000.0, 0.0, 600_000.0, 16_621.0));
            assert_eq!(d.to_array(), [0.0; 4]);
        }
    }

    #[test]
    fn no_masks_reduces_to_bilinear_transmission() {
        let parms = DiseaseParms {
            alpha: 0.0,
            mi: 0.0,
            ..DiseaseParms::default()
        };
        let state = sample_states()[0];
        let (masked, unmasked) = parms.new_infections(state.susceptible, state.infected);
        assert_eq!(masked, 0.0);
        let classic = parms.beta * state.susceptible * state.infected / parms.population;
        assert_relative_eq!(unmasked, classic, max_relative = 1e-15);
        assert_relative_eq!(parms.rates(&state).susceptible, -classic, max_relative = 1e-15);
    }

    #[test]
    fn transmission_formula_is_reproduced() {
        let parms = DiseaseParms::default();
        let (s, i) = (9_459_423.0, 9670.0);
        let expected_masked = 0.49 * s * i * (1.0 - 0.8) * 0.5 / 9_616_621.0;
        let expected_unmasked = 0.49 * s * i * (1.0 - 0.5) / 9_616_621.0;
        let (masked, unmasked) = parms.new_infections(s, i);
        assert_eq!(masked, expected_masked);
        assert_eq!(unmasked, expected_unmasked);

        let d = parms.rates(&Compartments::new(s, i, 0.0, 0.0));
        assert_eq!(
            d.infected,
            (expected_masked + expected_unmasked) - (((1.0 / 5.2) * i) + (0.0527 * i))
        );
    }

    #[test]
    fn recovered_and_deceased_never_decrease() {
        for state in sample_states() {
            let d = DiseaseParms::default().rates(&state);
            assert!(d.recovered >= 0.0);
            assert!(d.deceased >= 0.0);
        }
    }

    #[test]
    fn rates_scale_with_population() {
        let parms = DiseaseParms::default();
        let state = sample_states()[1];
        let k = 3.5;
        let scaled_parms = DiseaseParms {
            population: parms.population * k,
            ..parms
        };
        let scaled_state = Compartments::new(
            state.susceptible * k,
            state.infected * k,
            state.recovered * k,
            state.deceased * k,
        );
        let d = parms.rates(&state).to_array();
        let scaled = scaled_parms.rates(&scaled_state).to_array();
        for (a, b) in d.iter().zip(scaled.iter()) {
            assert_relative_eq!(a * k, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn initial_susceptibles_ignore_deaths() {
        let y0 = InitialConditions::default().compartments(POPULATION);
        assert_eq!(y0.susceptible, 9_459_423.0);
        assert_eq!(y0.total(), POPULATION + INITIAL_DECEASED);

        let n = y0.normalized(POPULATION);
        assert_relative_eq!(n.susceptible, 0.983654, epsilon = 1e-6);
        assert_relative_eq!(n.infected, 0.001006, epsilon = 1e-6);
        assert_relative_eq!(n.recovered, 0.01534, epsilon = 1e-5);
        assert_relative_eq!(n.deceased, 0.000907, epsilon = 1e-6);
    }

    #[test]
    fn ode_system_matches_rates() {
        let parms = DiseaseParms::default();
        for state in sample_states() {
            let y = State::new(state.susceptible, state.infected, state.recovered, state.deceased);
            let mut dy = State::zeros();
            parms.system(12.0, &y, &mut dy);
            assert_eq!([dy[0], dy[1], dy[2], dy[3]], parms.rates(&state).to_array());
        }
    }

    #[test]
    fn legend_labels() {
        let labels: Vec<&str> = Compartment::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec!["Susceptible", "Infected", "Recovered with immunity", "Deceased"]
        );
        assert_eq!(Compartment::Recovered.to_string(), "Recovered with immunity");
    }
}
