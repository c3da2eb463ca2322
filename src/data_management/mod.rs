/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// data_managment module
//
// functions to read and write from file system
//
////////////////////////////////////////////////////////////////////////////////////

extern crate yaml_rust;

use super::model::{self, DiseaseParms, InitialConditions};
use super::solver::SolverSettings;
use super::utilities;
use log::{debug, warn};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use yaml_rust::{ScanError, Yaml, YamlLoader};

// -------------------------------- File paths -------------------------------------------------------------
pub struct ModelDataStore {
    parameter_file: Option<PathBuf>,
    output_dir: PathBuf,
}

impl ModelDataStore {
    // without a parameter file the built-in scenario is run
    // figures are written to output_dir
    pub fn new(parameter_file: Option<&str>, output_dir: &Path) -> ModelDataStore {
        ModelDataStore {
            parameter_file: parameter_file.map(PathBuf::from),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn get_model_parms(&self) -> Result<ModelParameters, DataError> {
        match &self.parameter_file {
            None => Ok(ModelParameters::default()),
            Some(path) => {
                debug!("reading parameter file {}", path.display());
                let parm_string = fs::read_to_string(path)?;
                ModelParameters::from_yaml_str(&parm_string)
            }
        }
    }

    pub fn figure_path(&self, parms: &ModelParameters) -> PathBuf {
        self.output_dir.join(format!("{}.pdf", parms.output_stem))
    }
}

// ----------------------------- Errors --------------------------------------------------------------------
#[derive(Debug)]
pub enum DataError {
    Io(io::Error),
    Yaml(ScanError),
    EmptyDocument,
    WrongType { key: String, expected: &'static str },
    Conflict(String),
    Invalid(String),
}

impl From<io::Error> for DataError {
    fn from(error: io::Error) -> Self {
        DataError::Io(error)
    }
}

impl From<ScanError> for DataError {
    fn from(error: ScanError) -> Self {
        DataError::Yaml(error)
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataError::Io(e) => write!(f, "cannot read parameter file - {}", e),
            DataError::Yaml(e) => write!(f, "parameter file is not valid YAML - {}", e),
            DataError::EmptyDocument => write!(f, "parameter file is empty"),
            DataError::WrongType { key, expected } => {
                write!(f, "parameter '{}' must be {}", key, expected)
            }
            DataError::Conflict(msg) | DataError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for DataError {}

// ----------------------------- Model parameters ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub model_name: String,
    pub disease: DiseaseParms,
    pub initial: InitialConditions,
    pub horizon: f64,  // days
    pub samples: usize, // points on the time grid
    pub solver: SolverSettings,
    pub title: String,
    pub output_stem: String,
}

impl Default for ModelParameters {
    fn default() -> ModelParameters {
        ModelParameters {
            model_name: String::from("Mask SIRD"),
            disease: DiseaseParms::default(),
            initial: InitialConditions::default(),
            horizon: model::HORIZON,
            samples: model::SAMPLES,
            solver: SolverSettings::default(),
            title: String::from(model::SCENARIO_TITLE),
            output_stem: String::from(model::OUTPUT_STEM),
        }
    }
}

impl ModelParameters {
    // Every key is optional and keeps the built-in value when absent.
    pub fn from_yaml_str(parm_string: &str) -> Result<ModelParameters, DataError> {
        let docs = YamlLoader::load_from_str(parm_string)?;

        // there can be multiple docs in Yaml file.  Only the first one interests us.
        let doc = match docs.first() {
            None | Some(Yaml::Null) => return Err(DataError::EmptyDocument),
            Some(doc @ Yaml::Hash(_)) => doc,
            Some(_) => {
                return Err(DataError::WrongType {
                    key: String::from("<document>"),
                    expected: "a mapping",
                })
            }
        };
        warn_unknown_keys(
            doc,
            "",
            &[
                "model_name",
                "population",
                "initial_conditions",
                "disease",
                "scenario",
                "time",
                "solver",
            ],
        );

        let mut parms = ModelParameters::default();

        if let Some(name) = string(doc, "model_name")? {
            parms.model_name = name;
        }
        if let Some(population) = number(doc, "population")? {
            if population == 0.0 {
                return Err(DataError::Invalid(String::from(
                    "parameter 'population' must not be zero",
                )));
            }
            parms.disease.population = population;
        }

        // initial conditions --------------------------------------------------
        let ic = section(doc, "initial_conditions")?;
        warn_unknown_keys(ic, "initial_conditions", &["infected", "recovered", "deceased"]);
        if let Some(v) = number(ic, "initial_conditions.infected")? {
            parms.initial.infected = v;
        }
        if let Some(v) = number(ic, "initial_conditions.recovered")? {
            parms.initial.recovered = v;
        }
        if let Some(v) = number(ic, "initial_conditions.deceased")? {
            parms.initial.deceased = v;
        }

        // disease --------------------------------------------------------------
        let disease = section(doc, "disease")?;
        warn_unknown_keys(
            disease,
            "disease",
            &["beta", "gamma", "infectious_period", "lambda"],
        );
        if let Some(v) = number(disease, "disease.beta")? {
            parms.disease.beta = v;
        }
        match (
            number(disease, "disease.gamma")?,
            number(disease, "disease.infectious_period")?,
        ) {
            (Some(_), Some(_)) => {
                return Err(DataError::Conflict(String::from(
                    "give either 'disease.gamma' or 'disease.infectious_period', not both",
                )))
            }
            (Some(gamma), None) => parms.disease.gamma = gamma,
            (None, Some(period)) => parms.disease.gamma = 1.0 / period,
            (None, None) => (),
        }
        if let Some(v) = number(disease, "disease.lambda")? {
            parms.disease.lambda = v;
        }

        // scenario -------------------------------------------------------------
        let scenario = section(doc, "scenario")?;
        warn_unknown_keys(
            scenario,
            "scenario",
            &["mask_effectiveness", "mask_usage", "title", "output"],
        );
        if let Some(v) = number(scenario, "scenario.mask_effectiveness")? {
            parms.disease.mi = v;
        }
        if let Some(v) = number(scenario, "scenario.mask_usage")? {
            parms.disease.alpha = v;
        }
        if let Some(title) = string(scenario, "scenario.title")? {
            parms.title = title;
        }
        if let Some(stem) = string(scenario, "scenario.output")? {
            parms.output_stem = stem;
        }

        // time grid ------------------------------------------------------------
        let time = section(doc, "time")?;
        warn_unknown_keys(time, "time", &["horizon", "samples"]);
        if let Some(v) = number(time, "time.horizon")? {
            parms.horizon = v;
        }
        if let Some(v) = integer(time, "time.samples")? {
            if v < 2 {
                return Err(DataError::Invalid(format!(
                    "parameter 'time.samples' must be at least 2, got {}",
                    v
                )));
            }
            parms.samples = v as usize;
        }

        // solver ---------------------------------------------------------------
        let solver = section(doc, "solver")?;
        warn_unknown_keys(solver, "solver", &["rtol", "atol", "max_steps"]);
        if let Some(v) = number(solver, "solver.rtol")? {
            parms.solver.rtol = v;
        }
        if let Some(v) = number(solver, "solver.atol")? {
            parms.solver.atol = v;
        }
        if let Some(v) = integer(solver, "solver.max_steps")? {
            if v < 1 {
                return Err(DataError::Invalid(format!(
                    "parameter 'solver.max_steps' must be positive, got {}",
                    v
                )));
            }
            parms.solver.max_steps = v as usize;
        }

        Ok(parms)
    }

    pub fn time_grid(&self) -> Vec<f64> {
        utilities::linspace(0.0, self.horizon, self.samples)
    }
}

impl fmt::Display for ModelParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Model name {}\nScenario {}\n{}\nInitial infected {} recovered {} deceased {}\n{} days in {} samples",
            self.model_name,
            self.title,
            self.disease,
            self.initial.infected,
            self.initial.recovered,
            self.initial.deceased,
            self.horizon,
            self.samples
        )
    }
}

// ----------------------------- YAML helpers --------------------------------------------------------------
// `key` is the dotted path used in messages; the last segment is looked up in `node`
fn lookup<'a>(node: &'a Yaml, key: &str) -> &'a Yaml {
    let field = key.rsplit('.').next().unwrap_or(key);
    &node[field]
}

// a missing section reads as an empty one
fn section<'a>(doc: &'a Yaml, key: &str) -> Result<&'a Yaml, DataError> {
    match &doc[key] {
        node @ Yaml::Hash(_) | node @ Yaml::BadValue => Ok(node),
        _ => Err(DataError::WrongType {
            key: String::from(key),
            expected: "a mapping",
        }),
    }
}

fn number(node: &Yaml, key: &str) -> Result<Option<f64>, DataError> {
    match lookup(node, key) {
        Yaml::BadValue => Ok(None),
        Yaml::Integer(i) => Ok(Some(*i as f64)),
        value @ Yaml::Real(_) => value.as_f64().map(Some).ok_or_else(|| DataError::WrongType {
            key: String::from(key),
            expected: "a number",
        }),
        _ => Err(DataError::WrongType {
            key: String::from(key),
            expected: "a number",
        }),
    }
}

fn integer(node: &Yaml, key: &str) -> Result<Option<i64>, DataError> {
    match lookup(node, key) {
        Yaml::BadValue => Ok(None),
        Yaml::Integer(i) => Ok(Some(*i)),
        _ => Err(DataError::WrongType {
            key: String::from(key),
            expected: "an integer",
        }),
    }
}

fn string(node: &Yaml, key: &str) -> Result<Option<String>, DataError> {
    match lookup(node, key) {
        Yaml::BadValue => Ok(None),
        Yaml::String(s) => Ok(Some(s.clone())),
        _ => Err(DataError::WrongType {
            key: String::from(key),
            expected: "a string",
        }),
    }
}

fn warn_unknown_keys(node: &Yaml, prefix: &str, known: &[&str]) {
    if let Yaml::Hash(hash) = node {
        for key in hash.keys() {
            match key.as_str() {
                Some(k) if known.contains(&k) => (),
                _ => warn!("ignoring unknown parameter {}{:?}", prefix_of(prefix), key),
            }
        }
    }
}

fn prefix_of(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}.", prefix)
    }
}
