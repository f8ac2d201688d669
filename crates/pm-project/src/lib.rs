//! pm-project: scenario file format, validation and compilation.

pub mod compile;
pub mod schema;
pub mod validate;

pub use compile::{compile_integrator, compile_scenario};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_scenario};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] pm_machine::MachineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_yaml_str(content: &str) -> ProjectResult<ScenarioDef> {
    let scenario: ScenarioDef = if content.trim().is_empty() {
        ScenarioDef::default()
    } else {
        serde_yaml::from_str(content)?
    };
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn from_json_str(content: &str) -> ProjectResult<ScenarioDef> {
    let scenario: ScenarioDef = serde_json::from_str(content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn to_yaml_string(scenario: &ScenarioDef) -> ProjectResult<String> {
    validate_scenario(scenario)?;
    Ok(serde_yaml::to_string(scenario)?)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<ScenarioDef> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<ScenarioDef> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<ScenarioDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
