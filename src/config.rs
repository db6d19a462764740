use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::types::GraphError;

pub const DEFAULT_ROBUSTNESS_TRIALS: usize = 10;
pub const DEFAULT_SIGN_KEY: &str = "sign";
pub const DEFAULT_HOMOPHILY_KEY: &str = "color";

/// Tunable defaults for the analysis runs, optionally loaded from a YAML
/// file. Command-line flags take precedence over these values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub robustness_trials: usize,
    pub sign_key: String,
    pub homophily_key: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            robustness_trials: DEFAULT_ROBUSTNESS_TRIALS,
            sign_key: DEFAULT_SIGN_KEY.to_string(),
            homophily_key: DEFAULT_HOMOPHILY_KEY.to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<AnalysisConfig, GraphError> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GraphError::NotFound(format!(
                "config file '{}' could not be found",
                path.display()
            )),
            _ => GraphError::Io(e),
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            GraphError::Parse(format!("invalid config '{}': {}", path.display(), e))
        })
    }
}
