use serde::{Deserialize, Serialize};
use std::path::Path;

/// Batch-run settings, loadable from a `.codeweld.json` next to the input.
///
/// CLI flags override whatever the file says.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shape completions as multi-line blocks (the evaluation drivers always
    /// do; turn off to skip structural truncation entirely).
    pub multiline: bool,

    /// Worker threads for the batch run. `None` lets rayon size the pool.
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            multiline: true,
            threads: None,
        }
    }
}

pub fn load_config(dir: &Path) -> Config {
    let primary = dir.join(".codeweld.json");

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else { return Config::default() };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|_| Config::default())
}
