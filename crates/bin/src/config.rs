//! Configuration file loading.

use std::path::Path;

use canopy::EventOptimization;
use serde::Deserialize;

use crate::cli::OptimizationArgs;

/// Contents of the `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub event_optimization: EventOptimization,
}

impl Config {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Command-line flags can only switch optimizations on
    pub fn with_overrides(mut self, args: &OptimizationArgs) -> Self {
        let options = &mut self.event_optimization;
        options.suppress_previous_property_change_events |= args.suppress_previous;
        options.enable_single_callback_call |= args.single_callback;
        options.enable_callback_hash_optimization |= args.hash_callbacks;
        self
    }
}
