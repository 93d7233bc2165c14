use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of replaying persisted chain settings through the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadReport {
    pub chains_loaded: usize,
    pub chains_skipped: usize,
    pub bulbs_placed: usize,
    pub cables_built: usize,
    pub warnings: Vec<Warning>,
}

/// Outcome of partitioning one wall mesh into paintable grids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WallBuildReport {
    pub groups_found: usize,
    pub groups_discarded: usize,
    pub grids_built: usize,
    pub splits_performed: usize,
    pub gap_vertices_added: usize,
    pub warnings: Vec<Warning>,
}
