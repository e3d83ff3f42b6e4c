use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Selection key carrying the configured generation mode.
pub const MODE_KEY: &str = "generation_mode";
/// Selection key carrying the candidate's emission index.
pub const INDEX_KEY: &str = "emission_index";

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Value exposed to templates as `generation_mode`.
    pub mode: String,
    /// Directories searched, in order, for external templates.
    pub template_dirs: Vec<PathBuf>,
    /// Fail a `do` action whose render leaves its template unchanged.
    pub require_substitution: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            mode: "release".to_string(),
            template_dirs: Vec::new(),
            require_substitution: false,
        }
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub started_at: String,
    pub mode: String,
    /// Selections considered by the generate pass.
    pub candidates: u64,
    /// Candidates discarded by the exclusion set.
    pub suppressed: u64,
    /// Artifacts written, `when` actions included.
    pub artifacts: u64,
    pub bytes_written: u64,
    /// Distinct normalized selections in the exclusion set.
    pub excluded_patterns: u64,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, mode: &str) -> Self {
        Self {
            run_id,
            started_at: chrono::Utc::now().to_rfc3339(),
            mode: mode.to_string(),
            candidates: 0,
            suppressed: 0,
            artifacts: 0,
            bytes_written: 0,
            excluded_patterns: 0,
            duration_ms: 0,
        }
    }

    pub fn record_artifact(&mut self, bytes: u64) {
        self.artifacts += 1;
        self.bytes_written = self.bytes_written.saturating_add(bytes);
    }
}
