//! Project constants and the JSON project configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compare::PUBLISHED_ANR_DEGS;
use crate::data::HeaderRule;
use crate::error::{QuantMergeError, Result};
use crate::external::DeCommand;

// file names
pub const QUANT_FILE_NAME: &str = "quant.sf";
pub const QUANT_DIR_SUFFIX: &str = "_quant";

// naming
pub const SAMPLE_SEPARATOR: char = '_';

// thresholds
pub const DEFAULT_LFC_CUTOFF: f64 = 1.0;
pub const DEFAULT_ALPHA: f64 = 0.05;

// salmon
pub const DEFAULT_SALMON: &str = "salmon";
pub const DEFAULT_LIBTYPE: &str = "A";

fn default_cutoff() -> f64 {
    DEFAULT_LFC_CUTOFF
}

fn default_published() -> Vec<String> {
    PUBLISHED_ANR_DEGS.iter().map(|s| s.to_string()).collect()
}

/// Paths and settings for one differential expression experiment
///
/// Relative paths are resolved against the directory holding the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Full samples x genes expression matrix
    pub expression: PathBuf,
    /// Sample metadata of the experiment (its rows select the samples)
    pub metadata: PathBuf,
    /// Reference FASTA used to rename sequence accessions to gene ids
    #[serde(default)]
    pub reference: Option<PathBuf>,
    #[serde(default)]
    pub header_rule: HeaderRule,
    /// Selected and renamed expression matrix
    pub selected_output: PathBuf,
    /// Integer count matrix handed to the DE script
    pub processed_output: PathBuf,
    /// Table written by the DE script
    pub de_output: PathBuf,
    /// Published gene comparison report
    #[serde(default)]
    pub comparison_output: Option<PathBuf>,
    pub de_command: DeCommand,
    #[serde(default = "default_cutoff")]
    pub lfc_cutoff: f64,
    /// Drop genes whose mean count is not above this value
    #[serde(default)]
    pub count_threshold: Option<f64>,
    #[serde(default = "default_published")]
    pub published_genes: Vec<String>,
}

impl ProjectConfig {
    /// Load a config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: ProjectConfig = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = config.resolve(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.expression);
        join(&mut self.metadata);
        if let Some(reference) = self.reference.as_mut() {
            join(reference);
        }
        join(&mut self.selected_output);
        join(&mut self.processed_output);
        join(&mut self.de_output);
        if let Some(out) = self.comparison_output.as_mut() {
            join(out);
        }
        join(&mut self.de_command.script);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.lfc_cutoff.is_finite() || self.lfc_cutoff < 0.0 {
            return Err(QuantMergeError::InvalidConfig {
                reason: format!("lfc_cutoff must be a non-negative number, got {}", self.lfc_cutoff),
            });
        }
        if let Some(t) = self.count_threshold {
            if !t.is_finite() {
                return Err(QuantMergeError::InvalidConfig {
                    reason: format!("count_threshold must be finite, got {}", t),
                });
            }
        }
        if self.published_genes.is_empty() {
            return Err(QuantMergeError::InvalidConfig {
                reason: "published_genes is empty".to_string(),
            });
        }
        if self.de_command.program.trim().is_empty() {
            return Err(QuantMergeError::InvalidConfig {
                reason: "de_command.program is empty".to_string(),
            });
        }
        Ok(())
    }
}
