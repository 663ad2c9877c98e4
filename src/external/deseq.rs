//! Running the differential expression script

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use super::{run_captured, stderr_tail};
use crate::error::{QuantMergeError, Result};

fn default_program() -> String {
    "Rscript".to_string()
}

/// The statistics script call: `<program> [extra_args] <script> <metadata> <counts> <output>`
///
/// The script is expected to run DESeq2 on the processed counts and write a
/// tab-separated table indexed by gene with a `log2FoldChange` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeCommand {
    #[serde(default = "default_program")]
    pub program: String,
    pub script: PathBuf,
    /// Arguments placed before the script (e.g. `--vanilla`)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl DeCommand {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            program: default_program(),
            script: script.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn command(&self, metadata: &Path, counts: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .arg(&self.script)
            .arg(metadata)
            .arg(counts)
            .arg(output);
        cmd
    }

    /// Run the script and check that it produced `output`
    ///
    /// A table left at `output` by an earlier run is removed first, so only a
    /// freshly written file counts as success.
    pub fn run(&self, metadata: &Path, counts: &Path, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if output.is_file() {
            log::debug!("Removing previous output {}", output.display());
            fs::remove_file(output)?;
        }

        log::info!("Running DE script {}", self.script.display());
        let out = run_captured(self.command(metadata, counts, output), &self.program)?;

        if !out.status.success() {
            return Err(QuantMergeError::ExternalTool {
                tool: format!("{} {}", self.program, self.script.display()),
                status: out.status.to_string(),
                stderr: stderr_tail(&out, 10),
            });
        }

        if !output.is_file() {
            return Err(QuantMergeError::ExternalTool {
                tool: format!("{} {}", self.program, self.script.display()),
                status: out.status.to_string(),
                stderr: format!("expected output {} was not written", output.display()),
            });
        }

        log::info!("DE statistics written to {}", output.display());
        Ok(())
    }
}
