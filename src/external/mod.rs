//! Invoking the external quantifier and statistics tools

mod deseq;
mod salmon;

use std::process::{Command, Output};

pub use deseq::DeCommand;
pub use salmon::{collect_quant_jobs, strip_read_suffix, QuantJob, QuantRunReport, ReadLayout, SalmonQuant};

use crate::error::{QuantMergeError, Result};

/// Run a command to completion, capturing its output
///
/// A failure to start the program is an error; a non-zero exit is reported
/// through the returned `Output`.
fn run_captured(mut cmd: Command, tool: &str) -> Result<Output> {
    log::debug!("Running {:?}", cmd);
    cmd.output().map_err(|e| QuantMergeError::ExternalTool {
        tool: tool.to_string(),
        status: "not started".to_string(),
        stderr: e.to_string(),
    })
}

/// Last non-empty stderr lines, for error messages
fn stderr_tail(output: &Output, lines: usize) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
