//! Assembling per-sample quantifications into one expression matrix

use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use ndarray::Array2;
use rayon::prelude::*;

use super::SampleQuant;
use crate::data::ExpressionMatrix;
use crate::error::{IdKind, QuantMergeError, Result};
use crate::io::{read_quant_column, QuantColumn};

/// What to do when two quantification files resolve to the same sample identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Fail naming the identifier
    #[default]
    Error,
    /// Keep the file listed last; the earlier one is dropped with a warning
    KeepLast,
}

/// Apply the duplicate policy, returning the samples that will become rows
fn resolve_duplicates(samples: &[SampleQuant], policy: DuplicatePolicy) -> Result<Vec<&SampleQuant>> {
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (i, sample) in samples.iter().enumerate() {
        if let Some(prev) = last_index.insert(sample.sample_id.as_str(), i) {
            match policy {
                DuplicatePolicy::Error => {
                    return Err(QuantMergeError::DuplicateIdentifier {
                        kind: IdKind::Sample,
                        id: sample.sample_id.clone(),
                        source_name: format!(
                            "{} and {}",
                            samples[prev].path.display(),
                            sample.path.display()
                        ),
                    });
                }
                DuplicatePolicy::KeepLast => {
                    log::warn!(
                        "Sample '{}' appears more than once; keeping {} over {}",
                        sample.sample_id,
                        sample.path.display(),
                        samples[prev].path.display()
                    );
                }
            }
        }
    }

    Ok(samples
        .iter()
        .enumerate()
        .filter(|(i, s)| last_index[s.sample_id.as_str()] == *i)
        .map(|(_, s)| s)
        .collect())
}

/// Build a samples x names matrix from per-sample `(name, value)` lists
///
/// Columns are ordered by first appearance. A name absent from a sample's
/// list leaves that cell `NaN`.
pub fn assemble(per_sample: Vec<(String, Vec<(String, f64)>)>) -> Result<ExpressionMatrix> {
    let mut gene_ids: Vec<String> = Vec::new();
    let mut gene_index: HashMap<String, usize> = HashMap::new();
    for (_, entries) in &per_sample {
        for (name, _) in entries {
            if !gene_index.contains_key(name) {
                gene_index.insert(name.clone(), gene_ids.len());
                gene_ids.push(name.clone());
            }
        }
    }

    let mut values = Array2::from_elem((per_sample.len(), gene_ids.len()), f64::NAN);
    let mut sample_ids = Vec::with_capacity(per_sample.len());
    for (i, (sample_id, entries)) in per_sample.into_iter().enumerate() {
        for (name, value) in entries {
            values[[i, gene_index[&name]]] = value;
        }
        sample_ids.push(sample_id);
    }

    ExpressionMatrix::new(values, sample_ids, gene_ids)
}

/// Read one column from each sample's `quant.sf` and merge into one matrix
///
/// Rows follow the input order (after duplicate resolution). Files are read
/// in parallel.
pub fn aggregate_quants(
    samples: &[SampleQuant],
    column: QuantColumn,
    policy: DuplicatePolicy,
) -> Result<ExpressionMatrix> {
    if samples.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: "No quantification files to aggregate".to_string(),
        });
    }

    let selected = resolve_duplicates(samples, policy)?;
    log::info!("Reading {} column from {} quantification files", column, selected.len());

    let per_sample: Vec<(String, Vec<(String, f64)>)> = selected
        .par_iter()
        .map(|sample| -> Result<(String, Vec<(String, f64)>)> {
            let entries = read_quant_column(&sample.path, column)?;

            let mut seen = HashSet::with_capacity(entries.len());
            for (name, _) in &entries {
                if !seen.insert(name.as_str()) {
                    return Err(QuantMergeError::DuplicateIdentifier {
                        kind: IdKind::Transcript,
                        id: name.clone(),
                        source_name: sample.path.display().to_string(),
                    });
                }
            }

            log::debug!("  {}: {} entries from {}", sample.sample_id, entries.len(), sample.path.display());
            Ok((sample.sample_id.clone(), entries))
        })
        .collect::<Result<_>>()?;

    let matrix = assemble(per_sample)?.with_source(format!("{} quantification files", selected.len()));

    let missing = matrix.n_missing();
    if missing > 0 {
        log::warn!(
            "{} cell(s) have no value because the name is absent from that sample's file",
            missing
        );
    }
    log::info!("  {} samples, {} names", matrix.n_samples(), matrix.n_genes());

    Ok(matrix)
}
