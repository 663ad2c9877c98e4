//! Samples x genes expression matrix

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::IdMapping;
use crate::error::{IdKind, QuantMergeError, Result};

/// Default label used in diagnostics when a matrix was not read from a file
const DEFAULT_SOURCE: &str = "expression matrix";

fn check_unique(ids: &[String], kind: IdKind, source_name: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(QuantMergeError::DuplicateIdentifier {
                kind,
                id: id.clone(),
                source_name: source_name.to_string(),
            });
        }
    }
    Ok(())
}

/// Resolve `wanted` against `ids`, collecting every identifier that is absent
fn resolve_indices<S: AsRef<str>>(
    ids: &[String],
    wanted: &[S],
    kind: IdKind,
    source_name: &str,
) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut found = Vec::with_capacity(wanted.len());
    let mut missing = Vec::new();
    for id in wanted {
        match index.get(id.as_ref()) {
            Some(&i) => found.push(i),
            None => missing.push(id.as_ref().to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(QuantMergeError::MissingIdentifiers {
            kind,
            source_name: source_name.to_string(),
            ids: missing,
        });
    }
    Ok(found)
}

/// An expression matrix with samples as rows and genes as columns
///
/// Cells hold TPM values or read counts. A value that was never observed is
/// stored as `NaN` and is never silently replaced by zero.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    /// Abundance values (samples x genes)
    values: Array2<f64>,
    sample_ids: Vec<String>,
    gene_ids: Vec<String>,
    /// Where the matrix came from, for error messages
    source_name: String,
}

impl ExpressionMatrix {
    /// Create a new expression matrix; sample and gene identifiers must be unique
    pub fn new(values: Array2<f64>, sample_ids: Vec<String>, gene_ids: Vec<String>) -> Result<Self> {
        let (n_samples, n_genes) = values.dim();

        if sample_ids.len() != n_samples {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if gene_ids.len() != n_genes {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        check_unique(&sample_ids, IdKind::Sample, DEFAULT_SOURCE)?;
        check_unique(&gene_ids, IdKind::Gene, DEFAULT_SOURCE)?;

        Ok(Self {
            values,
            sample_ids,
            gene_ids,
            source_name: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Attach a source label (usually the file path) used in diagnostics
    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Get the number of samples (rows)
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Get the number of genes (columns)
    pub fn n_genes(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|id| id == sample_id)
    }

    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    /// Value for a sample/gene pair, `None` if either identifier is unknown
    pub fn value(&self, sample_id: &str, gene_id: &str) -> Option<f64> {
        let i = self.sample_index(sample_id)?;
        let j = self.gene_index(gene_id)?;
        Some(self.values[[i, j]])
    }

    /// All gene values of one sample
    pub fn sample_values(&self, sample_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(sample_idx)
    }

    /// One gene's values across all samples
    pub fn gene_values(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(gene_idx)
    }

    /// Restrict to the given samples, in the given order
    ///
    /// Every requested identifier must exist; the error lists all that do not.
    pub fn select_samples<S: AsRef<str>>(&self, sample_ids: &[S]) -> Result<Self> {
        let indices = resolve_indices(&self.sample_ids, sample_ids, IdKind::Sample, &self.source_name)?;
        let new_ids: Vec<String> = indices.iter().map(|&i| self.sample_ids[i].clone()).collect();

        Ok(Self::new(
            self.values.select(Axis(0), &indices),
            new_ids,
            self.gene_ids.clone(),
        )?
        .with_source(self.source_name.clone()))
    }

    /// Restrict to the given genes, in the given order
    pub fn select_genes<S: AsRef<str>>(&self, gene_ids: &[S]) -> Result<Self> {
        let indices = resolve_indices(&self.gene_ids, gene_ids, IdKind::Gene, &self.source_name)?;
        let new_ids: Vec<String> = indices.iter().map(|&i| self.gene_ids[i].clone()).collect();

        Ok(Self::new(
            self.values.select(Axis(1), &indices),
            self.sample_ids.clone(),
            new_ids,
        )?
        .with_source(self.source_name.clone()))
    }

    /// Keep genes whose column index is in `keep`, preserving order
    pub fn subset_genes(&self, keep: &[usize]) -> Result<Self> {
        let new_ids: Vec<String> = keep.iter().map(|&j| self.gene_ids[j].clone()).collect();
        Ok(Self::new(self.values.select(Axis(1), keep), self.sample_ids.clone(), new_ids)?
            .with_source(self.source_name.clone()))
    }

    /// Rename gene columns through `mapping`
    ///
    /// Columns without a mapping entry keep their name. Column order is unchanged.
    pub fn rename_genes(&self, mapping: &IdMapping) -> Result<Self> {
        let mut unmapped = 0usize;
        let new_ids: Vec<String> = self
            .gene_ids
            .iter()
            .map(|id| match mapping.get(id) {
                Some(gene) => gene.to_string(),
                None => {
                    unmapped += 1;
                    id.clone()
                }
            })
            .collect();

        if unmapped > 0 {
            log::warn!(
                "{} of {} columns had no identifier mapping and kept their name",
                unmapped,
                self.n_genes()
            );
        }

        check_unique(&new_ids, IdKind::Gene, &format!("{} after renaming", self.source_name))?;

        Ok(Self {
            values: self.values.clone(),
            sample_ids: self.sample_ids.clone(),
            gene_ids: new_ids,
            source_name: self.source_name.clone(),
        })
    }

    /// Mean value per gene across samples
    pub fn gene_means(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        self.values
            .axis_iter(Axis(1))
            .map(|col| col.sum() / n)
            .collect()
    }

    /// Apply `f` to every cell
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            values: self.values.mapv(f),
            sample_ids: self.sample_ids.clone(),
            gene_ids: self.gene_ids.clone(),
            source_name: self.source_name.clone(),
        }
    }

    /// Number of missing (`NaN`) cells
    pub fn n_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}
