//! Differential expression statistics table

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{IdKind, QuantMergeError, Result};

/// Fold change column written by DESeq2
pub const LOG2FC_COLUMN: &str = "log2FoldChange";
/// Raw p-value column written by DESeq2
pub const PVALUE_COLUMN: &str = "pvalue";
/// BH-adjusted p-value column written by DESeq2
pub const PADJ_COLUMN: &str = "padj";

/// A per-gene table of DE statistics (genes x statistic columns)
///
/// Undefined statistics (`NA` from R) are `NaN` and stay `NaN`.
#[derive(Debug, Clone)]
pub struct DeTable {
    gene_ids: Vec<String>,
    columns: Vec<String>,
    values: Array2<f64>,
    source_name: String,
}

impl DeTable {
    pub fn new(gene_ids: Vec<String>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (n_genes, n_columns) = values.dim();
        if gene_ids.len() != n_genes {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }
        if columns.len() != n_columns {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} column names", n_columns),
                got: format!("{} column names", columns.len()),
            });
        }

        let mut seen = HashSet::with_capacity(gene_ids.len());
        for id in &gene_ids {
            if !seen.insert(id.as_str()) {
                return Err(QuantMergeError::DuplicateIdentifier {
                    kind: IdKind::Gene,
                    id: id.clone(),
                    source_name: "DE table".to_string(),
                });
            }
        }

        Ok(Self {
            gene_ids,
            columns,
            values,
            source_name: "DE table".to_string(),
        })
    }

    /// Attach a source label used in diagnostics
    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| QuantMergeError::MissingColumn {
                column: column.to_string(),
                source_name: self.source_name.clone(),
            })
    }

    /// All values of one statistic column
    pub fn column(&self, column: &str) -> Result<ArrayView1<'_, f64>> {
        let j = self.column_index(column)?;
        Ok(self.values.column(j))
    }

    /// One statistic for one gene; `None` if the gene or column is unknown
    pub fn value(&self, gene_id: &str, column: &str) -> Option<f64> {
        let i = self.gene_index(gene_id)?;
        let j = self.columns.iter().position(|c| c == column)?;
        Some(self.values[[i, j]])
    }

    fn subset(&self, rows: &[usize], source_name: String) -> Self {
        Self {
            gene_ids: rows.iter().map(|&i| self.gene_ids[i].clone()).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
            source_name,
        }
    }

    /// Rows where `abs(column) > cutoff`
    ///
    /// The comparison is strict, so a value exactly at the cutoff is dropped.
    /// `NaN` never passes.
    pub fn filter_abs_greater(&self, column: &str, cutoff: f64) -> Result<Self> {
        let values = self.column(column)?;
        let keep: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > cutoff)
            .map(|(i, _)| i)
            .collect();

        log::debug!(
            "{} of {} genes have |{}| > {}",
            keep.len(),
            self.n_genes(),
            column,
            cutoff
        );

        Ok(self.subset(&keep, format!("{} (|{}| > {})", self.source_name, column, cutoff)))
    }

    /// Rows for `gene_ids`, in that order
    ///
    /// Fails naming every identifier that is not in the table.
    pub fn lookup<S: AsRef<str>>(&self, gene_ids: &[S]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .gene_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut rows = Vec::with_capacity(gene_ids.len());
        let mut missing = Vec::new();
        for id in gene_ids {
            match index.get(id.as_ref()) {
                Some(&i) => rows.push(i),
                None => missing.push(id.as_ref().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(QuantMergeError::MissingIdentifiers {
                kind: IdKind::Gene,
                source_name: self.source_name.clone(),
                ids: missing,
            });
        }

        Ok(self.subset(&rows, self.source_name.clone()))
    }

    /// Summary counts over the p-value and fold change columns
    pub fn summary(&self, alpha: f64) -> Result<DeSummary> {
        let pvalues = self.column(PVALUE_COLUMN)?;
        let padj = self.column(PADJ_COLUMN)?;
        let lfc = self.column(LOG2FC_COLUMN)?;

        let tested = pvalues.iter().filter(|p| p.is_finite()).count();
        let mut significant = 0;
        let mut upregulated = 0;
        let mut downregulated = 0;
        for (&p, &l) in padj.iter().zip(lfc.iter()) {
            if p.is_finite() && p < alpha {
                significant += 1;
                if l > 0.0 {
                    upregulated += 1;
                } else if l < 0.0 {
                    downregulated += 1;
                }
            }
        }

        Ok(DeSummary {
            total_genes: self.n_genes(),
            genes_tested: tested,
            significant,
            upregulated,
            downregulated,
            alpha,
        })
    }
}

/// Summary of a DE statistics table
#[derive(Debug, Clone)]
pub struct DeSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
}

impl std::fmt::Display for DeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DE Results Summary")?;
        writeln!(f, "==================")?;
        writeln!(f, "Total genes: {}", self.total_genes)?;
        writeln!(f, "Genes tested: {}", self.genes_tested)?;
        writeln!(f, "Significant (padj < {}): {}", self.alpha, self.significant)?;
        writeln!(f, "  Up-regulated: {}", self.upregulated)?;
        writeln!(f, "  Down-regulated: {}", self.downregulated)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table() -> DeTable {
        DeTable::new(
            vec!["PA1".to_string(), "PA2".to_string(), "PA3".to_string(), "PA4".to_string()],
            vec![LOG2FC_COLUMN.to_string(), PVALUE_COLUMN.to_string(), PADJ_COLUMN.to_string()],
            array![
                [0.5, 0.2, 0.4],
                [1.5, 0.001, 0.004],
                [-2.0, 0.0001, 0.0004],
                [f64::NAN, f64::NAN, f64::NAN],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_abs_greater() {
        let filtered = table().filter_abs_greater(LOG2FC_COLUMN, 1.0).unwrap();
        assert_eq!(filtered.gene_ids(), &["PA2", "PA3"]);
        assert_eq!(filtered.value("PA3", LOG2FC_COLUMN), Some(-2.0));
    }

    #[test]
    fn test_filter_boundary_excluded() {
        let t = DeTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![LOG2FC_COLUMN.to_string()],
            array![[1.0], [-1.0], [1.0000001]],
        )
        .unwrap();
        let filtered = t.filter_abs_greater(LOG2FC_COLUMN, 1.0).unwrap();
        assert_eq!(filtered.gene_ids(), &["c"]);
    }

    #[test]
    fn test_filter_unknown_column() {
        assert!(matches!(
            table().filter_abs_greater("lfc", 1.0),
            Err(QuantMergeError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_lookup_missing_after_filter() {
        let filtered = table().filter_abs_greater(LOG2FC_COLUMN, 1.0).unwrap();
        let err = filtered.lookup(&["PA3", "PA4"]).unwrap_err();
        match err {
            QuantMergeError::MissingIdentifiers { ids, .. } => assert_eq!(ids, vec!["PA4"]),
            other => panic!("unexpected error: {}", other),
        }

        let found = filtered.lookup(&["PA3", "PA2"]).unwrap();
        assert_eq!(found.gene_ids(), &["PA3", "PA2"]);
    }

    #[test]
    fn test_summary() {
        let summary = table().summary(0.05).unwrap();
        assert_eq!(summary.total_genes, 4);
        assert_eq!(summary.genes_tested, 3);
        assert_eq!(summary.significant, 2);
        assert_eq!(summary.upregulated, 1);
        assert_eq!(summary.downregulated, 1);
    }
}
