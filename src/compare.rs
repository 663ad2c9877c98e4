//! Thresholded comparison of DE results against a published gene list

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::{DeTable, ExpressionMatrix};
use crate::error::Result;
use crate::io::format_value;

/// Anr regulon genes reported for PRJNA283002 (WT vs anr mutant)
pub const PUBLISHED_ANR_DEGS: [&str; 15] = [
    "PA1557", "PA3928", "PA2119", "PA3847", "PA0515", "PA0513", "PA0512", "PA0510", "PA0521",
    "PA0522", "PA0525", "PA0526", "PA2126", "PA2127", "PA2133",
];

/// Rows of `table` past the cutoff, then the rows for `gene_ids`
///
/// Fails if any of `gene_ids` did not pass the cutoff or is not in the table.
pub fn select_published<S: AsRef<str>>(
    table: &DeTable,
    column: &str,
    cutoff: f64,
    gene_ids: &[S],
) -> Result<DeTable> {
    table.filter_abs_greater(column, cutoff)?.lookup(gene_ids)
}

/// Where a published gene ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneStatus {
    /// `|fold change| > cutoff`
    Selected(f64),
    /// Defined fold change at or below the cutoff
    BelowCutoff(f64),
    /// In the table, but the fold change is `NaN`
    Undefined,
    /// Not in the table at all
    Absent,
}

impl GeneStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GeneStatus::Selected(_) => "selected",
            GeneStatus::BelowCutoff(_) => "below_cutoff",
            GeneStatus::Undefined => "undefined",
            GeneStatus::Absent => "absent",
        }
    }

    pub fn fold_change(&self) -> f64 {
        match self {
            GeneStatus::Selected(v) | GeneStatus::BelowCutoff(v) => *v,
            GeneStatus::Undefined | GeneStatus::Absent => f64::NAN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneComparison {
    pub gene_id: String,
    pub status: GeneStatus,
    /// Whether every sample has zero counts for the gene; `None` when no
    /// counts were given or the gene is not among them
    pub all_zero_counts: Option<bool>,
}

/// Per-gene report of a published list against a DE table
#[derive(Debug, Clone)]
pub struct PublishedComparison {
    pub column: String,
    pub cutoff: f64,
    /// Number of genes in the whole table past the cutoff
    pub n_selected: usize,
    pub genes: Vec<GeneComparison>,
}

impl PublishedComparison {
    /// Published genes that did not pass the cutoff, for whatever reason
    pub fn not_selected(&self) -> Vec<&str> {
        self.genes
            .iter()
            .filter(|g| !matches!(g.status, GeneStatus::Selected(_)))
            .map(|g| g.gene_id.as_str())
            .collect()
    }

    pub fn n_confirmed(&self) -> usize {
        self.genes.len() - self.not_selected().len()
    }

    /// Write the report as TSV
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "gene_id\tstatus\t{}\tall_zero_counts", self.column)?;
        for g in &self.genes {
            let zero = match g.all_zero_counts {
                Some(true) => "true",
                Some(false) => "false",
                None => crate::io::MISSING,
            };
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                g.gene_id,
                g.status.label(),
                format_value(g.status.fold_change()),
                zero
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

impl fmt::Display for PublishedComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Published Gene Comparison")?;
        writeln!(f, "=========================")?;
        writeln!(f, "Genes with |{}| > {}: {}", self.column, self.cutoff, self.n_selected)?;
        writeln!(f, "Published genes confirmed: {} of {}", self.n_confirmed(), self.genes.len())?;
        for g in &self.genes {
            let note = match g.all_zero_counts {
                Some(true) => "  (all counts zero)",
                _ => "",
            };
            writeln!(
                f,
                "  {:<10} {:<13} {:>10}{}",
                g.gene_id,
                g.status.label(),
                format_value(g.status.fold_change()),
                note
            )?;
        }
        Ok(())
    }
}

/// Classify every gene of `gene_ids` against `table` without failing on absent ids
///
/// `counts` (processed DE input, samples x genes) is used to flag genes with
/// zero counts everywhere, the usual reason for an undefined fold change.
pub fn compare_published<S: AsRef<str>>(
    table: &DeTable,
    column: &str,
    cutoff: f64,
    gene_ids: &[S],
    counts: Option<&ExpressionMatrix>,
) -> Result<PublishedComparison> {
    let values = table.column(column)?;
    let n_selected = values.iter().filter(|v| v.abs() > cutoff).count();

    let genes = gene_ids
        .iter()
        .map(|id| {
            let id = id.as_ref();
            let status = match table.gene_index(id) {
                None => GeneStatus::Absent,
                Some(i) => {
                    let v = values[i];
                    if v.is_nan() {
                        GeneStatus::Undefined
                    } else if v.abs() > cutoff {
                        GeneStatus::Selected(v)
                    } else {
                        GeneStatus::BelowCutoff(v)
                    }
                }
            };

            let all_zero_counts = counts.and_then(|c| {
                c.gene_index(id)
                    .map(|j| c.gene_values(j).iter().all(|&x| x == 0.0))
            });

            GeneComparison {
                gene_id: id.to_string(),
                status,
                all_zero_counts,
            }
        })
        .collect::<Vec<_>>();

    for g in &genes {
        match g.status {
            GeneStatus::Absent => log::warn!("{} is not in {}", g.gene_id, table.source_name()),
            GeneStatus::Undefined => log::warn!("{} has an undefined {}", g.gene_id, column),
            _ => {}
        }
    }

    Ok(PublishedComparison {
        column: column.to_string(),
        cutoff,
        n_selected,
        genes,
    })
}
