//! Turning a selected expression matrix into DESeq2 input counts

use std::path::Path;

use crate::data::{ExpressionMatrix, SampleMetadata};
use crate::error::{QuantMergeError, Result};
use crate::io::{read_expression_matrix, read_metadata, write_expression_matrix};

/// How many missing cells to name in the error message
const MAX_REPORTED_MISSING: usize = 5;

/// Prepare counts for the statistics package
///
/// Rows are put in metadata order (every metadata sample must be present),
/// negative values become 0 and values are truncated to integers. With a
/// `count_threshold`, genes whose mean count is not above it are dropped.
/// Missing cells are rejected: the statistics package needs a defined count
/// for every sample and gene.
pub fn prepare_deseq_input(
    expression: &ExpressionMatrix,
    metadata: &SampleMetadata,
    count_threshold: Option<f64>,
) -> Result<ExpressionMatrix> {
    if metadata.column_names().is_empty() {
        log::warn!("Sample metadata has no attribute columns to build a design from");
    }
    let ordered = expression.select_samples(metadata.sample_ids())?;

    let values = ordered.values();
    let mut missing = Vec::new();
    for ((i, j), v) in values.indexed_iter() {
        if v.is_nan() {
            missing.push(format!("{}/{}", ordered.sample_ids()[i], ordered.gene_ids()[j]));
        }
    }
    if !missing.is_empty() {
        let shown: Vec<&str> = missing.iter().take(MAX_REPORTED_MISSING).map(String::as_str).collect();
        return Err(QuantMergeError::InvalidInput {
            reason: format!(
                "{} missing value(s) in {} cannot be used as counts (first: {})",
                missing.len(),
                ordered.source_name(),
                shown.join(", ")
            ),
        });
    }

    let counts = ordered.map_values(|v| v.max(0.0).trunc());

    let Some(threshold) = count_threshold else {
        return Ok(counts);
    };

    let keep: Vec<usize> = counts
        .gene_means()
        .iter()
        .enumerate()
        .filter(|(_, &m)| m > threshold)
        .map(|(j, _)| j)
        .collect();

    log::info!(
        "Keeping {} of {} genes with mean count > {}",
        keep.len(),
        counts.n_genes(),
        threshold
    );

    if keep.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No genes have mean count above {}", threshold),
        });
    }

    counts.subset_genes(&keep)
}

/// File-to-file form of [`prepare_deseq_input`]
pub fn prepare_deseq_files(
    expression_path: &Path,
    metadata_path: &Path,
    output_path: &Path,
    count_threshold: Option<f64>,
) -> Result<ExpressionMatrix> {
    log::info!("Loading expression matrix from: {}", expression_path.display());
    let expression = read_expression_matrix(expression_path)?;
    log::info!("Loading metadata from: {}", metadata_path.display());
    let metadata = read_metadata(metadata_path)?;

    let counts = prepare_deseq_input(&expression, &metadata, count_threshold)?;

    log::info!("Writing DESeq2 input to: {}", output_path.display());
    write_expression_matrix(output_path, &counts)?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn metadata(samples: &[&str]) -> SampleMetadata {
        SampleMetadata::new(ids(samples)).unwrap()
    }

    #[test]
    fn test_reorders_clamps_and_truncates() {
        let expression = ExpressionMatrix::new(
            array![[1.9, -3.0, 10.2], [4.5, 5.0, 0.4]],
            ids(&["s1", "s2"]),
            ids(&["g1", "g2", "g3"]),
        )
        .unwrap();

        let counts = prepare_deseq_input(&expression, &metadata(&["s2", "s1"]), None).unwrap();
        assert_eq!(counts.sample_ids(), &["s2", "s1"]);
        assert_eq!(counts.sample_values(0).to_vec(), vec![4.0, 5.0, 0.0]);
        assert_eq!(counts.sample_values(1).to_vec(), vec![1.0, 0.0, 10.0]);
    }

    #[test]
    fn test_count_threshold_drops_low_genes() {
        let expression = ExpressionMatrix::new(
            array![[0.0, 20.0, 5.0], [2.0, 30.0, 5.0]],
            ids(&["s1", "s2"]),
            ids(&["g1", "g2", "g3"]),
        )
        .unwrap();

        let counts = prepare_deseq_input(&expression, &metadata(&["s1", "s2"]), Some(5.0)).unwrap();
        assert_eq!(counts.gene_ids(), &["g2"]);
    }

    #[test]
    fn test_missing_metadata_sample() {
        let expression = ExpressionMatrix::new(array![[1.0]], ids(&["s1"]), ids(&["g1"])).unwrap();
        assert!(matches!(
            prepare_deseq_input(&expression, &metadata(&["s1", "s7"]), None),
            Err(QuantMergeError::MissingIdentifiers { .. })
        ));
    }

    #[test]
    fn test_missing_cells_rejected() {
        let expression = ExpressionMatrix::new(
            array![[1.0, f64::NAN]],
            ids(&["s1"]),
            ids(&["g1", "g2"]),
        )
        .unwrap();
        match prepare_deseq_input(&expression, &metadata(&["s1"]), None).unwrap_err() {
            QuantMergeError::InvalidInput { reason } => assert!(reason.contains("s1/g2")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
