//! quantmerge: salmon quantification consolidation and DE result comparison
//!
//! This crate consolidates per-sample salmon `quant.sf` outputs into a
//! samples x genes expression matrix, selects and relabels the samples of one
//! experiment, prepares DESeq2 input, calls the external DE script and checks
//! the resulting fold changes against a published gene list.
//!
//! # Example
//!
//! ```ignore
//! use quantmerge::prelude::*;
//!
//! // Consolidate quantifications
//! let samples = discover_quant_files("quant/pao1_phage", SAMPLE_SEPARATOR)?;
//! let expression = aggregate_quants(&samples, QuantColumn::Tpm, DuplicatePolicy::Error)?;
//!
//! // Select one experiment and rename accessions to gene ids
//! let metadata = read_metadata("PRJNA283002_meta.tsv")?;
//! let mapping = IdMapping::from_fasta("pao1.ffn", &HeaderRule::default())?;
//! let selected = select_experiment(&expression, &metadata, Some(&mapping))?;
//!
//! // Compare DE results against the publication
//! let de = read_de_table("DE_stats.txt")?;
//! let report = compare_published(&de, LOG2FC_COLUMN, 1.0, &PUBLISHED_ANR_DEGS, None)?;
//! ```

pub mod aggregate;
pub mod cli;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod external;
pub mod io;
pub mod prepare;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::{aggregate_quants, discover_quant_files, read_sample_sheet, DuplicatePolicy, SampleQuant};
    pub use crate::compare::{compare_published, select_published, GeneStatus, PublishedComparison, PUBLISHED_ANR_DEGS};
    pub use crate::config::{ProjectConfig, DEFAULT_LFC_CUTOFF, SAMPLE_SEPARATOR};
    pub use crate::data::{DeTable, ExpressionMatrix, HeaderRule, IdMapping, SampleMetadata, LOG2FC_COLUMN};
    pub use crate::error::{QuantMergeError, Result};
    pub use crate::external::{collect_quant_jobs, DeCommand, SalmonQuant};
    pub use crate::io::{read_de_table, read_expression_matrix, read_metadata, write_expression_matrix, QuantColumn};
    pub use crate::prepare::prepare_deseq_input;
}

use prelude::*;

/// Restrict an expression matrix to the experiment's samples and rename gene columns
///
/// Rows follow the metadata order. Without a mapping the columns are left as is.
pub fn select_experiment(
    expression: &ExpressionMatrix,
    metadata: &SampleMetadata,
    mapping: Option<&IdMapping>,
) -> Result<ExpressionMatrix> {
    let selected = expression.select_samples(metadata.sample_ids())?;
    match mapping {
        Some(mapping) => selected.rename_genes(mapping),
        None => Ok(selected),
    }
}

/// Run the differential expression workflow described by `config`
///
/// select + rename -> prepare counts -> DE script -> published comparison
pub fn run_experiment(config: &ProjectConfig) -> Result<PublishedComparison> {
    use log::info;

    info!("Loading expression matrix from: {}", config.expression.display());
    let expression = read_expression_matrix(&config.expression)?;
    info!("  {} samples, {} genes", expression.n_samples(), expression.n_genes());

    info!("Loading metadata from: {}", config.metadata.display());
    let metadata = read_metadata(&config.metadata)?;
    info!(
        "  {} samples, attributes: {}",
        metadata.n_samples(),
        metadata.column_names().join(", ")
    );

    let mapping = match &config.reference {
        Some(reference) => {
            info!("Building identifier mapping from: {}", reference.display());
            let mapping = IdMapping::from_fasta(reference, &config.header_rule)?;
            info!("  {} accessions mapped", mapping.len());
            Some(mapping)
        }
        None => None,
    };

    let selected = select_experiment(&expression, &metadata, mapping.as_ref())?;
    info!("Writing selected expression to: {}", config.selected_output.display());
    write_expression_matrix(&config.selected_output, &selected)?;

    let counts = prepare_deseq_input(&selected, &metadata, config.count_threshold)?;
    info!("Writing DESeq2 input to: {}", config.processed_output.display());
    write_expression_matrix(&config.processed_output, &counts)?;

    config
        .de_command
        .run(&config.metadata, &config.processed_output, &config.de_output)?;

    let de = read_de_table(&config.de_output)?;
    let report = compare_published(
        &de,
        LOG2FC_COLUMN,
        config.lfc_cutoff,
        &config.published_genes,
        Some(&counts),
    )?;

    if let Some(out) = &config.comparison_output {
        info!("Writing comparison to: {}", out.display());
        report.write_tsv(out)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_select_experiment() {
        let expression = ExpressionMatrix::new(
            array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            vec!["PGD1".to_string(), "PGD2".to_string()],
        )
        .unwrap();
        let metadata = SampleMetadata::new(vec!["s3".to_string(), "s1".to_string()]).unwrap();
        let mapping = IdMapping::from_pairs([("PGD1", "PA0001")]);

        let selected = select_experiment(&expression, &metadata, Some(&mapping)).unwrap();
        assert_eq!(selected.sample_ids(), &["s3", "s1"]);
        assert_eq!(selected.gene_ids(), &["PA0001", "PGD2"]);
        assert_eq!(selected.value("s3", "PA0001"), Some(5.0));

        let unrenamed = select_experiment(&expression, &metadata, None).unwrap();
        assert_eq!(unrenamed.gene_ids(), &["PGD1", "PGD2"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_experiment_end_to_end() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        fs::write(
            p.join("ge.tsv"),
            "\tPGD1\tPGD2\tPGD3\nwt1\t10.7\t0\t5\nwt2\t12\t0\t6\nanr1\t40\t0\t1\nanr2\t44.2\t0\t2\nother\t1\t1\t1\n",
        )
        .unwrap();
        fs::write(p.join("meta.tsv"), "sample\tgenotype\nwt1\twt\nwt2\twt\nanr1\tanr\nanr2\tanr\n").unwrap();
        fs::write(
            p.join("ref.fa"),
            ">PGD1 [locus_tag=PA1557]\nACGT\n>PGD2 [locus_tag=PA3847]\nACGT\n>PGD3 [locus_tag=PA0515]\nACGT\n",
        )
        .unwrap();
        // Stand-in for the DE script: writes a fixed table to its third argument,
        // with the unlabelled row-name column of R write.table
        fs::write(
            p.join("de.sh"),
            "printf 'baseMean\\tlog2FoldChange\\tpvalue\\tpadj\\nPA1557\\t26\\t1.9\\t0.001\\t0.01\\nPA3847\\t0\\tNA\\tNA\\tNA\\nPA0515\\t3.5\\t-0.8\\t0.2\\t0.4\\n' > \"$3\"\n",
        )
        .unwrap();
        fs::write(
            p.join("project.json"),
            r#"{
                "expression": "ge.tsv",
                "metadata": "meta.tsv",
                "reference": "ref.fa",
                "selected_output": "out/selected.tsv",
                "processed_output": "out/processed.tsv",
                "de_output": "out/de.tsv",
                "comparison_output": "out/comparison.tsv",
                "de_command": { "program": "sh", "script": "de.sh" },
                "published_genes": ["PA1557", "PA3847", "PA0515"]
            }"#,
        )
        .unwrap();
        fs::create_dir(p.join("out")).unwrap();

        let config = ProjectConfig::from_file(p.join("project.json")).unwrap();
        let report = run_experiment(&config).unwrap();

        let statuses: Vec<GeneStatus> = report.genes.iter().map(|g| g.status).collect();
        assert_eq!(
            statuses,
            vec![GeneStatus::Selected(1.9), GeneStatus::Undefined, GeneStatus::BelowCutoff(-0.8)]
        );
        assert_eq!(report.genes[1].all_zero_counts, Some(true));

        let processed = read_expression_matrix(p.join("out/processed.tsv")).unwrap();
        assert_eq!(processed.sample_ids(), &["wt1", "wt2", "anr1", "anr2"]);
        assert_eq!(processed.gene_ids(), &["PA1557", "PA3847", "PA0515"]);
        assert_eq!(processed.value("anr2", "PA1557"), Some(44.0));
        assert!(p.join("out/comparison.tsv").is_file());
    }
}
