//! quantmerge command-line interface

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn, LevelFilter};

use quantmerge::cli::{Cli, Commands};
use quantmerge::external::ReadLayout;
use quantmerge::io::write_de_table;
use quantmerge::prelude::*;
use quantmerge::prepare::prepare_deseq_files;
use quantmerge::select_experiment;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    if std::env::args().len() == 1 {
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    let result = match cli.command {
        Some(Commands::Quant {
            fastq_dir,
            index,
            output,
            libtype,
            layout,
            salmon,
            salmon_args,
            separator,
        }) => run_quant(&fastq_dir, index, &output, libtype, layout, salmon, salmon_args, separator),
        Some(Commands::Aggregate {
            quant_dir,
            samples,
            column,
            separator,
            on_duplicate,
            output,
        }) => run_aggregate(quant_dir.as_deref(), samples.as_deref(), column, separator, on_duplicate, &output),
        Some(Commands::Select {
            expression,
            metadata,
            reference,
            header_rule,
            output,
        }) => run_select(&expression, &metadata, reference.as_deref(), &header_rule, &output),
        Some(Commands::Prepare {
            expression,
            metadata,
            output,
            count_threshold,
        }) => prepare_deseq_files(&expression, &metadata, &output, count_threshold).map(|_| ()),
        Some(Commands::De {
            script,
            metadata,
            counts,
            output,
            program,
        }) => {
            let mut de = DeCommand::new(script);
            de.program = program;
            de.run(&metadata, &counts, &output)
        }
        Some(Commands::Compare {
            de_table,
            cutoff,
            column,
            genes,
            genes_file,
            counts,
            filtered_output,
            report,
            strict,
            alpha,
        }) => run_compare(
            &de_table,
            cutoff,
            &column,
            genes,
            genes_file.as_deref(),
            counts.as_deref(),
            filtered_output.as_deref(),
            report.as_deref(),
            strict,
            alpha,
        ),
        Some(Commands::Run { config }) => run_project(&config),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_no_args() {
    println!("quantmerge v{}", VERSION);
    println!("Run `quantmerge -h` for usage or `quantmerge --help` for detailed information.");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn run_quant(
    fastq_dir: &Path,
    index: PathBuf,
    output: &Path,
    libtype: String,
    layout: ReadLayout,
    program: String,
    extra_args: Vec<String>,
    separator: char,
) -> Result<()> {
    info!("Collecting samples from: {}", fastq_dir.display());
    let jobs = collect_quant_jobs(fastq_dir, separator)?;
    info!("  {} samples", jobs.len());

    let salmon = SalmonQuant {
        program,
        index,
        libtype,
        layout,
        extra_args,
    };
    let report = salmon.run_all(&jobs, output)?;

    if !report.is_success() {
        let failed: Vec<&str> = report.failed.iter().map(|(s, _)| s.as_str()).collect();
        return Err(QuantMergeError::ExternalTool {
            tool: salmon.program.clone(),
            status: format!("{} of {} samples failed", failed.len(), jobs.len()),
            stderr: failed.join(", "),
        });
    }

    info!("Done!");
    Ok(())
}

fn run_aggregate(
    quant_dir: Option<&Path>,
    sample_sheet: Option<&Path>,
    column: QuantColumn,
    separator: char,
    policy: DuplicatePolicy,
    output: &Path,
) -> Result<()> {
    let samples = match (quant_dir, sample_sheet) {
        (_, Some(sheet)) => {
            info!("Reading sample sheet: {}", sheet.display());
            read_sample_sheet(sheet)?
        }
        (Some(dir), None) => {
            info!("Scanning for quantification files in: {}", dir.display());
            discover_quant_files(dir, separator)?
        }
        (None, None) => {
            return Err(QuantMergeError::InvalidInput {
                reason: "Either --quant-dir or --samples is required".to_string(),
            })
        }
    };
    info!("  {} samples", samples.len());

    let matrix = aggregate_quants(&samples, column, policy)?;

    info!("Writing expression matrix to: {}", output.display());
    write_expression_matrix(output, &matrix)?;
    info!("Done!");
    Ok(())
}

fn run_select(
    expression_path: &Path,
    metadata_path: &Path,
    reference: Option<&Path>,
    header_rule: &str,
    output: &Path,
) -> Result<()> {
    info!("Loading expression matrix from: {}", expression_path.display());
    let expression = read_expression_matrix(expression_path)?;
    info!("  {} samples, {} genes", expression.n_samples(), expression.n_genes());

    info!("Loading metadata from: {}", metadata_path.display());
    let metadata = read_metadata(metadata_path)?;

    let mapping = match reference {
        Some(path) => {
            let rule = HeaderRule::parse(header_rule)?;
            info!("Building identifier mapping from: {}", path.display());
            let mapping = IdMapping::from_fasta(path, &rule)?;
            info!("  {} accessions mapped", mapping.len());
            Some(mapping)
        }
        None => None,
    };

    let selected = select_experiment(&expression, &metadata, mapping.as_ref())?;

    info!("Writing {} samples to: {}", selected.n_samples(), output.display());
    write_expression_matrix(output, &selected)?;
    info!("Done!");
    Ok(())
}

fn read_gene_list(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[allow(clippy::too_many_arguments)]
fn run_compare(
    de_path: &Path,
    cutoff: f64,
    column: &str,
    genes: Vec<String>,
    genes_file: Option<&Path>,
    counts_path: Option<&Path>,
    filtered_output: Option<&Path>,
    report_path: Option<&Path>,
    strict: bool,
    alpha: f64,
) -> Result<()> {
    if !cutoff.is_finite() || cutoff < 0.0 {
        return Err(QuantMergeError::InvalidInput {
            reason: format!("Cutoff must be a non-negative number, got {}", cutoff),
        });
    }

    info!("Loading DE table from: {}", de_path.display());
    let table = read_de_table(de_path)?;

    match table.summary(alpha) {
        Ok(summary) => println!("{}", summary),
        Err(e) => warn!("No summary: {}", e),
    }

    let genes = match genes_file {
        Some(path) => read_gene_list(path)?,
        None if genes.is_empty() => PUBLISHED_ANR_DEGS.iter().map(|s| s.to_string()).collect(),
        None => genes,
    };

    if let Some(out) = filtered_output {
        let filtered = table.filter_abs_greater(column, cutoff)?;
        info!("Writing {} genes with |{}| > {} to: {}", filtered.n_genes(), column, cutoff, out.display());
        write_de_table(out, &filtered)?;
    }

    if strict {
        let selected = select_published(&table, column, cutoff, &genes)?;
        info!("All {} genes of interest pass the cutoff", selected.n_genes());
    }

    let counts = counts_path.map(read_expression_matrix).transpose()?;
    let report = compare_published(&table, column, cutoff, &genes, counts.as_ref())?;
    println!("{}", report);

    if let Some(out) = report_path {
        info!("Writing comparison to: {}", out.display());
        report.write_tsv(out)?;
    }

    Ok(())
}

fn run_project(config_path: &Path) -> Result<()> {
    info!("Loading project configuration from: {}", config_path.display());
    let config = ProjectConfig::from_file(config_path)?;
    let report = quantmerge::run_experiment(&config)?;
    println!("{}", report);
    info!("Done!");
    Ok(())
}
