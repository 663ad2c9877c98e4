//! Command-line interface for quantmerge

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::aggregate::DuplicatePolicy;
use crate::external::ReadLayout;
use crate::io::QuantColumn;

#[derive(Parser)]
#[command(name = "quantmerge")]
#[command(version)]
#[command(about = "Consolidate salmon quantifications and compare DE results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 't', long, global = true, default_value = "0")]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run salmon quant for every sample in a FASTQ directory
    #[command(
        long_about = "Run `salmon quant` once per sample.\n\n\
            Every entry of the FASTQ directory is reduced to a sample name by removing\n\
            its trailing `_<suffix>`; the reads of that sample are the files inside\n\
            <FASTQ_DIR>/<sample>/. Each sample is written to <OUTPUT>/<sample>_quant.",
        after_long_help = "\
Examples:
  quantmerge quant -f fastq/ -i index/pao1_phage -o quant/pao1_phage
  quantmerge quant -f fastq/ -i index/pa14 -o quant/pa14 --layout paired --salmon-arg=--validateMappings"
    )]
    Quant {
        /// Directory with one read directory per sample
        #[arg(short, long, value_name = "DIR")]
        fastq_dir: PathBuf,

        /// Salmon index
        #[arg(short, long, value_name = "DIR")]
        index: PathBuf,

        /// Output root; one <sample>_quant directory per sample
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Salmon library type
        #[arg(short, long, default_value = crate::config::DEFAULT_LIBTYPE)]
        libtype: String,

        /// How read files are passed to salmon
        #[arg(long, value_enum, default_value_t = ReadLayout::Single)]
        layout: ReadLayout,

        /// Salmon executable
        #[arg(long, default_value = crate::config::DEFAULT_SALMON)]
        salmon: String,

        /// Extra argument passed to salmon quant (repeatable)
        #[arg(long = "salmon-arg", value_name = "ARG", allow_hyphen_values = true)]
        salmon_args: Vec<String>,

        /// Separator before the suffix removed from FASTQ entry names
        #[arg(long, default_value_t = crate::config::SAMPLE_SEPARATOR)]
        separator: char,
    },

    /// Consolidate quant.sf files into one samples x genes matrix
    #[command(
        long_about = "Consolidate per-sample quant.sf files into one expression matrix.\n\n\
            Rows are samples, columns are transcript names (union over all samples).\n\
            A name missing from a sample's file is written as NA, never as 0.",
        after_long_help = "\
Examples:
  # Derive sample ids from directory names (SRR2035001_quant -> SRR2035001)
  quantmerge aggregate -q quant/pao1_phage -o pao1_phage_ge.tsv

  # Explicit sample sheet (sample_id<TAB>path)
  quantmerge aggregate -s samples.tsv -c num-reads -o pao1_counts.tsv"
    )]
    Aggregate {
        /// Root directory scanned for <dir>/quant.sf
        #[arg(short, long, value_name = "DIR", conflicts_with = "samples", required_unless_present = "samples")]
        quant_dir: Option<PathBuf>,

        /// Sample sheet: sample_id<TAB>path to quant.sf
        #[arg(short, long, value_name = "FILE")]
        samples: Option<PathBuf>,

        /// quant.sf column to extract
        #[arg(short, long, value_enum, default_value_t = QuantColumn::Tpm)]
        column: QuantColumn,

        /// Directory name separator; the sample id is the part before it
        #[arg(long, default_value_t = crate::config::SAMPLE_SEPARATOR)]
        separator: char,

        /// Resolution of two files with the same sample id
        #[arg(long, value_enum, default_value_t = DuplicatePolicy::Error)]
        on_duplicate: DuplicatePolicy,

        /// Output TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Select an experiment's samples and rename gene columns
    #[command(after_long_help = "\
Examples:
  quantmerge select -e pao1_ge.tsv -m PRJNA283002_meta.tsv -r pao1.ffn -o selected_ge.tsv
  quantmerge select -e pao1_ge.tsv -m meta.tsv -r pao1.fa --header-rule pipe:1 -o selected_ge.tsv")]
    Select {
        /// Full expression matrix (samples x genes)
        #[arg(short, long)]
        expression: PathBuf,

        /// Sample metadata; its first column lists the samples to keep
        #[arg(short, long)]
        metadata: PathBuf,

        /// Reference FASTA whose headers map accessions to gene ids
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Header rule: attr:<key> or pipe:<index>
        #[arg(long, default_value = "attr:locus_tag")]
        header_rule: String,

        /// Output TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Prepare integer counts for DESeq2
    Prepare {
        /// Selected expression matrix
        #[arg(short, long)]
        expression: PathBuf,

        /// Sample metadata (defines row order)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Output TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Drop genes whose mean count is not above this value
        #[arg(long)]
        count_threshold: Option<f64>,
    },

    /// Run the external DE script
    #[command(after_long_help = "\
Examples:
  quantmerge de -s scripts/DE_analysis.R -m meta.tsv -c selected_processed.tsv -o DE_stats.txt")]
    De {
        /// DE script
        #[arg(short, long)]
        script: PathBuf,

        /// Sample metadata
        #[arg(short, long)]
        metadata: PathBuf,

        /// Processed counts
        #[arg(short, long)]
        counts: PathBuf,

        /// Output table written by the script
        #[arg(short, long)]
        output: PathBuf,

        /// Interpreter
        #[arg(long, default_value = "Rscript")]
        program: String,
    },

    /// Filter DE results by |log2FoldChange| and compare against published genes
    #[command(
        long_about = "Filter a DE table by absolute fold change and compare it against a gene list.\n\n\
            A gene passes when |value| > cutoff (strict). Without --genes/--genes-file the\n\
            published Anr regulon list is used. With --strict, any listed gene that did not\n\
            pass the cutoff is an error; otherwise every gene is reported with its status.",
        after_long_help = "\
Examples:
  quantmerge compare -d DE_stats.txt --counts selected_processed.tsv
  quantmerge compare -d DE_stats.txt --cutoff 2 -g PA1557,PA3928 --strict"
    )]
    Compare {
        /// DE statistics table
        #[arg(short, long)]
        de_table: PathBuf,

        /// Absolute fold change cutoff
        #[arg(long, default_value_t = crate::config::DEFAULT_LFC_CUTOFF)]
        cutoff: f64,

        /// Column compared against the cutoff
        #[arg(long, default_value = crate::data::LOG2FC_COLUMN)]
        column: String,

        /// Genes of interest (comma separated or repeated)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "genes_file")]
        genes: Vec<String>,

        /// File with one gene of interest per line
        #[arg(long)]
        genes_file: Option<PathBuf>,

        /// Processed counts, to flag genes with zero counts everywhere
        #[arg(long)]
        counts: Option<PathBuf>,

        /// Write the rows passing the cutoff here
        #[arg(long)]
        filtered_output: Option<PathBuf>,

        /// Write the per-gene report here
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Fail if any gene of interest did not pass the cutoff
        #[arg(long)]
        strict: bool,

        /// padj threshold used in the summary
        #[arg(short, long, default_value_t = crate::config::DEFAULT_ALPHA)]
        alpha: f64,
    },

    /// Run select, prepare, DE and compare from a JSON project file
    Run {
        /// Project configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}
