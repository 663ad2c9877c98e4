//! Running `salmon quant` once per sample

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::ValueEnum;

use super::{run_captured, stderr_tail};
use crate::config::{DEFAULT_LIBTYPE, DEFAULT_SALMON, QUANT_DIR_SUFFIX};
use crate::error::{QuantMergeError, Result};

/// How the read files of a sample are handed to salmon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReadLayout {
    /// All files passed with `-r`
    #[default]
    Single,
    /// Exactly two files passed with `-1` and `-2`
    Paired,
}

/// Reads of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantJob {
    pub sample_id: String,
    pub reads: Vec<PathBuf>,
}

/// Drop the trailing `<separator><suffix>` of a FASTQ entry name
///
/// `SRR2035001_1` gives `SRR2035001`; only the last separator counts.
pub fn strip_read_suffix(name: &str, separator: char) -> &str {
    match name.rfind(separator) {
        Some(pos) => &name[..pos],
        None => name,
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();
    Ok(entries)
}

/// Build one job per sample found in `fastq_dir`
///
/// Every entry name in `fastq_dir` is reduced to a sample name by
/// [`strip_read_suffix`]; the sample's reads are the files inside
/// `fastq_dir/<sample>/`. Entries reducing to the same name form one job.
/// An entry without a read directory, or whose directory holds no files,
/// is skipped with a warning.
pub fn collect_quant_jobs<P: AsRef<Path>>(fastq_dir: P, separator: char) -> Result<Vec<QuantJob>> {
    let fastq_dir = fastq_dir.as_ref();
    let mut jobs: Vec<QuantJob> = Vec::new();

    for entry in sorted_entries(fastq_dir)? {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let sample_id = strip_read_suffix(&name, separator).to_string();
        if sample_id.is_empty() || jobs.iter().any(|j| j.sample_id == sample_id) {
            continue;
        }

        let sample_dir = fastq_dir.join(&sample_id);
        if !sample_dir.is_dir() {
            log::warn!(
                "Skipping '{}': no read directory {}",
                name,
                sample_dir.display()
            );
            continue;
        }

        let reads: Vec<PathBuf> = sorted_entries(&sample_dir)?
            .into_iter()
            .filter(|p| p.is_file())
            .collect();
        if reads.is_empty() {
            log::warn!("Skipping '{}': no read files in {}", name, sample_dir.display());
            continue;
        }

        jobs.push(QuantJob { sample_id, reads });
    }

    if jobs.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No samples found in {}", fastq_dir.display()),
        });
    }
    Ok(jobs)
}

/// Outcome of a quantification loop
#[derive(Debug, Clone, Default)]
pub struct QuantRunReport {
    pub succeeded: Vec<String>,
    /// `(sample_id, reason)`
    pub failed: Vec<(String, String)>,
}

impl QuantRunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `salmon quant` invocation settings shared by all samples
#[derive(Debug, Clone)]
pub struct SalmonQuant {
    pub program: String,
    pub index: PathBuf,
    pub libtype: String,
    pub layout: ReadLayout,
    pub extra_args: Vec<String>,
}

impl SalmonQuant {
    pub fn new(index: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_SALMON.to_string(),
            index: index.into(),
            libtype: DEFAULT_LIBTYPE.to_string(),
            layout: ReadLayout::Single,
            extra_args: Vec::new(),
        }
    }

    /// Output directory of a sample: `<out_root>/<sample>_quant`
    pub fn output_dir(&self, out_root: &Path, sample_id: &str) -> PathBuf {
        out_root.join(format!("{}{}", sample_id, QUANT_DIR_SUFFIX))
    }

    /// The command quantifying one sample
    pub fn command(&self, job: &QuantJob, out_root: &Path) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("quant")
            .arg("-i")
            .arg(&self.index)
            .arg("-l")
            .arg(&self.libtype);

        match self.layout {
            ReadLayout::Single => {
                cmd.arg("-r").args(&job.reads);
            }
            ReadLayout::Paired => {
                let [r1, r2] = job.reads.as_slice() else {
                    return Err(QuantMergeError::InvalidInput {
                        reason: format!(
                            "Paired layout needs exactly 2 read files for sample '{}', found {}",
                            job.sample_id,
                            job.reads.len()
                        ),
                    });
                };
                cmd.arg("-1").arg(r1).arg("-2").arg(r2);
            }
        }

        cmd.args(&self.extra_args)
            .arg("-o")
            .arg(self.output_dir(out_root, &job.sample_id));
        Ok(cmd)
    }

    /// Quantify every job, one after another
    ///
    /// A sample whose run exits non-zero is recorded as failed and the loop
    /// moves on. Failing to start salmon at all aborts immediately.
    pub fn run_all(&self, jobs: &[QuantJob], out_root: &Path) -> Result<QuantRunReport> {
        fs::create_dir_all(out_root)?;
        let mut report = QuantRunReport::default();

        for (i, job) in jobs.iter().enumerate() {
            log::info!(
                "[{}/{}] Quantifying {} ({} read file(s))",
                i + 1,
                jobs.len(),
                job.sample_id,
                job.reads.len()
            );

            let cmd = match self.command(job, out_root) {
                Ok(cmd) => cmd,
                Err(e) => {
                    log::error!("  {}: {}", job.sample_id, e);
                    report.failed.push((job.sample_id.clone(), e.to_string()));
                    continue;
                }
            };

            let output = run_captured(cmd, &self.program)?;
            if output.status.success() {
                report.succeeded.push(job.sample_id.clone());
            } else {
                let reason = format!("{}: {}", output.status, stderr_tail(&output, 3));
                log::error!("  {} failed: {}", job.sample_id, reason);
                report.failed.push((job.sample_id.clone(), reason));
            }
        }

        log::info!(
            "Quantified {} of {} samples",
            report.succeeded.len(),
            jobs.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use tempfile::tempdir;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a: &OsStr| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_strip_read_suffix() {
        assert_eq!(strip_read_suffix("SRR2035001_1", '_'), "SRR2035001");
        assert_eq!(strip_read_suffix("A_B_2", '_'), "A_B");
        assert_eq!(strip_read_suffix("plain", '_'), "plain");
    }

    #[test]
    fn test_single_end_command() {
        let salmon = SalmonQuant::new("/idx/pao1_phage");
        let job = QuantJob {
            sample_id: "SRR1".to_string(),
            reads: vec![PathBuf::from("/fq/SRR1/a.fastq"), PathBuf::from("/fq/SRR1/b.fastq")],
        };
        let cmd = salmon.command(&job, Path::new("/out")).unwrap();

        assert_eq!(cmd.get_program(), "salmon");
        assert_eq!(
            args(&cmd),
            vec![
                "quant", "-i", "/idx/pao1_phage", "-l", "A", "-r", "/fq/SRR1/a.fastq",
                "/fq/SRR1/b.fastq", "-o", "/out/SRR1_quant"
            ]
        );
    }

    #[test]
    fn test_paired_command_needs_two_files() {
        let mut salmon = SalmonQuant::new("/idx");
        salmon.layout = ReadLayout::Paired;
        salmon.extra_args = vec!["--validateMappings".to_string()];

        let job = QuantJob {
            sample_id: "S".to_string(),
            reads: vec![PathBuf::from("r1.fq"), PathBuf::from("r2.fq")],
        };
        let cmd = salmon.command(&job, Path::new("out")).unwrap();
        assert_eq!(
            args(&cmd),
            vec!["quant", "-i", "/idx", "-l", "A", "-1", "r1.fq", "-2", "r2.fq", "--validateMappings", "-o", "out/S_quant"]
        );

        let single = QuantJob {
            sample_id: "S".to_string(),
            reads: vec![PathBuf::from("r1.fq")],
        };
        assert!(salmon.command(&single, Path::new("out")).is_err());
    }

    #[test]
    fn test_collect_quant_jobs() {
        let dir = tempdir().unwrap();
        for sample in ["SRR2", "SRR1"] {
            let sub = dir.path().join(sample);
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join(format!("{}_2.fastq", sample)), "").unwrap();
            fs::write(sub.join(format!("{}_1.fastq", sample)), "").unwrap();
        }
        // Entries reducing to an existing sample are merged into its job
        fs::write(dir.path().join("SRR1_notes"), "").unwrap();

        let jobs = collect_quant_jobs(dir.path(), '_').unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].sample_id, "SRR1");
        assert_eq!(
            jobs[0].reads,
            vec![dir.path().join("SRR1/SRR1_1.fastq"), dir.path().join("SRR1/SRR1_2.fastq")]
        );
        assert_eq!(jobs[1].sample_id, "SRR2");
    }

    #[test]
    fn test_collect_skips_entries_without_reads() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("SRR1");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("SRR1_1.fastq"), "").unwrap();
        fs::write(dir.path().join("md5sums.txt"), "").unwrap();
        fs::create_dir(dir.path().join("empty_run")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let jobs = collect_quant_jobs(dir.path(), '_').unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].sample_id, "SRR1");
        assert_eq!(jobs[0].reads, vec![sub.join("SRR1_1.fastq")]);
    }

    #[test]
    fn test_collect_without_any_sample_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        assert!(matches!(
            collect_quant_jobs(dir.path(), '_'),
            Err(QuantMergeError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_missing_program_aborts() {
        let dir = tempdir().unwrap();
        let mut salmon = SalmonQuant::new("/idx");
        salmon.program = "definitely-not-a-real-salmon-binary".to_string();
        let job = QuantJob {
            sample_id: "S".to_string(),
            reads: vec![PathBuf::from("r.fq")],
        };
        assert!(matches!(
            salmon.run_all(&[job], dir.path()),
            Err(QuantMergeError::ExternalTool { .. })
        ));
    }
}
