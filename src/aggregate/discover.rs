//! Locating per-sample quantification outputs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};

use crate::config::QUANT_FILE_NAME;
use crate::error::{QuantMergeError, Result};

/// One sample's quantification file, with its identifier stated explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleQuant {
    pub sample_id: String,
    pub path: PathBuf,
}

impl SampleQuant {
    /// Create a sample entry; the identifier must be non-empty and free of
    /// whitespace so it can serve as a TSV row label
    pub fn new(sample_id: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let sample_id = sample_id.into();
        if sample_id.is_empty() || sample_id.chars().any(char::is_whitespace) {
            return Err(QuantMergeError::InvalidSampleId { name: sample_id });
        }
        Ok(Self {
            sample_id,
            path: path.into(),
        })
    }
}

/// Sample identifier from an output directory name: the part before the first `separator`
///
/// `SRR2035001_quant` gives `SRR2035001`; a name without the separator is used whole.
pub fn derive_sample_id(dir_name: &str, separator: char) -> Result<String> {
    let id = dir_name.split(separator).next().unwrap_or_default();
    if id.is_empty() {
        return Err(QuantMergeError::InvalidSampleId {
            name: dir_name.to_string(),
        });
    }
    Ok(id.to_string())
}

/// Find every `quant.sf` at least one directory below `root`
///
/// The sample identifier is derived from each file's parent directory name.
/// Results are sorted by path.
pub fn discover_quant_files<P: AsRef<Path>>(root: P, separator: char) -> Result<Vec<SampleQuant>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(QuantMergeError::InvalidInput {
            reason: format!("Quantification directory not found: {}", root.display()),
        });
    }

    let pattern = format!(
        "{}/**/*/{}",
        Pattern::escape(&root.to_string_lossy()),
        QUANT_FILE_NAME
    );
    log::debug!("Scanning {}", pattern);

    let mut paths: Vec<PathBuf> = glob(&pattern)?.collect::<std::result::Result<_, _>>()?;
    paths.sort();
    paths.dedup();

    if paths.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No {} files found under {}", QUANT_FILE_NAME, root.display()),
        });
    }

    paths
        .into_iter()
        .map(|path| {
            let dir_name = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let sample_id = derive_sample_id(&dir_name, separator)?;
            SampleQuant::new(sample_id, path)
        })
        .collect()
}

/// Read an explicit sample sheet: `sample_id<TAB>path` per line
///
/// Blank lines and lines starting with `#` are skipped. Relative paths are
/// resolved against the sheet's directory.
pub fn read_sample_sheet<P: AsRef<Path>>(path: P) -> Result<Vec<SampleQuant>> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let reader = BufReader::new(File::open(path)?);

    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (sample_id, quant_path) = trimmed.split_once('\t').ok_or_else(|| {
            QuantMergeError::InvalidInput {
                reason: format!(
                    "Line {} of {}: expected sample_id<TAB>path",
                    i + 1,
                    path.display()
                ),
            }
        })?;

        let quant_path = PathBuf::from(quant_path.trim());
        let quant_path = if quant_path.is_relative() {
            base.join(quant_path)
        } else {
            quant_path
        };
        samples.push(SampleQuant::new(sample_id.trim(), quant_path)?);
    }

    if samples.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No samples listed in {}", path.display()),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_derive_sample_id() {
        assert_eq!(derive_sample_id("SRR2035001_quant", '_').unwrap(), "SRR2035001");
        assert_eq!(derive_sample_id("A_B_quant", '_').unwrap(), "A");
        assert_eq!(derive_sample_id("plain", '_').unwrap(), "plain");
        assert!(derive_sample_id("_quant", '_').is_err());
    }

    #[test]
    fn test_discover_quant_files() {
        let dir = tempdir().unwrap();
        for name in ["B_quant", "A_quant", "C_quant"] {
            let sub = dir.path().join(name);
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join(QUANT_FILE_NAME), "Name\tTPM\n").unwrap();
        }
        // Not one directory below the root: ignored
        fs::write(dir.path().join(QUANT_FILE_NAME), "Name\tTPM\n").unwrap();
        // Other files in sample directories: ignored
        fs::write(dir.path().join("A_quant").join("lib_format_counts.json"), "{}").unwrap();

        let found = discover_quant_files(dir.path(), '_').unwrap();
        let ids: Vec<&str> = found.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(found[0].path.ends_with("A_quant/quant.sf"));
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_quant_files(dir.path(), '_'),
            Err(QuantMergeError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_read_sample_sheet() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("samples.tsv");
        let mut file = fs::File::create(&sheet).unwrap();
        writeln!(file, "# sample\tpath").unwrap();
        writeln!(file, "WT1\tquant/run7/quant.sf").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "ANR1\t/data/quant/run8/quant.sf").unwrap();

        let samples = read_sample_sheet(&sheet).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].sample_id, "WT1");
        assert_eq!(samples[0].path, dir.path().join("quant/run7/quant.sf"));
        assert_eq!(samples[1].path, PathBuf::from("/data/quant/run8/quant.sf"));
    }

    #[test]
    fn test_sample_id_validated() {
        assert!(SampleQuant::new("", "x").is_err());
        assert!(SampleQuant::new("a b", "x").is_err());
    }
}
