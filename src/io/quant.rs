//! Reading salmon `quant.sf` files

use std::fs::File;
use std::path::Path;

use clap::ValueEnum;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use super::tsv::parse_value;
use crate::error::{QuantMergeError, Result};

/// Numeric columns of a salmon `quant.sf` file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum QuantColumn {
    Length,
    EffectiveLength,
    #[default]
    Tpm,
    NumReads,
}

impl QuantColumn {
    /// Header name as written by salmon
    pub fn header(&self) -> &'static str {
        match self {
            QuantColumn::Length => "Length",
            QuantColumn::EffectiveLength => "EffectiveLength",
            QuantColumn::Tpm => "TPM",
            QuantColumn::NumReads => "NumReads",
        }
    }
}

impl std::fmt::Display for QuantColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// Header of the transcript name column
const NAME_COLUMN: &str = "Name";

/// Read one numeric column of a `quant.sf` file as `(name, value)` pairs in file order
pub fn read_quant_column<P: AsRef<Path>>(path: P, column: QuantColumn) -> Result<Vec<(String, f64)>> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let file = File::open(path)?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| QuantMergeError::MissingColumn {
                column: name.to_string(),
                source_name: source_name.clone(),
            })
    };
    let name_idx = find(NAME_COLUMN)?;
    let value_idx = find(column.header())?;

    let mut entries = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let name = record.get(name_idx).unwrap_or_default().trim().to_string();
        let raw = record.get(value_idx).unwrap_or_default();
        entries.push((name, parse_value(raw, &source_name, line)?));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn quant_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Name\tLength\tEffectiveLength\tTPM\tNumReads").unwrap();
        writeln!(file, "PGD134012\t1554\t1371.563\t52.317\t402.000").unwrap();
        writeln!(file, "PGD134014\t1104\t921.563\t0.000\t0.000").unwrap();
        file
    }

    #[test]
    fn test_read_tpm_column() {
        let file = quant_file();
        let tpm = read_quant_column(file.path(), QuantColumn::Tpm).unwrap();
        assert_eq!(
            tpm,
            vec![("PGD134012".to_string(), 52.317), ("PGD134014".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_read_num_reads_column() {
        let file = quant_file();
        let reads = read_quant_column(file.path(), QuantColumn::NumReads).unwrap();
        assert_eq!(reads[0].1, 402.0);
    }

    #[test]
    fn test_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Name\tLength").unwrap();
        writeln!(file, "t1\t10").unwrap();
        assert!(matches!(
            read_quant_column(file.path(), QuantColumn::Tpm),
            Err(QuantMergeError::MissingColumn { .. })
        ));
    }
}
