//! Delimited text reading and writing for expression matrices, metadata and DE tables

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::data::{DeTable, ExpressionMatrix, SampleMetadata};
use crate::error::{QuantMergeError, Result};

/// Marker written for missing values (readable by pandas and R alike)
pub const MISSING: &str = "NA";

/// Strip surrounding quotes from a string
fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Parse a numeric cell; empty, `NA` and `NaN` become `NaN`
pub(crate) fn parse_value(raw: &str, source_name: &str, line: usize) -> Result<f64> {
    let val = strip_quotes(raw);
    match val.as_str() {
        "" | "NA" | "NaN" | "nan" | "NAN" => Ok(f64::NAN),
        _ => val.parse::<f64>().map_err(|_| QuantMergeError::InvalidValue {
            source_name: source_name.to_string(),
            line,
            value: val,
        }),
    }
}

/// Format a cell for output; `NaN` becomes [`MISSING`]
pub(crate) fn format_value(value: f64) -> String {
    if value.is_nan() {
        MISSING.to_string()
    } else {
        value.to_string()
    }
}

/// Raw content of a table whose first column holds row identifiers
struct RawTable {
    columns: Vec<String>,
    row_ids: Vec<String>,
    /// Each row's fields after the identifier, with their 1-based line number
    rows: Vec<(usize, Vec<String>)>,
}

/// Read a delimited table, detecting tab vs comma from the header line
///
/// The header may name the row identifier column (pandas layout) or omit it
/// (R `write.table` with row names): when every data row has exactly one
/// field more than the header, all header cells are column names.
fn read_raw_table(path: &Path) -> Result<RawTable> {
    let source_name = path.display().to_string();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines.next().ok_or_else(|| QuantMergeError::EmptyData {
        reason: format!("Empty file: {}", source_name),
    })??;

    let mut data: Vec<(usize, String)> = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            data.push((i + 2, line));
        }
    }

    // A one-column R table has no delimiter in its header
    let sniff = if header_line.contains(|c: char| c == '\t' || c == ',') {
        header_line.as_str()
    } else {
        data.first().map(|(_, l)| l.as_str()).unwrap_or_default()
    };
    let delimiter = if sniff.contains('\t') { '\t' } else { ',' };

    let header: Vec<String> = header_line.split(delimiter).map(strip_quotes).collect();
    let split_rows: Vec<(usize, Vec<&str>)> = data
        .iter()
        .map(|(line_no, line)| (*line_no, line.split(delimiter).collect()))
        .collect();

    let unnamed_index = !split_rows.is_empty()
        && split_rows.iter().all(|(_, fields)| fields.len() == header.len() + 1);
    let columns: Vec<String> = if unnamed_index {
        header
    } else if header.len() < 2 {
        return Err(QuantMergeError::InvalidInput {
            reason: format!("Not enough columns in header of {}", source_name),
        });
    } else {
        header[1..].to_vec()
    };

    let mut row_ids = Vec::with_capacity(split_rows.len());
    let mut rows = Vec::with_capacity(split_rows.len());

    for (line_no, fields) in split_rows {
        if fields.len() != columns.len() + 1 {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} columns", columns.len() + 1),
                got: format!("{} columns at line {} of {}", fields.len(), line_no, source_name),
            });
        }

        row_ids.push(strip_quotes(fields[0]));
        rows.push((line_no, fields[1..].iter().map(|s| strip_quotes(s)).collect()));
    }

    Ok(RawTable {
        columns,
        row_ids,
        rows,
    })
}

fn to_numeric(rows: &[(usize, Vec<String>)], n_cols: usize, source_name: &str) -> Result<Array2<f64>> {
    let mut values = Array2::from_elem((rows.len(), n_cols), f64::NAN);
    for (i, (line_no, fields)) in rows.iter().enumerate() {
        for (j, field) in fields.iter().enumerate() {
            values[[i, j]] = parse_value(field, source_name, *line_no)?;
        }
    }
    Ok(values)
}

/// Read an expression matrix
///
/// Expected format: header row of gene IDs, first column is sample IDs.
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let raw = read_raw_table(path)?;

    if raw.row_ids.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No samples found in {}", source_name),
        });
    }

    let values = to_numeric(&raw.rows, raw.columns.len(), &source_name)?;
    ExpressionMatrix::new(values, raw.row_ids, raw.columns)
        .map_err(|e| relabel(e, &source_name))
        .map(|m| m.with_source(source_name))
}

/// Write an expression matrix as TSV (first header cell `sample_id`)
pub fn write_expression_matrix<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "sample_id\t{}", matrix.gene_ids().join("\t"))?;
    for (i, sample_id) in matrix.sample_ids().iter().enumerate() {
        let row: Vec<String> = matrix.sample_values(i).iter().map(|&v| format_value(v)).collect();
        writeln!(out, "{}\t{}", sample_id, row.join("\t"))?;
    }

    out.flush()?;
    Ok(())
}

/// Read sample metadata
///
/// Expected format: first column is sample IDs, remaining columns are attributes.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let raw = read_raw_table(path)?;

    if raw.row_ids.is_empty() {
        return Err(QuantMergeError::EmptyData {
            reason: format!("No samples found in {}", source_name),
        });
    }

    let mut columns: HashMap<&str, Vec<String>> = HashMap::new();
    for (_, fields) in &raw.rows {
        for (name, value) in raw.columns.iter().zip(fields) {
            columns.entry(name.as_str()).or_default().push(value.clone());
        }
    }

    let mut metadata = SampleMetadata::new(raw.row_ids).map_err(|e| relabel(e, &source_name))?;
    for name in &raw.columns {
        let values = columns.remove(name.as_str()).unwrap_or_default();
        metadata.add_column(name, values)?;
    }

    Ok(metadata)
}

/// Read a DE statistics table (first column is gene IDs)
pub fn read_de_table<P: AsRef<Path>>(path: P) -> Result<DeTable> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let raw = read_raw_table(path)?;

    let values = to_numeric(&raw.rows, raw.columns.len(), &source_name)?;
    DeTable::new(raw.row_ids, raw.columns, values)
        .map_err(|e| relabel(e, &source_name))
        .map(|t| t.with_source(source_name))
}

/// Write a DE statistics table as TSV (first header cell `gene_id`)
pub fn write_de_table<P: AsRef<Path>>(path: P, table: &DeTable) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "gene_id\t{}", table.columns().join("\t"))?;
    let columns: Vec<_> = table
        .columns()
        .iter()
        .map(|c| table.column(c))
        .collect::<Result<_>>()?;
    for (i, gene_id) in table.gene_ids().iter().enumerate() {
        let row: Vec<String> = columns.iter().map(|col| format_value(col[i])).collect();
        writeln!(out, "{}\t{}", gene_id, row.join("\t"))?;
    }

    out.flush()?;
    Ok(())
}

/// Point duplicate-identifier errors at the file they came from
fn relabel(err: QuantMergeError, source_name: &str) -> QuantMergeError {
    match err {
        QuantMergeError::DuplicateIdentifier { kind, id, .. } => QuantMergeError::DuplicateIdentifier {
            kind,
            id,
            source_name: source_name.to_string(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expression_matrix() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tPA0001\tPA0002\tPA0003").unwrap();
        writeln!(file, "SRR1\t100\t200.5\tNA").unwrap();
        writeln!(file, "SRR2\t50\t\t60").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_samples(), 2);
        assert_eq!(matrix.n_genes(), 3);
        assert_eq!(matrix.value("SRR1", "PA0002"), Some(200.5));
        assert!(matrix.value("SRR1", "PA0003").unwrap().is_nan());
        assert!(matrix.value("SRR2", "PA0002").unwrap().is_nan());
        assert_eq!(matrix.n_missing(), 2);
    }

    #[test]
    fn test_read_comma_separated_with_quotes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"\",\"g1\",\"g2\"").unwrap();
        writeln!(file, "\"s1\",1,2").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.gene_ids(), &["g1", "g2"]);
        assert_eq!(matrix.sample_ids(), &["s1"]);
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tg1").unwrap();
        writeln!(file, "s1\t1").unwrap();
        writeln!(file, "s2\tabc").unwrap();

        match read_expression_matrix(file.path()).unwrap_err() {
            QuantMergeError::InvalidValue { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_expression_matrix_write_then_read_keeps_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tg1\tg2").unwrap();
        writeln!(file, "A\t10\tNA").unwrap();
        writeln!(file, "B\t0.125\t5").unwrap();
        let matrix = read_expression_matrix(file.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        write_expression_matrix(out.path(), &matrix).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text, "sample_id\tg1\tg2\nA\t10\tNA\nB\t0.125\t5\n");
    }

    #[test]
    fn test_read_metadata_keeps_column_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tgenotype\tbatch").unwrap();
        writeln!(file, "s1\twt\t1").unwrap();
        writeln!(file, "s2\tanr\t1").unwrap();

        let meta = read_metadata(file.path()).unwrap();
        assert_eq!(meta.sample_ids(), &["s1", "s2"]);
        assert_eq!(meta.column_names(), &["genotype", "batch"]);
        assert_eq!(meta.get_value("genotype", 1), Some("anr"));
    }

    #[test]
    fn test_read_de_table_with_r_missing_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tbaseMean\tlog2FoldChange\tlfcSE\tstat\tpvalue\tpadj").unwrap();
        writeln!(file, "PA1557\t120.5\t2.3\t0.4\t5.75\t1e-8\t2e-7").unwrap();
        writeln!(file, "PA3847\t0\tNA\tNA\tNA\tNA\tNA").unwrap();

        let table = read_de_table(file.path()).unwrap();
        assert_eq!(table.n_genes(), 2);
        assert_eq!(table.value("PA1557", "log2FoldChange"), Some(2.3));
        assert!(table.value("PA3847", "padj").unwrap().is_nan());
    }

    #[test]
    fn test_read_de_table_r_layout_without_index_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "baseMean\tlog2FoldChange\tlfcSE\tstat\tpvalue\tpadj").unwrap();
        writeln!(file, "PA1557\t120.5\t2.3\t0.4\t5.75\t1e-8\t2e-7").unwrap();
        writeln!(file, "PA3847\t0\tNA\tNA\tNA\tNA\tNA").unwrap();

        let table = read_de_table(file.path()).unwrap();
        assert_eq!(table.gene_ids(), &["PA1557", "PA3847"]);
        assert_eq!(table.columns().len(), 6);
        assert_eq!(table.value("PA1557", "baseMean"), Some(120.5));
        assert_eq!(table.value("PA1557", "log2FoldChange"), Some(2.3));
    }

    #[test]
    fn test_read_single_column_r_layout() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log2FoldChange").unwrap();
        writeln!(file, "PA1\t-1.5").unwrap();

        let table = read_de_table(file.path()).unwrap();
        assert_eq!(table.value("PA1", "log2FoldChange"), Some(-1.5));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tg1\tg2").unwrap();
        writeln!(file, "s1\t1\t2").unwrap();
        writeln!(file, "s2\t1").unwrap();

        assert!(matches!(
            read_expression_matrix(file.path()),
            Err(QuantMergeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_sample_points_at_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\tg1").unwrap();
        writeln!(file, "s1\t1").unwrap();
        writeln!(file, "s1\t2").unwrap();

        match read_expression_matrix(file.path()).unwrap_err() {
            QuantMergeError::DuplicateIdentifier { id, source_name, .. } => {
                assert_eq!(id, "s1");
                assert_eq!(source_name, file.path().display().to_string());
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
