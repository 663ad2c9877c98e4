//! Sample metadata for one experiment

use std::collections::{HashMap, HashSet};

use crate::error::{IdKind, QuantMergeError, Result};

/// Sample metadata: one row per sample, one column per experiment attribute
///
/// The row identifiers select which expression rows belong to the experiment.
#[derive(Debug, Clone)]
pub struct SampleMetadata {
    /// Sample identifiers, in file order
    sample_ids: Vec<String>,
    /// Attribute column names, in file order
    columns: Vec<String>,
    /// Attribute values (column name -> values for each sample)
    values: HashMap<String, Vec<String>>,
}

impl SampleMetadata {
    /// Create new sample metadata; identifiers must be unique
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id) {
                return Err(QuantMergeError::DuplicateIdentifier {
                    kind: IdKind::Sample,
                    id: id.clone(),
                    source_name: "sample metadata".to_string(),
                });
            }
        }
        Ok(Self {
            sample_ids,
            columns: Vec::new(),
            values: HashMap::new(),
        })
    }

    /// Add an attribute column (condition, batch, ...)
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.sample_ids.len() {
            return Err(QuantMergeError::DimensionMismatch {
                expected: format!("{} values", self.sample_ids.len()),
                got: format!("{} values", values.len()),
            });
        }
        if !self.values.contains_key(name) {
            self.columns.push(name.to_string());
        }
        self.values.insert(name.to_string(), values);
        Ok(())
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Attribute column names in file order
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Value of an attribute for a specific sample
    pub fn get_value(&self, column: &str, sample_idx: usize) -> Option<&str> {
        self.values
            .get(column)
            .and_then(|v| v.get(sample_idx))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_metadata() {
        let mut meta = SampleMetadata::new(vec![
            "SRR2035001".to_string(),
            "SRR2035002".to_string(),
            "SRR2035003".to_string(),
            "SRR2035004".to_string(),
        ])
        .unwrap();

        meta.add_column(
            "genotype",
            vec![
                "wt".to_string(),
                "wt".to_string(),
                "anr".to_string(),
                "anr".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(meta.column_names(), &["genotype"]);
        assert_eq!(meta.get_value("genotype", 2), Some("anr"));
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        let result = SampleMetadata::new(vec!["s1".to_string(), "s1".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_column_length_checked() {
        let mut meta = SampleMetadata::new(vec!["s1".to_string()]).unwrap();
        assert!(meta.add_column("batch", vec![]).is_err());
    }
}
