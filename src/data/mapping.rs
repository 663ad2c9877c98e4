//! Accession to gene identifier mapping built from reference FASTA headers

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IdKind, QuantMergeError, Result};

/// How to pull the gene identifier out of a FASTA header line
///
/// The accession is always the first whitespace-delimited token after `>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRule {
    /// `key=value` in the description, either bracketed (`[locus_tag=PA0001]`)
    /// or separated by `;` / whitespace (`locus_tag=PA0001;name=dnaA`)
    Attribute(String),
    /// Zero-based `|`-separated field of the full header (`>ref|PA0001|dnaA`)
    PipeField(usize),
}

impl Default for HeaderRule {
    fn default() -> Self {
        HeaderRule::Attribute("locus_tag".to_string())
    }
}

impl HeaderRule {
    /// Parse `attr:<key>` or `pipe:<index>`
    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once(':') {
            Some(("attr", key)) if !key.is_empty() => Ok(HeaderRule::Attribute(key.to_string())),
            Some(("pipe", idx)) => idx
                .parse::<usize>()
                .map(HeaderRule::PipeField)
                .map_err(|_| QuantMergeError::InvalidInput {
                    reason: format!("Invalid pipe field index in header rule '{}'", text),
                }),
            _ => Err(QuantMergeError::InvalidInput {
                reason: format!(
                    "Invalid header rule '{}'. Use attr:<key> or pipe:<index>",
                    text
                ),
            }),
        }
    }

    /// Extract `(accession, gene_id)` from a header line without the leading `>`
    pub fn extract(&self, header: &str) -> Option<(String, String)> {
        let header = header.trim();
        let accession = header.split_whitespace().next()?.to_string();

        let gene_id = match self {
            HeaderRule::Attribute(key) => find_attribute(header, key)?,
            HeaderRule::PipeField(idx) => header
                .split_whitespace()
                .next()
                .and_then(|token| token.split('|').nth(*idx))
                .map(str::trim)
                .filter(|s| !s.is_empty())?
                .to_string(),
        };

        Some((accession, gene_id))
    }
}

fn find_attribute(header: &str, key: &str) -> Option<String> {
    bracketed_attribute(header, key).or_else(|| delimited_attribute(header, key))
}

/// `[key=value]`, where the value runs to the closing bracket and may contain spaces
fn bracketed_attribute(header: &str, key: &str) -> Option<String> {
    let mut rest = header;
    while let Some(start) = rest.find('[') {
        let inner = &rest[start + 1..];
        let end = inner.find(']')?;
        if let Some((k, v)) = inner[..end].split_once('=') {
            let v = v.trim();
            if k.trim() == key && !v.is_empty() {
                return Some(v.to_string());
            }
        }
        rest = &inner[end + 1..];
    }
    None
}

/// `key=value` separated by `;` or whitespace
fn delimited_attribute(header: &str, key: &str) -> Option<String> {
    header
        .split(|c: char| c == '[' || c == ']' || c == ';' || c.is_whitespace())
        .filter_map(|token| token.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lookup table from sequence accession to stable gene identifier
///
/// Built once per reference and handed to the callers that need it.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    map: HashMap<String, String>,
}

impl IdMapping {
    /// Create a mapping from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build the mapping from the headers of a FASTA file
    pub fn from_fasta<P: AsRef<Path>>(path: P, rule: &HeaderRule) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        Self::from_reader(reader, rule, &path.display().to_string())
    }

    /// Build the mapping from any FASTA stream; only `>` lines are inspected
    pub fn from_reader<R: BufRead>(reader: R, rule: &HeaderRule, source_name: &str) -> Result<Self> {
        let mut map: HashMap<String, String> = HashMap::new();
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            let Some(header) = line.strip_prefix('>') else {
                continue;
            };

            let Some((accession, gene_id)) = rule.extract(header) else {
                log::debug!("No gene id in header '{}'", header);
                skipped += 1;
                continue;
            };

            match map.get(&accession) {
                Some(existing) if *existing != gene_id => {
                    return Err(QuantMergeError::DuplicateIdentifier {
                        kind: IdKind::Accession,
                        id: accession,
                        source_name: source_name.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    map.insert(accession, gene_id);
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "{} header(s) in {} had no gene identifier and were skipped",
                skipped,
                source_name
            );
        }

        Ok(Self { map })
    }

    /// Gene identifier for an accession, if known
    pub fn get(&self, accession: &str) -> Option<&str> {
        self.map.get(accession).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
