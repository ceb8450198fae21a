//! Subject identifier canonicalisation
//!
//! Canonical form is a two-letter prefix followed by exactly four digits
//! (`EG0001`). Two other shapes are accepted and normalised:
//!
//! 1. Four bare digits at or below the inclusion threshold (`0001` → `EG0001`).
//! 2. Canonical form plus a positive numeric suffix (`EG0002-1` → `EG0002`);
//!    the original spelling is kept for the audit report.
//!
//! Anything else is rejected and excluded from calculation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{info, warn};

/// Canonical subject identifier, the join key of every table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a table key without validation.
    ///
    /// Tables read from disk are keyed by whatever their identifier column
    /// holds; only ingestion goes through [`IdentifierPolicy`].
    pub fn from_key(key: impl Into<String>) -> Self {
        SubjectId(key.into())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a raw identifier was excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    /// Four bare digits above the inclusion threshold
    AboveThreshold(u32),
    /// Matches none of the accepted shapes
    Unrecognized,
}

/// Classification of one raw identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdClass {
    /// Already canonical, used as-is
    Canonical(SubjectId),
    /// Four bare digits, prefix added
    Padded(SubjectId),
    /// Numeric suffix stripped; `original` is audited
    Suffixed { id: SubjectId, original: String },
    /// Excluded from calculation
    Rejected { raw: String, reason: RejectReason },
}

impl IdClass {
    /// Identifier to calculate with, if accepted
    pub fn subject(&self) -> Option<&SubjectId> {
        match self {
            IdClass::Canonical(id) | IdClass::Padded(id) => Some(id),
            IdClass::Suffixed { id, .. } => Some(id),
            IdClass::Rejected { .. } => None,
        }
    }
}

/// Identifier rules: canonical prefix and bare-digit inclusion threshold
#[derive(Debug, Clone)]
pub struct IdentifierPolicy {
    prefix: String,
    threshold: u32,
}

impl IdentifierPolicy {
    pub fn new(prefix: impl Into<String>, threshold: u32) -> Self {
        Self {
            prefix: prefix.into(),
            threshold,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Classify a raw identifier. Rules are tried in order.
    pub fn classify(&self, raw: &str) -> IdClass {
        let raw = raw.trim();
        if raw.is_empty() {
            return IdClass::Rejected {
                raw: String::new(),
                reason: RejectReason::Empty,
            };
        }

        if is_four_digits(raw) {
            let value: u32 = raw.parse().unwrap_or(u32::MAX);
            return if value <= self.threshold {
                IdClass::Padded(SubjectId(format!("{}{}", self.prefix, raw)))
            } else {
                IdClass::Rejected {
                    raw: raw.to_string(),
                    reason: RejectReason::AboveThreshold(value),
                }
            };
        }

        if let Some((head, suffix)) = raw.split_once('-') {
            if self.is_canonical(head) && is_positive_integer(suffix) {
                return IdClass::Suffixed {
                    id: SubjectId(head.to_string()),
                    original: raw.to_string(),
                };
            }
        }

        if self.is_canonical(raw) {
            return IdClass::Canonical(SubjectId(raw.to_string()));
        }

        IdClass::Rejected {
            raw: raw.to_string(),
            reason: RejectReason::Unrecognized,
        }
    }

    /// Canonical identifier, or `None` when rejected
    pub fn canonicalize(&self, raw: &str) -> Option<SubjectId> {
        self.classify(raw).subject().cloned()
    }

    /// Prefix followed by exactly four ASCII digits
    pub fn is_canonical(&self, candidate: &str) -> bool {
        candidate
            .strip_prefix(self.prefix.as_str())
            .map(is_four_digits)
            .unwrap_or(false)
    }

    /// Raw identifier token carried by a report file name
    ///
    /// The first `<prefix><4 digits>` occurrence wins, extended by a
    /// `-<digits>` suffix when one follows. Without such an occurrence the
    /// leading token of the stem (up to `_` or whitespace) is returned.
    pub fn raw_from_filename(&self, file_name: &str) -> String {
        for (start, _) in file_name.char_indices() {
            let Some(rest) = file_name[start..].strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            let head = rest.as_bytes();
            if head.len() < 4 || !head[..4].iter().all(u8::is_ascii_digit) {
                continue;
            }
            let mut end = start + self.prefix.len() + 4;
            if let Some(after_dash) = file_name[end..].strip_prefix('-') {
                let digits = after_dash.bytes().take_while(u8::is_ascii_digit).count();
                // a zero-led run is a date or serial, not a repeat suffix
                if is_positive_integer(&after_dash[..digits]) {
                    end += 1 + digits;
                }
            }
            return file_name[start..end].to_string();
        }

        let stem = match file_name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        stem.split(|c: char| c == '_' || c.is_whitespace())
            .next()
            .unwrap_or("")
            .to_string()
    }
}

fn is_four_digits(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_positive_integer(s: &str) -> bool {
    !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit())
}

/// Audit ledger of identifiers that were normalised or excluded
///
/// Keys are the raw spellings; values are the source file names. Sets, so a
/// recurring identifier is reported once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdAudit {
    /// Suffixed spellings (`EG0002-1`) that were calculated under their base id
    pub stripped: BTreeMap<String, BTreeSet<String>>,
    /// Raw identifiers excluded from calculation
    pub rejected: BTreeMap<String, BTreeSet<String>>,
}

impl IdAudit {
    /// Note a classification made for `source`
    pub fn record(&mut self, class: &IdClass, source: &str) {
        match class {
            IdClass::Suffixed { original, .. } => {
                self.stripped
                    .entry(original.clone())
                    .or_default()
                    .insert(source.to_string());
            }
            IdClass::Rejected { raw, .. } => {
                self.rejected
                    .entry(raw.clone())
                    .or_default()
                    .insert(source.to_string());
            }
            IdClass::Canonical(_) | IdClass::Padded(_) => {}
        }
    }

    /// Fold another ledger into this one
    pub fn merge(&mut self, other: IdAudit) {
        for (raw, files) in other.stripped {
            self.stripped.entry(raw).or_default().extend(files);
        }
        for (raw, files) in other.rejected {
            self.rejected.entry(raw).or_default().extend(files);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stripped.is_empty() && self.rejected.is_empty()
    }

    /// Emit the ledger through tracing
    pub fn log(&self) {
        if !self.stripped.is_empty() {
            info!(
                "{} suffixed identifier(s) found; calculated under the suffix-free id",
                self.stripped.len()
            );
            for (raw, files) in &self.stripped {
                info!("  ID: {} | files: {}", raw, join(files));
            }
        }
        if !self.rejected.is_empty() {
            warn!(
                "{} identifier(s) matched no accepted shape and were excluded",
                self.rejected.len()
            );
            for (raw, files) in &self.rejected {
                warn!("  ID: {} | files: {}", raw, join(files));
            }
        }
    }
}

fn join(files: &BTreeSet<String>) -> String {
    files.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
