//! Section Locator
//!
//! Reports are loosely structured: a section starts at a row whose first
//! cell is an exact tag (`<ETDRS>`, `Eye`) and runs until the next row whose
//! first cell begins with the section marker, or a blank row.

use etdrs_common::text::{first_cell, is_blank_row};

/// Leading character of every bracketed section tag
pub const SECTION_MARKER: char = '<';

/// Header line of the acquisition block when the export left it unsplit
pub const EYE_HEADER_PREFIX: &str =
    "Eye,S/N,Version(F/S),Date,SSI,SLO,Focus[D],Ref[D],Axial[mm],SQI";

/// Exact-match section tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTag {
    /// First-cell text, compared after trimming
    pub tag: &'static str,
    /// Alternative free-text prefix of the comma-joined row
    pub joined_prefix: Option<&'static str>,
}

impl SectionTag {
    pub const fn exact(tag: &'static str) -> Self {
        Self {
            tag,
            joined_prefix: None,
        }
    }

    /// Does `row` open this section?
    pub fn matches(&self, row: &[String]) -> bool {
        if row.is_empty() {
            return false;
        }
        if first_cell(row) == self.tag {
            return true;
        }
        match self.joined_prefix {
            Some(prefix) => row.join(",").starts_with(prefix),
            None => false,
        }
    }
}

/// Acquisition block that carries the eye side
pub const EYE_TAG: SectionTag = SectionTag {
    tag: "Eye",
    joined_prefix: Some(EYE_HEADER_PREFIX),
};

/// Index of the first row opening `tag`, scanning from the top
pub fn locate(rows: &[Vec<String>], tag: &SectionTag) -> Option<usize> {
    rows.iter().position(|row| tag.matches(row))
}

/// Row starting another bracketed section
pub fn is_section_boundary(row: &[String]) -> bool {
    first_cell(row).starts_with(SECTION_MARKER)
}

/// Blank rows close the loosely delimited blocks
pub fn is_blank(row: &[String]) -> bool {
    is_blank_row(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_exact_first_cell_match() {
        let report = rows(&[&["Patient", "x"], &[" <ETDRS> ", ""], &["<ETDRS>"]]);
        assert_eq!(locate(&report, &SectionTag::exact("<ETDRS>")), Some(1));
    }

    #[test]
    fn test_no_partial_match() {
        let report = rows(&[&["<ETDRS 9 Sector Density>"], &["<ETDRS>x"]]);
        assert_eq!(locate(&report, &SectionTag::exact("<ETDRS>")), None);
        assert_eq!(
            locate(&report, &SectionTag::exact("<ETDRS 9 Sector Density>")),
            Some(0)
        );
    }

    #[test]
    fn test_joined_header_match() {
        let joined = format!("{},extra", EYE_HEADER_PREFIX);
        let report = rows(&[&["Patient"], &[joined.as_str()]]);
        assert_eq!(locate(&report, &EYE_TAG), Some(1));
    }

    #[test]
    fn test_split_eye_header_match() {
        let report = rows(&[&[], &["Eye", "S/N", "Version(F/S)"]]);
        assert_eq!(locate(&report, &EYE_TAG), Some(1));
    }

    #[test]
    fn test_not_found_is_none() {
        let report = rows(&[&["Center", "1.0"]]);
        assert_eq!(locate(&report, &EYE_TAG), None);
        assert_eq!(locate(&[], &EYE_TAG), None);
    }

    #[test]
    fn test_boundary_and_blank() {
        assert!(is_section_boundary(&["  <Layer>".to_string()]));
        assert!(!is_section_boundary(&["Center".to_string()]));
        assert!(!is_section_boundary(&[]));
        assert!(is_blank(&[" ".to_string()]));
    }
}
