//! Eye-Side Resolver
//!
//! The acquisition block under the `Eye` header lists one row per measured
//! eye, each starting with `R` or `L`. The scanner is an explicit state
//! machine over the row sequence:
//!
//! ```text
//! SeekingHeader --Eye tag--> Scanning --halt condition--> Halted
//! ```
//!
//! Two modes share the machine. `SingleVerdict` halts on the first side it
//! sees and steps over unrelated rows. `Presence` keeps collecting sides
//! until a boundary, a blank row, or an unrelated row.

use super::section::{is_blank, is_section_boundary, locate, EYE_TAG};
use etdrs_common::text::first_cell;
use etdrs_common::Side;
use serde::Serialize;
use tracing::debug;

/// Which answer the scan produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeMode {
    /// First side seen; later rows ignored
    SingleVerdict,
    /// Independent right/left flags over the whole block
    Presence,
}

/// Sides listed in the acquisition block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EyePresence {
    pub right: bool,
    pub left: bool,
}

impl EyePresence {
    pub fn has(self, side: Side) -> bool {
        match side {
            Side::Right => self.right,
            Side::Left => self.left,
        }
    }

    fn mark(&mut self, side: Side) {
        match side {
            Side::Right => self.right = true,
            Side::Left => self.left = true,
        }
    }
}

/// Why scanning stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// No `Eye` tag anywhere in the report
    HeaderMissing,
    /// Single-verdict mode saw its side
    SideFound,
    /// Next bracketed section
    Boundary,
    BlankRow,
    /// Presence mode met a row that is not a side row
    UnrelatedRow,
    EndOfReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingHeader,
    Scanning,
    Halted(HaltReason),
}

/// Result of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeScan {
    /// First side encountered
    pub first: Option<Side>,
    pub presence: EyePresence,
    pub halt: HaltReason,
}

/// Scanner for the acquisition block
#[derive(Debug, Clone, Copy)]
pub struct EyeSideResolver {
    mode: EyeMode,
}

impl EyeSideResolver {
    pub fn new(mode: EyeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> EyeMode {
        self.mode
    }

    /// Run the state machine over `rows`
    pub fn scan(&self, rows: &[Vec<String>]) -> EyeScan {
        let mut first = None;
        let mut presence = EyePresence::default();
        let mut state = ScanState::SeekingHeader;
        let mut cursor = 0;

        loop {
            state = match state {
                ScanState::SeekingHeader => match locate(rows, &EYE_TAG) {
                    Some(header) => {
                        cursor = header + 1;
                        ScanState::Scanning
                    }
                    None => ScanState::Halted(HaltReason::HeaderMissing),
                },
                ScanState::Scanning => match rows.get(cursor) {
                    None => ScanState::Halted(HaltReason::EndOfReport),
                    Some(row) => {
                        cursor += 1;
                        match self.step(row, &mut first, &mut presence) {
                            Some(reason) => ScanState::Halted(reason),
                            None => ScanState::Scanning,
                        }
                    }
                },
                ScanState::Halted(halt) => {
                    debug!(?halt, ?first, ?presence, "Eye scan finished");
                    return EyeScan {
                        first,
                        presence,
                        halt,
                    };
                }
            };
        }
    }

    /// Consume one row of the block; `Some` halts the scan
    fn step(
        &self,
        row: &[String],
        first: &mut Option<Side>,
        presence: &mut EyePresence,
    ) -> Option<HaltReason> {
        if is_blank(row) {
            return Some(HaltReason::BlankRow);
        }
        let lead = first_cell(row);
        if let Some(side) = Side::from_marker(lead) {
            first.get_or_insert(side);
            presence.mark(side);
            return match self.mode {
                EyeMode::SingleVerdict => Some(HaltReason::SideFound),
                EyeMode::Presence => None,
            };
        }
        if is_section_boundary(row) {
            return Some(HaltReason::Boundary);
        }
        match self.mode {
            EyeMode::SingleVerdict => None,
            EyeMode::Presence => Some(HaltReason::UnrelatedRow),
        }
    }
}

/// First side listed, or `None` when the report names no side
pub fn resolve_side(rows: &[Vec<String>]) -> Option<Side> {
    EyeSideResolver::new(EyeMode::SingleVerdict).scan(rows).first
}

/// Which sides the acquisition block lists
pub fn resolve_presence(rows: &[Vec<String>]) -> EyePresence {
    EyeSideResolver::new(EyeMode::Presence).scan(rows).presence
}
