//! Extraction profiles
//!
//! A profile ties one sector-table layout to an eye-side strategy and a
//! placement rule for the extracted values.
//!
//! - `thickness`: `<ETDRS>` table with one value column per eye, found by
//!   header suffix; a side is emitted only if the acquisition block lists it.
//! - `density`: `<ETDRS 9 Sector Density>` table with a single value column;
//!   all values go to the side the acquisition block names first.

use crate::report::{
    BlankRowPolicy, ColumnSelector, EyeMode, SectionTag, SectorTableLayout,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which report table to ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Retinal thickness, per-eye columns
    #[default]
    Thickness,
    /// Nine-sector vessel density, single column
    Density,
}

/// Value column of the density table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Vessel density
    #[default]
    Vd,
    /// Perfusion density
    Pd,
}

impl Quantity {
    fn column(self) -> usize {
        match self {
            Quantity::Vd => 1,
            Quantity::Pd => 2,
        }
    }
}

/// Where extracted values land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Selector slots hold right and left values; each side is kept only
    /// when the acquisition block lists it
    PerSide { right: usize, left: usize },
    /// One selector slot, assigned to the resolved eye side
    ResolvedSide { slot: usize },
}

/// Complete extraction recipe
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    pub kind: ProfileKind,
    pub layout: SectorTableLayout,
    pub placement: Placement,
}

impl ExtractionProfile {
    pub fn thickness() -> Self {
        Self {
            kind: ProfileKind::Thickness,
            layout: SectorTableLayout {
                tag: SectionTag::exact("<ETDRS>"),
                selectors: vec![
                    ColumnSelector::HeaderSuffix('R'),
                    ColumnSelector::HeaderSuffix('L'),
                ],
                blank_rows: BlankRowPolicy::Terminate,
                skip_labels: &["Size"],
            },
            placement: Placement::PerSide { right: 0, left: 1 },
        }
    }

    pub fn density(quantity: Quantity) -> Self {
        Self {
            kind: ProfileKind::Density,
            layout: SectorTableLayout {
                tag: SectionTag::exact("<ETDRS 9 Sector Density>"),
                selectors: vec![ColumnSelector::Fixed(quantity.column())],
                blank_rows: BlankRowPolicy::Skip,
                skip_labels: &[],
            },
            placement: Placement::ResolvedSide { slot: 0 },
        }
    }

    /// Build from CLI selection; `quantity` only matters for density
    pub fn select(kind: ProfileKind, quantity: Quantity) -> Self {
        match kind {
            ProfileKind::Thickness => Self::thickness(),
            ProfileKind::Density => Self::density(quantity),
        }
    }

    /// Eye-side strategy implied by the placement
    pub fn eye_mode(&self) -> EyeMode {
        match self.placement {
            Placement::PerSide { .. } => EyeMode::Presence,
            Placement::ResolvedSide { .. } => EyeMode::SingleVerdict,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Thickness => f.write_str("thickness"),
            ProfileKind::Density => f.write_str("density"),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Vd => f.write_str("vd"),
            Quantity::Pd => f.write_str("pd"),
        }
    }
}
