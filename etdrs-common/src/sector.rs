//! ETDRS grid vocabulary
//!
//! Nine fine sectors per eye: the center disc plus inner and outer rings,
//! each split into four quadrants. Noise annotations use the coarser
//! five-quadrant partition, where each ring quadrant covers an inner/outer
//! sector pair.

use serde::{Deserialize, Serialize};

/// Eye side, which determines the column prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Right,
    Left,
}

impl Side {
    /// Output order: right eye columns come first
    pub const ALL: [Side; 2] = [Side::Right, Side::Left];

    pub fn prefix(self) -> &'static str {
        match self {
            Side::Right => "R",
            Side::Left => "L",
        }
    }

    /// Interpret a row's leading cell (`R`, `L`, `Right`, `l`, ...)
    pub fn from_marker(cell: &str) -> Option<Side> {
        let upper = cell.trim().to_uppercase();
        if upper.starts_with('R') {
            Some(Side::Right)
        } else if upper.starts_with('L') {
            Some(Side::Left)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One of the nine fine ETDRS sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    Center,
    InnerTemporal,
    InnerSuperior,
    InnerNasal,
    InnerInferior,
    OuterTemporal,
    OuterSuperior,
    OuterNasal,
    OuterInferior,
}

impl Sector {
    /// Report order, which is also output column order within a side
    pub const ALL: [Sector; 9] = [
        Sector::Center,
        Sector::InnerTemporal,
        Sector::InnerSuperior,
        Sector::InnerNasal,
        Sector::InnerInferior,
        Sector::OuterTemporal,
        Sector::OuterSuperior,
        Sector::OuterNasal,
        Sector::OuterInferior,
    ];

    /// Row label as printed by the instrument
    pub fn label(self) -> &'static str {
        match self {
            Sector::Center => "Center",
            Sector::InnerTemporal => "Inner Temporal",
            Sector::InnerSuperior => "Inner Superior",
            Sector::InnerNasal => "Inner Nasal",
            Sector::InnerInferior => "Inner Inferior",
            Sector::OuterTemporal => "Outer Temporal",
            Sector::OuterSuperior => "Outer Superior",
            Sector::OuterNasal => "Outer Nasal",
            Sector::OuterInferior => "Outer Inferior",
        }
    }

    /// Exact (already trimmed) label match
    pub fn from_label(label: &str) -> Option<Sector> {
        Sector::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Column-name form of the label (`Inner_Temporal`)
    pub fn column_suffix(self) -> String {
        self.label().replace(' ', "_")
    }

    /// Coarse quadrant containing this sector
    pub fn quadrant(self) -> Quadrant {
        match self {
            Sector::Center => Quadrant::Center,
            Sector::InnerTemporal | Sector::OuterTemporal => Quadrant::Temporal,
            Sector::InnerSuperior | Sector::OuterSuperior => Quadrant::Superior,
            Sector::InnerNasal | Sector::OuterNasal => Quadrant::Nasal,
            Sector::InnerInferior | Sector::OuterInferior => Quadrant::Inferior,
        }
    }
}

/// Coarse noise-annotation region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quadrant {
    Superior,
    Inferior,
    Nasal,
    Temporal,
    Center,
}

impl Quadrant {
    pub const ALL: [Quadrant; 5] = [
        Quadrant::Superior,
        Quadrant::Inferior,
        Quadrant::Nasal,
        Quadrant::Temporal,
        Quadrant::Center,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::Superior => "Superior",
            Quadrant::Inferior => "Inferior",
            Quadrant::Nasal => "Nasal",
            Quadrant::Temporal => "Temporal",
            Quadrant::Center => "Center",
        }
    }

    /// Fine sectors covered by this quadrant
    pub fn fine_sectors(self) -> &'static [Sector] {
        match self {
            Quadrant::Center => &[Sector::Center],
            Quadrant::Superior => &[Sector::InnerSuperior, Sector::OuterSuperior],
            Quadrant::Inferior => &[Sector::InnerInferior, Sector::OuterInferior],
            Quadrant::Nasal => &[Sector::InnerNasal, Sector::OuterNasal],
            Quadrant::Temporal => &[Sector::InnerTemporal, Sector::OuterTemporal],
        }
    }
}

/// Separator between side prefix and region name in column headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnStyle {
    /// `R_Inner_Temporal`
    #[default]
    Underscore,
    /// `R-Inner_Temporal`
    Hyphen,
}

impl ColumnStyle {
    pub const ALL: [ColumnStyle; 2] = [ColumnStyle::Underscore, ColumnStyle::Hyphen];

    pub fn separator(self) -> char {
        match self {
            ColumnStyle::Underscore => '_',
            ColumnStyle::Hyphen => '-',
        }
    }

    pub fn sector_column(self, side: Side, sector: Sector) -> String {
        format!("{}{}{}", side.prefix(), self.separator(), sector.column_suffix())
    }

    pub fn quadrant_column(self, side: Side, quadrant: Quadrant) -> String {
        format!("{}{}{}", side.prefix(), self.separator(), quadrant.label())
    }

    /// All 18 side-prefixed sector columns: right eye first, report order
    pub fn sector_columns(self) -> Vec<String> {
        Side::ALL
            .into_iter()
            .flat_map(|side| Sector::ALL.into_iter().map(move |s| self.sector_column(side, s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_markers() {
        assert_eq!(Side::from_marker(" r "), Some(Side::Right));
        assert_eq!(Side::from_marker("Left"), Some(Side::Left));
        assert_eq!(Side::from_marker("<ETDRS>"), None);
        assert_eq!(Side::from_marker(""), None);
    }

    #[test]
    fn test_sector_labels_round_trip_through_vocabulary() {
        for sector in Sector::ALL {
            assert_eq!(Sector::from_label(sector.label()), Some(sector));
        }
        assert_eq!(Sector::from_label("Whole"), None);
        assert_eq!(Sector::from_label("center"), None);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(
            ColumnStyle::Underscore.sector_column(Side::Left, Sector::InnerSuperior),
            "L_Inner_Superior"
        );
        assert_eq!(
            ColumnStyle::Hyphen.sector_column(Side::Right, Sector::Center),
            "R-Center"
        );
        assert_eq!(
            ColumnStyle::Hyphen.quadrant_column(Side::Left, Quadrant::Superior),
            "L-Superior"
        );
    }

    #[test]
    fn test_sector_columns_order() {
        let cols = ColumnStyle::Underscore.sector_columns();
        assert_eq!(cols.len(), 18);
        assert_eq!(cols[0], "R_Center");
        assert_eq!(cols[8], "R_Outer_Inferior");
        assert_eq!(cols[9], "L_Center");
    }

    #[test]
    fn test_quadrants_partition_the_grid() {
        let mut covered: Vec<Sector> = Quadrant::ALL
            .iter()
            .flat_map(|q| q.fine_sectors().iter().copied())
            .collect();
        covered.sort();
        assert_eq!(covered, Sector::ALL.to_vec());
        for sector in Sector::ALL {
            assert!(sector.quadrant().fine_sectors().contains(&sector));
        }
    }
}
