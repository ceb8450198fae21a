//! Report scanning: section location, eye side, sector tables

pub mod extract;
pub mod eye;
pub mod section;

pub use extract::{
    BlankRowPolicy, ColumnSelector, SectorReadings, SectorTableExtractor, SectorTableLayout,
};
pub use eye::{resolve_presence, resolve_side, EyeMode, EyePresence, EyeScan, EyeSideResolver};
pub use section::{locate, SectionTag, EYE_TAG};
