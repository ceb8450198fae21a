//! # ETDRS Common Library
//!
//! Shared code for the ETDRS report tools including:
//! - Error types and configuration loading
//! - Encoding-tolerant text loading
//! - Side / sector vocabularies and column naming
//! - Subject identifier canonicalisation
//! - Aggregate tables and delimited table I/O

pub mod config;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod sector;
pub mod table;
pub mod text;

pub use error::{Error, Result};
pub use identifier::{IdAudit, IdClass, IdentifierPolicy, SubjectId};
pub use sector::{ColumnStyle, Quadrant, Sector, Side};
pub use table::{AggregateTable, Cell, ColumnSet};
