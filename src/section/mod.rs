//! the four structural blocks of a legacy vtk document.
//!
//! Each section wraps one [`Table`](crate::Table) plus the header generation
//! and input validation specific to its role. Sections never write their own
//! headers to disk; the owning document asks for the header text at assembly
//! time, once the final counts are known.

mod attribute;
mod cell;
mod point;

pub use attribute::{AttributeKind, AttributeSection, AttributeSource};
pub use cell::{CellSection, CellTypeSection};
pub use point::PointSection;
