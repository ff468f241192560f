//! Common traits and types that are useful for working with `vtk_export`
#![allow(unused_imports)]

pub use crate::cell_type::CellType;
pub use crate::document::Document;
pub use crate::logical_file::LogicalFile;
pub use crate::numeric::{Numeric, ValueKind};
pub use crate::pool::{FilePool, OpenMode};
pub use crate::section::{AttributeKind, AttributeSection, AttributeSource};
pub use crate::table::Table;
pub use crate::Error;
