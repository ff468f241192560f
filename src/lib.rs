#![doc = include_str!("../README.md")]

pub mod cell_type;
pub mod document;
mod error;
pub mod logical_file;
pub mod numeric;
pub mod pool;
pub mod prelude;
pub mod section;
pub mod table;

pub use cell_type::CellType;
pub use document::Document;
pub use error::{FormatError, RangeError, StateError};
pub use logical_file::LogicalFile;
pub use numeric::{Numeric, ValueKind};
pub use pool::{FilePool, OpenMode};
pub use section::{AttributeKind, AttributeSection, AttributeSource};
pub use table::Table;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Range(#[from] error::RangeError),
    #[error("{0}")]
    State(#[from] error::StateError),
    #[error("{0}")]
    Format(#[from] error::FormatError),
    #[error("could not remove temporary section files: `{0}`")]
    Cleanup(std::io::Error),
}
