//! errors for the append / assembly pipeline, grouped by the way a caller
//! should react to them.
//!
//! Range and state errors are always caller bugs and are never retried.
//! Format errors are discovered when a document is assembled and indicate
//! that the sections no longer agree on their sizes.

use crate::cell_type::CellType;
use crate::numeric::ValueKind;
use crate::section::AttributeSource;

/// a value count fell outside the legal bounds for a cell or attribute
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error("`{0}` is not a cell format code known to the legacy vtk format")]
    UnknownFormatCode(u8),
    #[error("flattened point list has length {len} which is not a multiple of 3")]
    PointListLength { len: usize },
    #[error("cell type `{ty}` takes at least {min} points, {got} were supplied")]
    TooFewCellPoints { ty: CellType, got: usize, min: usize },
    #[error("cell type `{ty}` takes at most {max} points, {got} were supplied")]
    TooManyCellPoints { ty: CellType, got: usize, max: usize },
    #[error("attribute `{name}` expects value counts in multiples of {group}, {len} were supplied")]
    AttributeChunk {
        name: String,
        group: usize,
        len: usize,
    },
}

/// an immutable-once-set property was mutated after data already exists
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("the cell separator cannot change once the table has content")]
    SeparatorFrozen,
    #[error("attribute `{name}` already stores `{existing}` values, `{requested}` values cannot be appended")]
    ValueKindFrozen {
        name: String,
        existing: ValueKind,
        requested: ValueKind,
    },
    #[error("attribute `{name}` cannot change kind once it has data")]
    AttributeKindFrozen { name: String },
    #[error("the document geometry is locked, no further appends are allowed")]
    GeometryLocked,
}

/// a cross-section size mismatch discovered while assembling a document.
/// assembly aborts before any output is written.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("cells reference {index_entries} point indices but the document records {points} points")]
    PointCountMismatch { index_entries: usize, points: usize },
    #[error("the document has {cells} cells but {types} cell type codes")]
    CellTypeCountMismatch { cells: usize, types: usize },
    // the field cannot be called `source`; thiserror reserves that name for
    // error chaining
    #[error("attribute `{name}` holds {items} items but the document has {expected} {source_kind} entries")]
    AttributeSizeMismatch {
        name: String,
        items: usize,
        expected: usize,
        source_kind: AttributeSource,
    },
}
