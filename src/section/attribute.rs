use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{RangeError, StateError};
use crate::numeric::{Numeric, ValueKind};
use crate::pool::FilePool;
use crate::table::Table;
use crate::Error;

/// layout of one attribute item, fixing how many body values it spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AttributeKind {
    #[display(fmt = "SCALARS")]
    Scalar,
    #[display(fmt = "VECTORS")]
    Vector,
    #[display(fmt = "TENSORS")]
    Tensor,
}

impl AttributeKind {
    /// body values per item
    pub fn components(self) -> usize {
        match self {
            AttributeKind::Scalar => 1,
            AttributeKind::Vector => 3,
            AttributeKind::Tensor => 9,
        }
    }
}

/// whether the attribute annotates points or cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AttributeSource {
    #[display(fmt = "point")]
    Point,
    #[display(fmt = "cell")]
    Cell,
}

/// one named data array destined for the `POINT_DATA` or `CELL_DATA` block.
///
/// The value kind is frozen by the first append; the attribute kind is
/// frozen as soon as the body is non-empty. At assembly the item count must
/// match the owning document's point or cell count, depending on the source.
#[derive(Debug)]
pub struct AttributeSection {
    name: String,
    attribute_kind: AttributeKind,
    source: AttributeSource,
    value_kind: Option<ValueKind>,
    table: Table,
}

impl AttributeSection {
    pub(crate) fn new(pool: Arc<FilePool>, path: PathBuf, name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_kind: AttributeKind::Scalar,
            source: AttributeSource::Point,
            value_kind: None,
            table: Table::new(pool, path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_kind(&self) -> AttributeKind {
        self.attribute_kind
    }

    pub fn source(&self) -> AttributeSource {
        self.source
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        self.value_kind
    }

    /// completed items in the body
    pub fn item_count(&self) -> usize {
        self.table.cell_count() / self.attribute_kind.components()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// change the item layout. State error once the body has data.
    pub fn set_attribute_kind(&mut self, kind: AttributeKind) -> Result<&mut Self, Error> {
        if kind != self.attribute_kind && !self.table.is_empty() {
            return Err(StateError::AttributeKindFrozen {
                name: self.name.clone(),
            }
            .into());
        }
        self.attribute_kind = kind;
        Ok(self)
    }

    /// pin the value kind ahead of the first append. State error if data of
    /// a different kind already exists.
    pub fn set_value_kind(&mut self, kind: ValueKind) -> Result<&mut Self, Error> {
        match self.value_kind {
            Some(existing) if existing != kind && !self.table.is_empty() => {
                Err(StateError::ValueKindFrozen {
                    name: self.name.clone(),
                    existing,
                    requested: kind,
                }
                .into())
            }
            _ => {
                self.value_kind = Some(kind);
                Ok(self)
            }
        }
    }

    /// the source is only consulted at assembly, so it stays mutable
    pub fn set_source(&mut self, source: AttributeSource) -> &mut Self {
        self.source = source;
        self
    }

    /// append a batch of values. The first call freezes the value kind.
    /// Range error unless the batch length is a multiple of the kind's
    /// component count. Tensors are row-broken every nine values; scalar and
    /// vector batches land on one flat row.
    pub fn append<N: Numeric>(&mut self, values: &[N], flush_now: bool) -> Result<(), Error> {
        let incoming = N::value_kind();
        match self.value_kind {
            Some(existing) if existing != incoming && !self.table.is_empty() => {
                return Err(StateError::ValueKindFrozen {
                    name: self.name.clone(),
                    existing,
                    requested: incoming,
                }
                .into());
            }
            _ => self.value_kind = Some(incoming),
        }

        let group = self.attribute_kind.components();
        if values.len() % group != 0 {
            return Err(RangeError::AttributeChunk {
                name: self.name.clone(),
                group,
                len: values.len(),
            }
            .into());
        }

        match self.attribute_kind {
            AttributeKind::Tensor => {
                for tensor in values.chunks(group) {
                    self.table.append_row(tensor, false, false)?;
                    self.table.next_row(false)?;
                }
                if flush_now {
                    self.table.flush()?;
                }
            }
            AttributeKind::Scalar | AttributeKind::Vector => {
                if !values.is_empty() {
                    self.table.append_row(values, false, false)?;
                    self.table.next_row(flush_now)?;
                }
            }
        }
        Ok(())
    }

    pub fn header(&self) -> String {
        let kind = self.value_kind.unwrap_or(ValueKind::Float);
        match self.attribute_kind {
            AttributeKind::Scalar => format!("SCALARS {} {} 1", self.name, kind),
            AttributeKind::Vector => format!("VECTORS {} {}", self.name, kind),
            AttributeKind::Tensor => format!("TENSORS {} {}", self.name, kind),
        }
    }

    pub fn body_path(&self) -> &Path {
        self.table.path()
    }

    pub(crate) fn delete_backing(&self) -> std::io::Result<()> {
        self.table.delete_backing()
    }
}
