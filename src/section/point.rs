use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RangeError;
use crate::pool::FilePool;
use crate::table::Table;
use crate::Error;

/// the `POINTS` block. The body stores flattened `(x, y, z)` coordinates,
/// one point per row; the table's column cap handles the row breaks.
#[derive(Debug)]
pub struct PointSection {
    table: Table,
}

impl PointSection {
    pub(crate) fn new(pool: Arc<FilePool>, path: PathBuf) -> Self {
        Self {
            table: Table::with_limits(pool, path, 3, 0),
        }
    }

    pub fn point_count(&self) -> usize {
        self.table.cell_count() / 3
    }

    /// total coordinate values appended, flattened
    pub fn value_count(&self) -> usize {
        self.table.cell_count()
    }

    /// append one point, returning the index assigned to it
    pub fn append_point(&mut self, x: f64, y: f64, z: f64) -> Result<usize, Error> {
        let index = self.point_count();
        self.table.append_number(x, false, false, None)?;
        self.table.append_number(y, false, false, None)?;
        self.table.append_number(z, true, false, None)?;
        Ok(index)
    }

    /// append a flattened point list, returning the contiguous index range
    /// assigned to the new points. Range error unless the length is a
    /// multiple of 3.
    pub fn append_points(&mut self, values: &[f64]) -> Result<Range<usize>, Error> {
        if values.len() % 3 != 0 {
            return Err(RangeError::PointListLength { len: values.len() }.into());
        }

        let start = self.point_count();
        self.table.append_row(values, true, false)?;
        Ok(start..start + values.len() / 3)
    }

    pub fn header(&self) -> String {
        format!("POINTS {} double", self.point_count())
    }

    pub fn body_path(&self) -> &Path {
        self.table.path()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub(crate) fn delete_backing(&self) -> std::io::Result<()> {
        self.table.delete_backing()
    }
}
