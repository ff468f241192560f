use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cell_type::CellType;
use crate::pool::FilePool;
use crate::table::Table;
use crate::Error;

/// the `CELLS` block. Each row is `[point_count, index...]` for one cell.
#[derive(Debug)]
pub struct CellSection {
    table: Table,
}

impl CellSection {
    pub(crate) fn new(pool: Arc<FilePool>, path: PathBuf) -> Self {
        Self {
            table: Table::new(pool, path),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.table.row_count()
    }

    /// total values in the body including each row's leading count field
    pub fn value_count(&self) -> usize {
        self.table.cell_count()
    }

    /// total point indices stored across every cell row. Each row carries
    /// exactly one leading count field, which is excluded here.
    pub fn index_entries(&self) -> usize {
        self.value_count() - self.cell_count()
    }

    /// append one cell row, returning the new cell count. Range error if the
    /// index count is outside the type's bounds; nothing is written in that
    /// case.
    pub fn append_cell(&mut self, ty: CellType, point_indices: &[usize]) -> Result<usize, Error> {
        ty.check_point_count(point_indices.len())?;

        self.table
            .append_number(point_indices.len() as i64, false, false, None)?;
        for index in point_indices {
            self.table.append_number(*index as i64, false, false, None)?;
        }
        self.table.next_row(true)?;

        Ok(self.cell_count())
    }

    pub fn header(&self) -> String {
        format!("CELLS {} {}", self.cell_count(), self.value_count())
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

/// the `CELL_TYPES` block, one format code per row. The caller must append
/// here exactly once per [`CellSection::append_cell`], in matching order;
/// the document's cell operations guarantee that pairing.
#[derive(Debug)]
pub struct CellTypeSection {
    table: Table,
}

impl CellTypeSection {
    pub(crate) fn new(pool: Arc<FilePool>, path: PathBuf) -> Self {
        Self {
            table: Table::with_limits(pool, path, 1, 0),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.table.row_count()
    }

    /// record the format code for one cell, returning the new cell count
    pub fn append(&mut self, ty: CellType) -> Result<usize, Error> {
        self.table
            .append_number(ty.format_code() as i64, true, false, None)?;
        Ok(self.cell_count())
    }

    pub fn header(&self) -> String {
        format!("CELL_TYPES {}", self.cell_count())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use pretty_assertions::assert_eq;

    fn read(pool: &FilePool, path: &Path) -> String {
        pool.apply_read(path, |file| {
            use std::io::Read;
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            Ok(text)
        })
        .unwrap()
    }

    #[test]
    fn rows_carry_a_leading_count() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let mut cells = CellSection::new(pool.clone(), dir.path().join("cells.tmp"));

        let count = cells.append_cell(CellType::Triangle, &[0, 1, 2]).unwrap();

        assert_eq!(count, 1);
        assert_eq!(read(&pool, cells.body_path()), "3 0 1 2 \n");
        assert_eq!(cells.value_count(), 4);
        assert_eq!(cells.index_entries(), 3);
        assert_eq!(cells.header(), "CELLS 1 4");
    }

    #[test]
    fn out_of_range_point_count_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let mut cells = CellSection::new(pool, dir.path().join("cells.tmp"));

        let result = cells.append_cell(CellType::Triangle, &[0, 1]);
        assert!(matches!(
            result,
            Err(Error::Range(RangeError::TooFewCellPoints { got: 2, .. }))
        ));
        assert_eq!(cells.cell_count(), 0);
        assert_eq!(cells.value_count(), 0);
    }

    #[test]
    fn type_codes_are_one_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let mut types = CellTypeSection::new(pool.clone(), dir.path().join("types.tmp"));

        types.append(CellType::Triangle).unwrap();
        let count = types.append(CellType::Quad).unwrap();

        assert_eq!(count, 2);
        assert_eq!(read(&pool, types.body_path()), "5\n9\n");
        assert_eq!(types.header(), "CELL_TYPES 2");
    }
}
