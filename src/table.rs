//! append-only delimited grid storage backing every section body.
//!
//! A table owns one backing file reached through the shared [`FilePool`] and
//! keeps the row / column bookkeeping needed to rebuild section headers at
//! assembly time. Reaching `max_rows` is a saturation signal (`false` / a
//! partial count), never an error.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StateError;
use crate::numeric::Numeric;
use crate::pool::{FilePool, OpenMode};
use crate::Error;

/// separator used by vtk section bodies
pub const DEFAULT_SEPARATOR: char = ' ';

#[derive(Debug)]
pub struct Table {
    pool: Arc<FilePool>,
    path: PathBuf,
    separator: char,
    /// total cells appended over the table's lifetime
    cell_count: usize,
    /// cells in the row currently being filled
    columns_in_row: usize,
    /// widest row seen so far
    column_count: usize,
    /// completed rows
    row_index: usize,
    /// 0 = unlimited. reaching it wraps to a new row automatically
    max_columns: usize,
    /// 0 = unlimited. reaching it rejects further appends
    max_rows: usize,
}

impl Table {
    pub fn new(pool: Arc<FilePool>, path: PathBuf) -> Self {
        Self::with_limits(pool, path, 0, 0)
    }

    pub fn with_limits(
        pool: Arc<FilePool>,
        path: PathBuf,
        max_columns: usize,
        max_rows: usize,
    ) -> Self {
        Self {
            pool,
            path,
            separator: DEFAULT_SEPARATOR,
            cell_count: 0,
            columns_in_row: 0,
            column_count: 0,
            row_index: 0,
            max_columns,
            max_rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn row_count(&self) -> usize {
        self.row_index
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count == 0
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// change the cell separator. State error once the table has content,
    /// since already-written cells cannot be re-delimited.
    pub fn set_separator(&mut self, separator: char) -> Result<(), Error> {
        if self.cell_count > 0 {
            return Err(StateError::SeparatorFrozen.into());
        }
        self.separator = separator;
        Ok(())
    }

    /// append one cell. Returns `false` once `max_rows` is reached. The
    /// content is sanitized so it can never break column integrity: control
    /// characters and literal separators are stripped.
    pub fn append_cell(&mut self, content: &str, flush_now: bool) -> Result<bool, Error> {
        if self.saturated() {
            return Ok(false);
        }

        let mut chunk = self.sanitize(content);
        let completes_row = self.max_columns > 0 && self.columns_in_row + 1 == self.max_columns;
        chunk.push(if completes_row { '\n' } else { self.separator });

        self.write(&chunk, flush_now)?;

        self.cell_count += 1;
        if completes_row {
            self.row_index += 1;
            self.column_count = self.column_count.max(self.max_columns);
            self.columns_in_row = 0;
        } else {
            self.columns_in_row += 1;
            self.column_count = self.column_count.max(self.columns_in_row);
        }
        Ok(true)
    }

    /// append one number formatted per its kind's defaults, or at an
    /// explicit precision
    pub fn append_number<N: Numeric>(
        &mut self,
        value: N,
        flush_now: bool,
        scientific: bool,
        precision: Option<usize>,
    ) -> Result<bool, Error> {
        self.append_cell(&value.format(scientific, precision), flush_now)
    }

    /// append every element of `values` as a cell, stopping early if
    /// `max_rows` is hit. Returns how many were appended.
    pub fn append_row<N: Numeric>(
        &mut self,
        values: &[N],
        flush_now: bool,
        scientific: bool,
    ) -> Result<usize, Error> {
        let mut appended = 0;
        for value in values {
            if !self.append_number(*value, false, scientific, None)? {
                break;
            }
            appended += 1;
        }
        if flush_now && appended > 0 {
            self.flush()?;
        }
        Ok(appended)
    }

    /// force a row break. Counted against `max_rows`, so it also returns a
    /// saturation flag.
    pub fn next_row(&mut self, flush_now: bool) -> Result<bool, Error> {
        if self.saturated() {
            return Ok(false);
        }
        self.write("\n", flush_now)?;
        self.row_index += 1;
        self.column_count = self.column_count.max(self.columns_in_row);
        self.columns_in_row = 0;
        Ok(true)
    }

    /// push any buffered content to disk
    pub fn flush(&self) -> Result<(), Error> {
        self.pool
            .apply_write(&self.path, OpenMode::Append, true, |_| Ok(()))
    }

    /// truncate the backing file and reset every counter
    pub fn clear(&mut self) -> Result<(), Error> {
        self.pool
            .apply_write(&self.path, OpenMode::Write, true, |writer| {
                writer.get_ref().set_len(0)
            })?;
        self.cell_count = 0;
        self.columns_in_row = 0;
        self.column_count = 0;
        self.row_index = 0;
        Ok(())
    }

    /// close the pooled handle and delete the backing file
    pub fn delete_backing(&self) -> std::io::Result<()> {
        self.pool.remove_file(&self.path)
    }

    fn saturated(&self) -> bool {
        self.max_rows > 0 && self.row_index >= self.max_rows
    }

    fn sanitize(&self, content: &str) -> String {
        content
            .chars()
            .filter(|c| !c.is_control() && *c != self.separator)
            .collect()
    }

    fn write(&self, content: &str, flush_now: bool) -> Result<(), Error> {
        self.pool
            .apply_write(&self.path, OpenMode::Append, flush_now, |writer| {
                writer.write_all(content.as_bytes())
            })
    }
}
