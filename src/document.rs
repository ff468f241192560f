//! one logical output file: three geometry sections, a named attribute map,
//! and the assembly step that merges them.
//!
//! Geometry can be owned or shared. A series of documents covering time
//! steps of one simulation typically lets the first document own the mesh
//! and every later document borrow it ([`Document::share_geometry_from`]);
//! each assembled output then contains byte-identical `POINTS` / `CELLS` /
//! `CELL_TYPES` blocks while the data blocks differ per step.

use std::collections::BTreeMap;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cell_type::CellType;
use crate::error::{FormatError, RangeError, StateError};
use crate::logical_file::LogicalFile;
use crate::pool::{FilePool, OpenMode};
use crate::section::{
    AttributeKind, AttributeSection, AttributeSource, CellSection, CellTypeSection, PointSection,
};
use crate::Error;

const FORMAT_HEADER: &str = "# vtk DataFile Version 2.0";
const ENCODING_MARKER: &str = "ASCII";
const DATASET_MARKER: &str = "DATASET UNSTRUCTURED_GRID";
const LOOKUP_TABLE_MARKER: &str = "LOOKUP_TABLE default";

/// the legacy format caps the title line at 256 characters including the
/// line break
const MAX_TITLE_LEN: usize = 255;
const TITLE_ELLIPSIS: &str = "...";
const DEFAULT_TITLE: &str = "vtk output";

/// the geometry sections plus the header state they share with every
/// document that borrows them
#[derive(Debug)]
pub struct GeometrySections {
    title: String,
    points: PointSection,
    cells: CellSection,
    cell_types: CellTypeSection,
    locked: bool,
}

/// who owns the geometry behind a document
#[derive(Debug)]
enum Geometry {
    Owned(Arc<Mutex<GeometrySections>>),
    Shared(Arc<Mutex<GeometrySections>>),
}

impl Geometry {
    fn handle(&self) -> &Arc<Mutex<GeometrySections>> {
        match self {
            Geometry::Owned(handle) | Geometry::Shared(handle) => handle,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, Geometry::Owned(_))
    }
}

#[derive(Debug)]
pub struct Document {
    file: LogicalFile,
    pool: Arc<FilePool>,
    geometry: Geometry,
    attributes: BTreeMap<String, AttributeSection>,
}

impl Document {
    pub fn new(file: LogicalFile, pool: Arc<FilePool>) -> Self {
        let sections = GeometrySections {
            title: DEFAULT_TITLE.to_string(),
            points: PointSection::new(pool.clone(), file.section_path("points")),
            cells: CellSection::new(pool.clone(), file.section_path("cells")),
            cell_types: CellTypeSection::new(pool.clone(), file.section_path("cell_types")),
            locked: false,
        };

        Self {
            file,
            pool,
            geometry: Geometry::Owned(Arc::new(Mutex::new(sections))),
            attributes: BTreeMap::new(),
        }
    }

    /// borrow `owner`'s geometry instead of this document's own sections.
    /// Every geometry append and the assembled `POINTS` / `CELLS` /
    /// `CELL_TYPES` content then go through the shared sections; this
    /// document's attributes stay its own.
    pub fn share_geometry_from(&mut self, owner: &Document) {
        self.geometry = Geometry::Shared(owner.geometry.handle().clone());
    }

    pub fn shares_geometry(&self) -> bool {
        !self.geometry.is_owned()
    }

    pub fn output_path(&self) -> PathBuf {
        self.file.output_path()
    }

    /// set the title line, silently truncating to the format's budget
    pub fn set_title(&mut self, title: &str) {
        let title = if title.chars().count() > MAX_TITLE_LEN {
            let cut: String = title
                .chars()
                .take(MAX_TITLE_LEN - TITLE_ELLIPSIS.len())
                .collect();
            format!("{cut}{TITLE_ELLIPSIS}")
        } else {
            title.to_string()
        };
        self.geometry.handle().lock().title = title;
    }

    pub fn title(&self) -> String {
        self.geometry.handle().lock().title.clone()
    }

    pub fn point_count(&self) -> usize {
        self.geometry.handle().lock().points.point_count()
    }

    pub fn cell_count(&self) -> usize {
        self.geometry.handle().lock().cells.cell_count()
    }

    /// permanently forbid geometry appends. One-way; reaches sharers too
    /// since the flag lives with the shared sections.
    pub fn lock(&self) {
        self.geometry.handle().lock().locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.geometry.handle().lock().locked
    }

    pub fn append_point(&mut self, x: f64, y: f64, z: f64) -> Result<usize, Error> {
        let mut geometry = self.geometry.handle().lock();
        check_unlocked(&geometry)?;
        geometry.points.append_point(x, y, z)
    }

    pub fn append_points(&mut self, values: &[f64]) -> Result<Range<usize>, Error> {
        let mut geometry = self.geometry.handle().lock();
        check_unlocked(&geometry)?;
        geometry.points.append_points(values)
    }

    /// append one cell referencing points that already exist
    pub fn append_cell_indices(
        &mut self,
        ty: CellType,
        point_indices: &[usize],
    ) -> Result<usize, Error> {
        let mut geometry = self.geometry.handle().lock();
        check_unlocked(&geometry)?;
        push_cell(&mut geometry, ty, point_indices)
    }

    /// append one cell from raw coordinates, deriving the index map from the
    /// points' assigned indices
    pub fn append_cell_points(&mut self, ty: CellType, flat_points: &[f64]) -> Result<usize, Error> {
        let mut geometry = self.geometry.handle().lock();
        check_unlocked(&geometry)?;

        if flat_points.len() % 3 != 0 {
            return Err(RangeError::PointListLength {
                len: flat_points.len(),
            }
            .into());
        }
        ty.check_point_count(flat_points.len() / 3)?;

        let map: Vec<usize> = geometry.points.append_points(flat_points)?.collect();
        push_cell(&mut geometry, ty, &map)
    }

    /// append new points but describe the cell with a caller-supplied index
    /// map, permitting points shared across cells without re-specifying
    /// their coordinates
    pub fn append_cell_mapped(
        &mut self,
        ty: CellType,
        flat_points: &[f64],
        point_indices: &[usize],
    ) -> Result<usize, Error> {
        let mut geometry = self.geometry.handle().lock();
        check_unlocked(&geometry)?;

        ty.check_point_count(point_indices.len())?;
        geometry.points.append_points(flat_points)?;
        push_cell(&mut geometry, ty, point_indices)
    }

    /// fetch an attribute by name, creating a default scalar point attribute
    /// if the name is new
    pub fn attribute(&mut self, name: &str) -> &mut AttributeSection {
        let pool = self.pool.clone();
        let path = self.file.section_path(&format!("attr_{name}"));
        self.attributes
            .entry(name.to_string())
            .or_insert_with(|| AttributeSection::new(pool, path, name))
    }

    /// validate cross-section consistency, then stream header and every
    /// section body into the output file.
    ///
    /// Nothing is written before validation passes, so a mismatch never
    /// clobbers an existing output. With `remove_temporaries` the section
    /// backing files are deleted afterwards, whether assembly succeeded or
    /// aborted; a cleanup failure there is reported instead as its own
    /// fatal error.
    pub fn assemble(&mut self, remove_temporaries: bool) -> Result<(), Error> {
        let result = self.write_output();
        match result {
            Ok(()) => {
                if remove_temporaries {
                    self.remove_temporaries()?;
                }
                Ok(())
            }
            Err(error) => {
                if remove_temporaries {
                    self.remove_temporaries()?;
                }
                Err(error)
            }
        }
    }

    /// delete the temporary section bodies. Borrowed geometry is left alone;
    /// its owner is responsible for it.
    pub fn remove_temporaries(&mut self) -> Result<(), Error> {
        for attribute in self.attributes.values() {
            attribute.delete_backing().map_err(Error::Cleanup)?;
        }

        if self.geometry.is_owned() {
            let geometry = self.geometry.handle().lock();
            geometry.points.delete_backing().map_err(Error::Cleanup)?;
            geometry.cells.delete_backing().map_err(Error::Cleanup)?;
            geometry
                .cell_types
                .delete_backing()
                .map_err(Error::Cleanup)?;
        }
        Ok(())
    }

    fn write_output(&mut self) -> Result<(), Error> {
        self.validate()?;

        let out = self.file.output_path();
        debug!(path = %out.display(), "assembling document");

        // start from an empty file even when re-assembling
        self.pool
            .apply_write(&out, OpenMode::Write, false, |writer| {
                writer.get_ref().set_len(0)
            })?;

        let geometry = self.geometry.handle().lock();

        self.write_line(&out, FORMAT_HEADER)?;
        self.write_line(&out, &geometry.title)?;
        self.write_line(&out, ENCODING_MARKER)?;
        self.write_line(&out, DATASET_MARKER)?;

        self.write_line(&out, &geometry.points.header())?;
        self.pool
            .append_file_content(geometry.points.body_path(), &out)?;
        if geometry.points.value_count() % 3 != 0 {
            // a partial final row never received its line break
            self.write_line(&out, "")?;
        }
        self.write_line(&out, "")?;

        self.write_line(&out, &geometry.cells.header())?;
        self.pool
            .append_file_content(geometry.cells.body_path(), &out)?;
        self.write_line(&out, "")?;

        self.write_line(&out, &geometry.cell_types.header())?;
        self.pool
            .append_file_content(geometry.cell_types.body_path(), &out)?;
        self.write_line(&out, "")?;

        let point_count = geometry.points.point_count();
        let cell_count = geometry.cells.cell_count();
        drop(geometry);

        self.write_attribute_block(&out, AttributeSource::Point, "POINT_DATA", point_count)?;
        self.write_attribute_block(&out, AttributeSource::Cell, "CELL_DATA", cell_count)?;

        // everything must be on disk before the caller hands the file to a
        // reader
        self.pool
            .apply_write(&out, OpenMode::Append, true, |_| Ok(()))?;

        debug!(path = %out.display(), point_count, cell_count, "document assembled");
        Ok(())
    }

    fn write_attribute_block(
        &self,
        out: &Path,
        source: AttributeSource,
        marker: &str,
        count: usize,
    ) -> Result<(), Error> {
        let mut wrote_any = false;
        for attribute in self
            .attributes
            .values()
            .filter(|attribute| attribute.source() == source)
        {
            if !wrote_any {
                self.write_line(out, &format!("{marker} {count}"))?;
                wrote_any = true;
            }

            self.write_line(out, &attribute.header())?;
            if attribute.attribute_kind() == AttributeKind::Scalar {
                self.write_line(out, LOOKUP_TABLE_MARKER)?;
            }
            self.pool.append_file_content(attribute.body_path(), out)?;
            if !attribute.is_empty() {
                self.write_line(out, "")?;
            }
        }

        if wrote_any {
            self.write_line(out, "")?;
        }
        Ok(())
    }

    fn write_line(&self, path: &Path, line: &str) -> Result<(), Error> {
        // titles and attribute names reach this point unfiltered; a control
        // character in either would split a header across lines
        let line: String = line.chars().filter(|c| !c.is_control()).collect();
        self.pool
            .apply_write(path, OpenMode::Append, false, |writer| {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")
            })
    }

    fn validate(&self) -> Result<(), Error> {
        let geometry = self.geometry.handle().lock();
        let points = geometry.points.point_count();
        let cells = geometry.cells.cell_count();
        let index_entries = geometry.cells.index_entries();
        let types = geometry.cell_types.cell_count();
        drop(geometry);

        if index_entries < points {
            return Err(FormatError::PointCountMismatch {
                index_entries,
                points,
            }
            .into());
        }

        if types != cells {
            return Err(FormatError::CellTypeCountMismatch { cells, types }.into());
        }

        for (name, attribute) in &self.attributes {
            let expected = match attribute.source() {
                AttributeSource::Point => points,
                AttributeSource::Cell => cells,
            };
            if attribute.item_count() != expected {
                return Err(FormatError::AttributeSizeMismatch {
                    name: name.clone(),
                    items: attribute.item_count(),
                    expected,
                    source_kind: attribute.source(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn check_unlocked(geometry: &GeometrySections) -> Result<(), Error> {
    if geometry.locked {
        return Err(StateError::GeometryLocked.into());
    }
    Ok(())
}

/// the one place that touches both cell sections, keeping their pairing
/// exact: one type code per cell row, in matching order
fn push_cell(
    geometry: &mut GeometrySections,
    ty: CellType,
    point_indices: &[usize],
) -> Result<usize, Error> {
    // validate before either section is touched so a range error cannot
    // leave the two bodies out of step
    ty.check_point_count(point_indices.len())?;
    geometry.cells.append_cell(ty, point_indices)?;
    geometry.cell_types.append(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(dir: &Path, name: &str) -> Document {
        Document::new(LogicalFile::new(dir.join(name)), FilePool::new(8))
    }

    #[test]
    fn locked_geometry_rejects_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        doc.append_point(0., 0., 0.).unwrap();
        doc.lock();

        assert!(matches!(
            doc.append_point(1., 0., 0.),
            Err(Error::State(StateError::GeometryLocked))
        ));
        assert_eq!(doc.point_count(), 1);
    }

    #[test]
    fn lock_reaches_sharers() {
        let dir = tempfile::tempdir().unwrap();
        let owner = document(dir.path(), "owner.vtk");
        let mut sharer = document(dir.path(), "sharer.vtk");
        sharer.share_geometry_from(&owner);

        owner.lock();
        assert!(sharer.is_locked());
        assert!(sharer.append_point(0., 0., 0.).is_err());
    }

    #[test]
    fn cell_from_points_advances_both_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        let cells = doc
            .append_cell_points(CellType::Triangle, &[0., 0., 0., 1., 0., 0., 0., 1., 0.])
            .unwrap();

        assert_eq!(cells, 1);
        assert_eq!(doc.point_count(), 3);
        assert_eq!(doc.cell_count(), 1);
    }

    #[test]
    fn out_of_range_cell_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        let result = doc.append_cell_points(CellType::Triangle, &[0., 0., 0.]);
        assert!(matches!(result, Err(Error::Range(_))));
        assert_eq!(doc.point_count(), 0);
        assert_eq!(doc.cell_count(), 0);
    }

    #[test]
    fn explicit_map_reuses_existing_points() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        doc.append_points(&[0., 0., 0., 1., 0., 0., 0., 1., 0.])
            .unwrap();
        // one new point, cell built from two old ones plus the new one
        doc.append_cell_mapped(CellType::Triangle, &[1., 1., 0.], &[1, 2, 3])
            .unwrap();

        assert_eq!(doc.point_count(), 4);
        assert_eq!(doc.cell_count(), 1);
    }

    #[test]
    fn titles_are_truncated_with_an_ellipsis() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        doc.set_title(&"x".repeat(300));
        let title = doc.title();
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn size_mismatch_reports_the_attribute_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        doc.append_point(0., 0., 0.).unwrap();
        doc.append_cell_indices(CellType::Vertex, &[0]).unwrap();
        doc.attribute("pressure")
            .append(&[1.0_f64, 2.0], true)
            .unwrap();

        let error = doc.assemble(false).unwrap_err();
        assert_eq!(
            error.to_string(),
            "attribute `pressure` holds 2 items but the document has 1 point entries"
        );
    }

    #[test]
    fn attribute_lookup_is_get_or_create() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(dir.path(), "a.vtk");

        let created = doc.attribute("pressure");
        assert_eq!(created.attribute_kind(), AttributeKind::Scalar);
        assert_eq!(created.source(), AttributeSource::Point);

        doc.attribute("pressure").append(&[1.0_f64], true).unwrap();
        assert_eq!(doc.attribute("pressure").item_count(), 1);
    }
}
