//! static metadata for every cell topology the legacy vtk format understands.
//!
//! The format codes are fixed by the legacy file format specification
//! (`CELL_TYPES` section) and must never be invented; readers such as
//! paraview match on the exact integer.

use crate::error::RangeError;

/// closed set of cell topologies writable to an `UNSTRUCTURED_GRID` dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CellType {
    Vertex,
    PolyVertex,
    Line,
    PolyLine,
    Triangle,
    TriangleStrip,
    Polygon,
    Pixel,
    Quad,
    Tetra,
    Voxel,
    Hexahedron,
    Wedge,
    Pyramid,
    QuadraticEdge,
    QuadraticTriangle,
    QuadraticQuad,
    QuadraticTetra,
    QuadraticHexahedron,
}

impl CellType {
    /// every supported cell type, in format-code order
    pub const ALL: [CellType; 19] = [
        CellType::Vertex,
        CellType::PolyVertex,
        CellType::Line,
        CellType::PolyLine,
        CellType::Triangle,
        CellType::TriangleStrip,
        CellType::Polygon,
        CellType::Pixel,
        CellType::Quad,
        CellType::Tetra,
        CellType::Voxel,
        CellType::Hexahedron,
        CellType::Wedge,
        CellType::Pyramid,
        CellType::QuadraticEdge,
        CellType::QuadraticTriangle,
        CellType::QuadraticQuad,
        CellType::QuadraticTetra,
        CellType::QuadraticHexahedron,
    ];

    /// the fixed integer written to the `CELL_TYPES` section for this topology
    pub fn format_code(self) -> u8 {
        match self {
            CellType::Vertex => 1,
            CellType::PolyVertex => 2,
            CellType::Line => 3,
            CellType::PolyLine => 4,
            CellType::Triangle => 5,
            CellType::TriangleStrip => 6,
            CellType::Polygon => 7,
            CellType::Pixel => 8,
            CellType::Quad => 9,
            CellType::Tetra => 10,
            CellType::Voxel => 11,
            CellType::Hexahedron => 12,
            CellType::Wedge => 13,
            CellType::Pyramid => 14,
            CellType::QuadraticEdge => 21,
            CellType::QuadraticTriangle => 22,
            CellType::QuadraticQuad => 23,
            CellType::QuadraticTetra => 24,
            CellType::QuadraticHexahedron => 25,
        }
    }

    /// inverse of [`format_code`](Self::format_code). Codes the format does
    /// not define fail with a range error.
    pub fn from_code(code: u8) -> Result<Self, RangeError> {
        CellType::ALL
            .into_iter()
            .find(|ty| ty.format_code() == code)
            .ok_or(RangeError::UnknownFormatCode(code))
    }

    /// smallest number of points that can describe this topology
    pub fn min_points(self) -> usize {
        match self {
            CellType::Vertex | CellType::PolyVertex => 1,
            CellType::Line | CellType::PolyLine => 2,
            CellType::Triangle | CellType::TriangleStrip | CellType::Polygon => 3,
            CellType::Pixel | CellType::Quad | CellType::Tetra => 4,
            CellType::Pyramid => 5,
            CellType::Wedge => 6,
            CellType::Voxel | CellType::Hexahedron => 8,
            CellType::QuadraticEdge => 3,
            CellType::QuadraticTriangle => 6,
            CellType::QuadraticQuad => 8,
            CellType::QuadraticTetra => 10,
            CellType::QuadraticHexahedron => 20,
        }
    }

    /// largest number of points that can describe this topology. `None` for
    /// the "poly" variants, which are unbounded.
    pub fn max_points(self) -> Option<usize> {
        match self {
            CellType::PolyVertex
            | CellType::PolyLine
            | CellType::TriangleStrip
            | CellType::Polygon => None,
            fixed => Some(fixed.min_points()),
        }
    }

    pub fn has_fixed_point_count(self) -> bool {
        self.max_points() == Some(self.min_points())
    }

    /// validate a prospective point count against this topology's bounds
    pub(crate) fn check_point_count(self, got: usize) -> Result<(), RangeError> {
        let min = self.min_points();
        if got < min {
            return Err(RangeError::TooFewCellPoints { ty: self, got, min });
        }
        if let Some(max) = self.max_points() {
            if got > max {
                return Err(RangeError::TooManyCellPoints { ty: self, got, max });
            }
        }
        Ok(())
    }
}
