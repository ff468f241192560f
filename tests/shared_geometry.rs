use pretty_assertions::assert_eq;
use std::sync::Arc;

use vtk_export::{CellType, Document, FilePool, LogicalFile};

fn geometry_owner(dir: &std::path::Path, pool: Arc<FilePool>) -> Document {
    let mut owner = Document::new(LogicalFile::new(dir.join("mesh.vtk")), pool);
    owner.set_title("shared mesh");
    owner
        .append_points(&[0., 0., 0., 1., 0., 0., 0., 1., 0., 1., 1., 0.])
        .unwrap();
    owner.append_cell_indices(CellType::Triangle, &[0, 1, 2]).unwrap();
    owner.append_cell_indices(CellType::Triangle, &[1, 3, 2]).unwrap();
    owner
}

fn geometry_blocks(output: &str) -> &str {
    // everything up to the first data block is geometry plus header
    match output.find("POINT_DATA") {
        Some(index) => &output[..index],
        None => output,
    }
}

#[test]
fn series_members_share_byte_identical_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let pool = FilePool::new(8);
    let owner = geometry_owner(dir.path(), pool.clone());
    owner.lock();

    let mut outputs = Vec::new();
    for step in 0..3 {
        let name = format!("step_{step}.vtk");
        let mut member = Document::new(LogicalFile::new(dir.path().join(&name)), pool.clone());
        member.share_geometry_from(&owner);

        let values: Vec<f64> = (0..4).map(|i| f64::from(i) * f64::from(step)).collect();
        member.attribute("temperature").append(&values, true).unwrap();

        member.assemble(false).unwrap();
        outputs.push(std::fs::read_to_string(member.output_path()).unwrap());
    }

    let reference = geometry_blocks(&outputs[0]).to_string();
    for output in &outputs {
        assert_eq!(geometry_blocks(output), reference);
    }

    // the data blocks differ per member
    assert!(outputs[0].contains("0.000000000000 0.000000000000 0.000000000000 0.000000000000 \n"));
    assert!(outputs[2].contains("0.000000000000 2.000000000000 4.000000000000 6.000000000000 \n"));
}

#[test]
fn shared_documents_forward_geometry_appends() {
    let dir = tempfile::tempdir().unwrap();
    let pool = FilePool::new(8);
    let owner = geometry_owner(dir.path(), pool.clone());

    let mut member = Document::new(LogicalFile::new(dir.path().join("step.vtk")), pool);
    member.share_geometry_from(&owner);

    member.append_point(2., 2., 0.).unwrap();
    assert_eq!(owner.point_count(), 5);
    assert_eq!(member.point_count(), 5);
}

#[test]
fn members_keep_their_own_temporaries() {
    let dir = tempfile::tempdir().unwrap();
    let pool = FilePool::new(8);
    let owner = geometry_owner(dir.path(), pool.clone());
    owner.lock();

    let mut member = Document::new(LogicalFile::new(dir.path().join("step.vtk")), pool);
    member.share_geometry_from(&owner);
    member
        .attribute("temperature")
        .append(&[0.0_f64, 1.0, 2.0, 3.0], true)
        .unwrap();

    member.assemble(true).unwrap();

    // the member's own attribute body is gone, the owner's geometry stays
    assert!(!dir.path().join("step_attr_temperature.tmp").exists());
    assert!(dir.path().join("mesh_points.tmp").exists());
    assert!(dir.path().join("mesh_cells.tmp").exists());
}
