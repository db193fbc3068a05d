use super::{coercion_error, header_error, xml_of};
use crate::cifti2::{
    Surface, TransformationMatrix, Vertices, VertexIndices, Volume, VoxelIndicesIJK,
    XmlSerializable,
};
use crate::error::CiftiError;

const IDENTITY: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

#[test]
fn voxel_rows_are_newline_separated() {
    let ijk = VoxelIndicesIJK::from_rows([[0, 0, 0], [1, 1, 1]]).unwrap();
    assert_eq!(
        xml_of(&ijk),
        "<VoxelIndicesIJK>0 0 0\n1 1 1</VoxelIndicesIJK>"
    );
}

#[test]
fn voxel_rows_must_be_triples() {
    let mut ijk = VoxelIndicesIJK::new();
    let msg = coercion_error(ijk.push([1, 2]));
    assert!(msg.starts_with("value must be a triple of ints"));
    assert!(ijk.push(vec![1, 2, 3, 4]).is_err());
    assert!(ijk.push([u64::MAX, 0, 0]).is_err());
    assert!(ijk.is_empty());
}

#[test]
fn voxel_cells_are_addressable() {
    let mut ijk = VoxelIndicesIJK::from_rows([[0, 0, 0], [1, 1, 1]]).unwrap();
    ijk.set_cell(1, 2, 7).unwrap();
    assert_eq!(ijk.get_cell(1, 2), Some(7));
    assert_eq!(ijk.get_cell(1, 3), None);
    assert!(matches!(
        ijk.set_cell(1, 3, 0),
        Err(CiftiError::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        ijk.set(2, [0, 0, 0]),
        Err(CiftiError::IndexOutOfRange { index: 2, len: 2 })
    ));

    ijk.insert(0, [9, 9, 9]).unwrap();
    ijk.insert(100, [5, 5, 5]).unwrap();
    assert_eq!(ijk[0], [9, 9, 9]);
    assert_eq!(ijk[3], [5, 5, 5]);
    assert_eq!(ijk.remove(1).unwrap(), [0, 0, 0]);
    assert_eq!(ijk.len(), 3);
}

#[test]
fn empty_voxel_table_fails_to_serialize() {
    assert_eq!(
        header_error(VoxelIndicesIJK::new().to_xml()),
        "VoxelIndicesIJK element require an index table"
    );
}

#[test]
fn vertices_need_brain_structure() {
    let mut v = Vertices::default();
    v.extend([1, 2, 3]).unwrap();
    assert_eq!(
        header_error(v.to_xml()),
        "Vertices element require a BrainStructure"
    );

    v.brain_structure = Some("CIFTI_STRUCTURE_CORTEX_LEFT".to_string());
    assert_eq!(
        xml_of(&v),
        r#"<Vertices BrainStructure="CIFTI_STRUCTURE_CORTEX_LEFT">1 2 3</Vertices>"#
    );
}

#[test]
fn vertex_indices_mutate_like_a_list() {
    let mut vi = VertexIndices::from_values([4, 5, 6]).unwrap();
    vi.set(0, 40).unwrap();
    vi.insert(1, 41).unwrap();
    assert_eq!(vi.remove(3).unwrap(), 6);
    assert_eq!(&vi[..], &[40, 41, 5]);
    assert!(vi.push(i128::MAX).is_err());
    assert_eq!(xml_of(&vi), "<VertexIndices>40 41 5</VertexIndices>");

    assert_eq!(
        header_error(VertexIndices::new().to_xml()),
        "VertexIndices element requires indices"
    );
}

#[test]
fn surface_requires_brain_structure() {
    assert_eq!(
        header_error(Surface::default().to_xml()),
        "Surface element requires at least 1 BrainStructure"
    );
    assert_eq!(
        xml_of(&Surface::new("CIFTI_STRUCTURE_CORTEX_RIGHT", 32492)),
        r#"<Surface BrainStructure="CIFTI_STRUCTURE_CORTEX_RIGHT" SurfaceNumberOfVertices="32492"/>"#
    );
}

#[test]
fn transformation_matrix_uses_ten_decimals() {
    let tm = TransformationMatrix::new(-3, IDENTITY);
    assert_eq!(
        xml_of(&tm),
        "<TransformationMatrixVoxelIndicesIJKtoXYZ MeterExponent=\"-3\">\
         1.0000000000 0.0000000000 0.0000000000 0.0000000000\n\
         0.0000000000 1.0000000000 0.0000000000 0.0000000000\n\
         0.0000000000 0.0000000000 1.0000000000 0.0000000000\n\
         0.0000000000 0.0000000000 0.0000000000 1.0000000000\
         </TransformationMatrixVoxelIndicesIJKtoXYZ>"
    );

    assert_eq!(
        header_error(TransformationMatrix::default().to_xml()),
        "TransformationMatrixVoxelIndicesIJKtoXYZ element requires a matrix"
    );
    assert!(TransformationMatrix::from_rows(-3, [[1.0, 0.0, 0.0]]).is_err());
}

#[test]
fn volume_needs_dimensions_and_transform() {
    assert_eq!(
        header_error(Volume::default().to_xml()),
        "Volume element requires dimensions"
    );

    let mut vol = Volume::default();
    vol.set_volume_dimensions([91, 109, 91]).unwrap();
    assert!(header_error(vol.to_xml()).contains("TransformationMatrixVoxelIndicesIJKtoXYZ"));

    vol.transformation_matrix = Some(TransformationMatrix::new(-3, IDENTITY));
    let xml = xml_of(&vol);
    assert!(xml.starts_with(r#"<Volume VolumeDimensions="91,109,91"><TransformationMatrix"#));
    assert!(xml.ends_with("</Volume>"));

    assert!(vol.set_volume_dimensions([1, 2]).is_err());
    assert_eq!(vol.volume_dimensions, Some([91, 109, 91]));
}
