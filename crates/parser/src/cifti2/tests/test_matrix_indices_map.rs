use super::{cortex_header, header_error};
use crate::cifti2::cv_table::{INDEX_TYPE_BRAIN_MODELS, INDEX_TYPE_LABELS, INDEX_TYPE_SCALARS};
use crate::cifti2::{
    BrainModel, CiftiElement, Label, MapElement, Matrix, MatrixIndicesMap, NamedMap, Parcel,
    Surface, TransformationMatrix, ValidationPolicy, Vertices, Volume,
};
use crate::error::CiftiError;

fn volume(dim: i64) -> Volume {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 2.0;
    }
    Volume::new([dim, dim, dim], TransformationMatrix::new(-3, m))
}

#[test]
fn only_one_volume_per_map() {
    let mut mim = MatrixIndicesMap::new([1], INDEX_TYPE_SCALARS);
    mim.push(Surface::new("CIFTI_STRUCTURE_CORTEX_LEFT", 10)).unwrap();
    mim.push(volume(2)).unwrap();

    let msg = header_error(mim.push(volume(3)));
    assert_eq!(msg, "Only one Volume can be in a MatrixIndicesMap");
    assert!(mim.insert(0, volume(3)).is_err());
    assert!(mim.set(0, volume(3)).is_err());

    // overwriting the Volume's own slot is fine
    mim.set(1, volume(4)).unwrap();
    assert_eq!(mim.volume().unwrap().volume_dimensions, Some([4, 4, 4]));
    assert_eq!(mim.len(), 2);
}

#[test]
fn volume_setter_and_deleter() {
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_SCALARS);
    assert!(mim.volume().is_none());
    assert!(matches!(mim.delete_volume(), Err(CiftiError::KeyNotFound(_))));

    mim.set_volume(volume(2));
    mim.push(Surface::new("CIFTI_STRUCTURE_CORTEX_LEFT", 10)).unwrap();
    mim.set_volume(volume(5));
    assert_eq!(mim.len(), 2);
    assert!(mim.get(0).unwrap().is_volume());
    assert_eq!(mim.volume().unwrap().volume_dimensions, Some([5, 5, 5]));

    mim.volume_mut().unwrap().volume_dimensions = Some([6, 6, 6]);
    let removed = mim.delete_volume().unwrap();
    assert_eq!(removed.volume_dimensions, Some([6, 6, 6]));
    assert!(mim.volume().is_none());
    assert!(mim.delete_volume().is_err());
}

#[test]
fn typed_views_follow_document_order() {
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_BRAIN_MODELS);
    mim.push(BrainModel::new(0, 5, "CIFTI_MODEL_TYPE_SURFACE", "CIFTI_STRUCTURE_CORTEX_LEFT"))
        .unwrap();
    mim.push(NamedMap::new("ignored")).unwrap();
    mim.push(BrainModel::new(5, 3, "CIFTI_MODEL_TYPE_VOXELS", "CIFTI_STRUCTURE_THALAMUS_LEFT"))
        .unwrap();
    mim.insert(0, Parcel::new("p")).unwrap();

    let offsets: Vec<Option<i64>> = mim.brain_models().map(|b| b.index_offset).collect();
    assert_eq!(offsets, vec![Some(0), Some(5)]);
    assert_eq!(mim.parcels().count(), 1);
    assert_eq!(mim.named_maps().count(), 1);
    assert_eq!(mim.surfaces().count(), 0);

    for b in mim.brain_models_mut() {
        b.index_count = Some(1);
    }
    assert!(mim.brain_models().all(|b| b.index_count == Some(1)));

    let tags: Vec<&str> = mim.iter().map(MapElement::tag_name).collect();
    assert_eq!(tags, vec!["Parcel", "BrainModel", "NamedMap", "BrainModel"]);

    assert!(matches!(mim.remove(10), Err(CiftiError::IndexOutOfRange { .. })));
    assert!(matches!(mim.remove(2).unwrap(), MapElement::NamedMap(_)));
}

#[test]
fn dynamic_insertion_checks_element_kind() {
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_LABELS);
    let label = Label::new(1, "x", 0.0, 0.0, 0.0, 1.0).unwrap();
    assert!(matches!(
        mim.insert_element(0, CiftiElement::from(label.clone())),
        Err(CiftiError::TypeMismatch(_))
    ));
    mim.insert_element(0, NamedMap::new("m").into()).unwrap();

    let mut matrix = Matrix::new();
    let err = matrix.insert_element(0, label.into()).unwrap_err();
    assert!(
        matches!(err, CiftiError::TypeMismatch(ref m) if m == "Not a valid Cifti2MatrixIndicesMap instance")
    );
    matrix.insert_element(0, mim.into()).unwrap();
    assert_eq!(matrix.len(), 1);
}

#[test]
fn parcel_accepts_only_vertices() {
    let mut parcel = Parcel::new("V1");
    assert!(matches!(
        parcel.append_element(Surface::default().into()),
        Err(CiftiError::TypeMismatch(_))
    ));
    parcel
        .append_element(Vertices::with_vertices("CIFTI_STRUCTURE_CORTEX_LEFT", [1, 2]).unwrap().into())
        .unwrap();
    parcel.append_vertices(Vertices::new("CIFTI_STRUCTURE_CORTEX_RIGHT"));
    assert_eq!(parcel.vertices.len(), 2);

    let popped = parcel.pop_vertices(0).unwrap();
    assert_eq!(&popped[..], &[1, 2]);
    assert!(parcel.pop_vertices(5).is_err());
}

#[test]
fn index_map_lookup_by_dimension() {
    let header = cortex_header();
    let mut matrix = header.matrix.clone();
    matrix.push(MatrixIndicesMap::new([1, 2], INDEX_TYPE_SCALARS));

    assert_eq!(
        matrix.get_index_map(0).unwrap().indices_map_to_data_type.as_deref(),
        Some(INDEX_TYPE_BRAIN_MODELS)
    );
    assert!(matrix.get_index_map(2).is_some());
    assert!(matrix.get_index_map(3).is_none());
    assert_eq!(matrix.mapped_indices(), vec![0, 1, 2]);
}

#[test]
fn strict_policy_checks_map_legality() {
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_BRAIN_MODELS);
    mim.push(NamedMap::new("wrong place")).unwrap();
    let mut header = cortex_header();
    header.matrix.push(mim);

    header.validate(ValidationPolicy::Permissive).unwrap();
    let msg = header_error(header.validate(ValidationPolicy::Strict));
    assert!(msg.contains("<NamedMap> is not allowed"), "{msg}");
    assert!(header.to_xml_with_policy(ValidationPolicy::Strict).is_err());
}

#[test]
fn strict_policy_checks_vocabularies() {
    let mut header = cortex_header();
    header.validate(ValidationPolicy::Strict).unwrap();

    let bm = header
        .matrix
        .get_mut(0)
        .and_then(|m| m.brain_models_mut().next())
        .unwrap();
    bm.brain_structure = Some("CIFTI_STRUCTURE_NOWHERE".to_string());
    assert!(header_error(header.validate(ValidationPolicy::Strict)).contains("BrainStructure"));

    let mut header = cortex_header();
    header.matrix.get_mut(0).unwrap().series_unit = Some("FORTNIGHT".to_string());
    assert!(header.validate(ValidationPolicy::Strict).is_err());
}
