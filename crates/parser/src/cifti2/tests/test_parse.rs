use super::{coercion_error, cortex_header, header_error};
use crate::cifti2::cv_table::INDEX_TYPE_LABELS;
use crate::cifti2::{
    Cifti2Header, LabelTable, MapElement, Matrix, MatrixIndicesMap, MetaData, NamedMap,
    ValidationPolicy, XmlSerializable,
};

const DENSE_LABEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CIFTI Version="2">
  <Matrix>
    <MetaData>
      <MD>
        <Name>Provenance</Name>
        <Value>wb_command -cifti-create-label</Value>
      </MD>
    </MetaData>
    <MatrixIndicesMap AppliesToMatrixDimension="0" IndicesMapToDataType="CIFTI_INDEX_TYPE_LABELS">
      <NamedMap>
        <LabelTable>
          <Label Key="0" Red="1" Green="1" Blue="1" Alpha="0">???</Label>
          <Label Key="1" Red="0.5" Green="0" Blue="0.25" Alpha="1">V1</Label>
        </LabelTable>
        <MapName>atlas</MapName>
      </NamedMap>
    </MatrixIndicesMap>
    <MatrixIndicesMap AppliesToMatrixDimension="1" IndicesMapToDataType="CIFTI_INDEX_TYPE_BRAIN_MODELS">
      <Volume VolumeDimensions="2,3,4">
        <TransformationMatrixVoxelIndicesIJKtoXYZ MeterExponent="-3">
          -2 0 0 90
          0 2 0 -126
          0 0 2 -72
          0 0 0 1
        </TransformationMatrixVoxelIndicesIJKtoXYZ>
      </Volume>
      <BrainModel IndexOffset="0" IndexCount="2" ModelType="CIFTI_MODEL_TYPE_VOXELS" BrainStructure="CIFTI_STRUCTURE_THALAMUS_LEFT">
        <VoxelIndicesIJK>
          0 1 2
          1 1 1
        </VoxelIndicesIJK>
      </BrainModel>
    </MatrixIndicesMap>
  </Matrix>
</CIFTI>
"#;

#[test]
fn round_trip_preserves_brain_model_tree() {
    let header = cortex_header();
    let xml = header.to_xml().unwrap();
    let back = Cifti2Header::from_xml(&xml).unwrap();
    assert_eq!(back, header);
}

#[test]
fn round_trip_preserves_metadata_order_and_text() {
    let md = MetaData::from_pairs([
        ("zeta", "1"),
        ("alpha", "a < b & c"),
        ("mid", "quote \" and 'apostrophe'"),
    ]);
    let named = NamedMap::new("m").with_metadata(md.clone());
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_LABELS);
    mim.push(named).unwrap();
    let mut matrix = Matrix::with_maps([mim]);
    matrix.metadata = Some(md.clone());
    let header = Cifti2Header::new(matrix, "2.0");

    let back = Cifti2Header::from_xml(&header.to_xml().unwrap()).unwrap();
    assert_eq!(back.matrix.metadata.as_ref(), Some(&md));
    let nm = back.matrix.get(0).unwrap().named_maps().next().unwrap();
    assert_eq!(nm.metadata.as_ref(), Some(&md));
    assert_eq!(back, header);
}

#[test]
fn reads_indented_document() {
    let header = Cifti2Header::from_xml_str(DENSE_LABEL).unwrap();
    assert_eq!(header.version, "2");
    assert_eq!(header.mapped_indices(), vec![0, 1]);
    assert_eq!(
        header.matrix.metadata.as_ref().and_then(|m| m.get("Provenance")),
        Some("wb_command -cifti-create-label")
    );

    let labels = header.get_index_map(0).unwrap();
    let nm = labels.named_maps().next().unwrap();
    assert_eq!(nm.map_name.as_deref(), Some("atlas"));
    let table: &LabelTable = nm.label_table.as_ref().unwrap();
    assert_eq!(table.keys().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(table.get(1).unwrap().rgba(), (0.5, 0.0, 0.25, 1.0));

    let models = header.get_index_map(1).unwrap();
    let vol = models.volume().unwrap();
    assert_eq!(vol.volume_dimensions, Some([2, 3, 4]));
    let tm = vol.transformation_matrix.as_ref().unwrap();
    assert_eq!(tm.meter_exponent, Some(-3));
    assert_eq!(tm.matrix.unwrap()[0], [-2.0, 0.0, 0.0, 90.0]);

    let bm = models.brain_models().next().unwrap();
    let ijk = bm.voxel_indices_ijk.as_ref().unwrap();
    assert_eq!(&ijk[..], &[[0, 1, 2], [1, 1, 1]]);
    assert!(matches!(models.get(0), Some(MapElement::Volume(_))));
}

#[test]
fn rewritten_document_parses_to_the_same_tree() {
    let header = Cifti2Header::from_xml_str(DENSE_LABEL).unwrap();
    let again = Cifti2Header::from_xml(&header.to_xml().unwrap()).unwrap();
    assert_eq!(again, header);
}

#[test]
fn unknown_elements_are_skipped() {
    let xml = r#"<CIFTI Version="2.0"><Matrix><Annotation><Note>x</Note></Annotation>
        <MetaData><MD><Name>a</Name><Value>b</Value></MD></MetaData><Extra/></Matrix></CIFTI>"#;
    let header = Cifti2Header::from_xml_str(xml).unwrap();
    assert!(header.matrix.is_empty());
    assert_eq!(header.matrix.metadata.unwrap().get("a"), Some("b"));
}

#[test]
fn misplaced_elements_are_rejected() {
    let xml = r#"<CIFTI Version="2.0"><Matrix><Label Key="1" Red="0" Green="0" Blue="0" Alpha="0">x</Label></Matrix></CIFTI>"#;
    let msg = header_error(Cifti2Header::from_xml_str(xml));
    assert_eq!(msg, "<Label> is not allowed inside <Matrix>");

    let msg = header_error(Cifti2Header::from_xml_str("<Matrix/>"));
    assert!(msg.starts_with("root element must be <CIFTI>"));
}

#[test]
fn two_volumes_in_one_map_are_rejected() {
    let xml = r#"<CIFTI Version="2.0"><Matrix>
        <MatrixIndicesMap AppliesToMatrixDimension="0" IndicesMapToDataType="CIFTI_INDEX_TYPE_SCALARS">
        <Volume VolumeDimensions="1,1,1"/><Volume VolumeDimensions="1,1,1"/>
        </MatrixIndicesMap></Matrix></CIFTI>"#;
    let msg = header_error(Cifti2Header::from_xml_str(xml));
    assert_eq!(msg, "Only one Volume can be in a MatrixIndicesMap");
}

#[test]
fn bad_numbers_are_value_errors() {
    let xml = r#"<CIFTI Version="2.0"><Matrix><MatrixIndicesMap AppliesToMatrixDimension="0" IndicesMapToDataType="CIFTI_INDEX_TYPE_LABELS">
        <NamedMap><LabelTable><Label Key="1" Red="3" Green="0" Blue="0" Alpha="0">x</Label></LabelTable><MapName>m</MapName></NamedMap>
        </MatrixIndicesMap></Matrix></CIFTI>"#;
    let msg = coercion_error(Cifti2Header::from_xml_str(xml));
    assert_eq!(msg, "Float must be between 0 and 1 inclusive");

    let xml = r#"<CIFTI Version="2.0"><Matrix><MatrixIndicesMap AppliesToMatrixDimension="zero"/></Matrix></CIFTI>"#;
    assert!(coercion_error(Cifti2Header::from_xml_str(xml)).contains("AppliesToMatrixDimension"));
}

#[test]
fn trailing_padding_is_ignored() {
    let mut xml = cortex_header().to_xml().unwrap();
    xml.extend_from_slice(&[0u8; 11]);
    assert_eq!(Cifti2Header::from_xml(&xml).unwrap(), cortex_header());
}

#[test]
fn lossy_but_conforming_documents_rewrite_stably() {
    let xml = r#"<CIFTI Version="2"><Matrix>
        <MatrixIndicesMap AppliesToMatrixDimension="0" IndicesMapToDataType="CIFTI_INDEX_TYPE_LABELS">
        <NamedMap><MetaData/><MapName>m</MapName></NamedMap>
        </MatrixIndicesMap>
        <MatrixIndicesMap AppliesToMatrixDimension="1" IndicesMapToDataType="CIFTI_INDEX_TYPE_SCALARS">
        <Volume VolumeDimensions="2,2,2"><TransformationMatrixVoxelIndicesIJKtoXYZ MeterExponent="-3">
        0.12345678901234 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
        </TransformationMatrixVoxelIndicesIJKtoXYZ></Volume>
        </MatrixIndicesMap></Matrix></CIFTI>"#;
    let header = Cifti2Header::from_xml_str(xml).unwrap();
    let nm = header.get_index_map(0).unwrap().named_maps().next().unwrap();
    assert_eq!(nm.metadata, Some(MetaData::new()));

    let back = Cifti2Header::from_xml(&header.to_xml().unwrap()).unwrap();
    assert_ne!(back, header);
    assert!(header.rewrite_is_stable(ValidationPolicy::Permissive).unwrap());
    assert!(header.rewrite_is_stable(ValidationPolicy::Strict).unwrap());
}

#[test]
fn unnamed_map_reads_back_with_empty_name() {
    let mut mim = MatrixIndicesMap::new([0], INDEX_TYPE_LABELS);
    mim.push(NamedMap::default()).unwrap();
    let header = Cifti2Header::new(Matrix::with_maps([mim]), "2.0");

    let back = Cifti2Header::from_xml(&header.to_xml().unwrap()).unwrap();
    let nm = back.matrix.get(0).unwrap().named_maps().next().unwrap();
    assert_eq!(nm.map_name.as_deref(), Some(""));
    assert!(header.rewrite_is_stable(ValidationPolicy::Permissive).unwrap());
}
