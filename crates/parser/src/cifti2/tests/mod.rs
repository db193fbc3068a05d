mod test_geometry;
mod test_matrix_indices_map;
mod test_metadata;
mod test_parse;

use crate::cifti2::cv_table::{INDEX_TYPE_BRAIN_MODELS, MODEL_TYPE_SURFACE};
use crate::cifti2::{BrainModel, Cifti2Header, Matrix, MatrixIndicesMap, XmlSerializable};
use crate::error::{CiftiError, Result};

fn xml_of<T: XmlSerializable>(el: &T) -> String {
    el.to_xml_string()
        .unwrap_or_else(|e| panic!("serialization failed: {e}"))
}

fn header_error<T: std::fmt::Debug>(res: Result<T>) -> String {
    match res {
        Err(CiftiError::Header(msg)) => msg,
        other => panic!("expected a header error, got {other:?}"),
    }
}

fn coercion_error<T: std::fmt::Debug>(res: Result<T>) -> String {
    match res {
        Err(CiftiError::ValueCoercion(msg)) => msg,
        other => panic!("expected a value coercion error, got {other:?}"),
    }
}

/// One BRAIN_MODELS map on dimension 0 with a single left-cortex surface model.
fn cortex_header() -> Cifti2Header {
    let mut model = BrainModel::new(0, 10, MODEL_TYPE_SURFACE, "CIFTI_STRUCTURE_CORTEX_LEFT");
    model.surface_number_of_vertices = Some(32492);
    let mim = MatrixIndicesMap::new([0], INDEX_TYPE_BRAIN_MODELS)
        .with_maps([model])
        .unwrap();
    Cifti2Header::new(Matrix::with_maps([mim]), "2.0")
}
