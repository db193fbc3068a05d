use std::{fs, path::Path};

use cifti::cv_table::{INDEX_TYPE_BRAIN_MODELS, INDEX_TYPE_SCALARS, MODEL_TYPE_SURFACE};
use cifti::{
    BrainModel, Cifti2Header, Cifti2Image, DataObj, Matrix, MatrixIndicesMap, MetaData, NamedMap,
};

/// dscalar layout: dimension 0 holds `n_maps` named scalar maps, dimension 1 a left-cortex
/// surface model with `n_vertices` vertices.
pub fn dscalar_header(n_maps: usize, n_vertices: i64) -> Cifti2Header {
    let mut scalars = MatrixIndicesMap::new([0], INDEX_TYPE_SCALARS);
    for i in 0..n_maps {
        let md = MetaData::from_pairs([("index", i.to_string())]);
        scalars
            .push(NamedMap::new(format!("map {i}")).with_metadata(md))
            .unwrap_or_else(|e| panic!("cannot add named map: {e}"));
    }

    let mut model = BrainModel::new(
        0,
        n_vertices,
        MODEL_TYPE_SURFACE,
        "CIFTI_STRUCTURE_CORTEX_LEFT",
    );
    model.surface_number_of_vertices = Some(n_vertices);
    model.vertex_indices = Some(
        cifti::VertexIndices::from_values(0..n_vertices)
            .unwrap_or_else(|e| panic!("cannot build vertex indices: {e}")),
    );
    let models = MatrixIndicesMap::new([1], INDEX_TYPE_BRAIN_MODELS)
        .with_maps([model])
        .unwrap_or_else(|e| panic!("cannot add brain model: {e}"));

    Cifti2Header::new(Matrix::with_maps([scalars, models]), "2.0")
}

pub fn dscalar_image(n_maps: usize, n_vertices: i64) -> Cifti2Image {
    let values: Vec<f32> = (0..n_maps * n_vertices as usize).map(|v| v as f32 * 0.5).collect();
    let data = DataObj::from_f32(vec![n_maps, n_vertices as usize], &values)
        .unwrap_or_else(|e| panic!("cannot build data: {e}"));
    let mut img = Cifti2Image::new(dscalar_header(n_maps, n_vertices), data)
        .unwrap_or_else(|e| panic!("cannot build image: {e}"));
    img.nifti_header.intent_code = 3006;
    img.nifti_header.intent_name = "ConnDenseScalar".to_string();
    img
}

#[allow(dead_code)]
pub fn read_bytes(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e))
}
