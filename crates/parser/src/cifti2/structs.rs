use std::ops::Deref;

use serde::Serialize;

use crate::cifti2::matrix::CiftiElement;
use crate::cifti2::ordered_map::OrderedMap;
use crate::cifti2::validate::{
    checked_index, coerce_int, coerce_triple, float_01, insert_position, parse_float,
};
use crate::error::{CiftiError, Result};

/// <MetaData>
///
/// Ordered name/value pairs. Keys are unique and keep their first insertion position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetaData {
    data: OrderedMap<String, String>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut md = Self::new();
        md.update(pairs);
        md
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.data.insert(key.into(), value.into())
    }

    pub fn update<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.data.insert(k.into(), v.into());
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<String> {
        self.data
            .remove(key)
            .ok_or_else(|| CiftiError::KeyNotFound(key.to_string()))
    }

    /// Removes every key of `other` from this map.
    ///
    /// All keys are checked before anything is removed: a missing key leaves `self` untouched.
    pub fn difference_update(&mut self, other: Option<&MetaData>) -> Result<()> {
        let other = other.ok_or_else(|| {
            CiftiError::InvalidArgument("The metadata parameter can't be None".to_string())
        })?;
        if let Some(missing) = other.keys().find(|k| !self.data.contains_key(*k)) {
            return Err(CiftiError::KeyNotFound(missing.to_string()));
        }
        for k in other.keys() {
            self.data.remove(k);
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// <Label>
///
/// Integer key with a name and an RGBA colour, every component in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Label {
    pub key: i64,
    pub label: String,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Label {
    pub fn new(
        key: i64,
        label: impl Into<String>,
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
    ) -> Result<Self> {
        Ok(Self {
            key,
            label: label.into(),
            red: float_01(red)?,
            green: float_01(green)?,
            blue: float_01(blue)?,
            alpha: float_01(alpha)?,
        })
    }

    pub fn rgba(&self) -> (f64, f64, f64, f64) {
        (self.red, self.green, self.blue, self.alpha)
    }

    /// Checks the fields a `<Label>` needs, reporting every offending field at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.label.is_empty() {
            problems.push("Label needs a name".to_string());
        }
        for (name, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if float_01(value).is_err() {
                problems.push(format!(
                    "Label invalid {name} needs to be a float between 0 and 1. and it is {value}"
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CiftiError::Header(problems.join("; ")))
        }
    }
}

/// <LabelTable>
///
/// Labels indexed by their key; `table.get(k).key == k` holds for every entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: OrderedMap<i64, Label>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, key: i64) -> Option<&Label> {
        self.labels.get(&key)
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.labels.contains_key(&key)
    }

    pub fn set(&mut self, key: i64, label: Label) -> Result<()> {
        if label.key != key {
            return Err(CiftiError::coercion("The key and the label's key must agree"));
        }
        self.labels.insert(key, label);
        Ok(())
    }

    /// Builds a label under `key` from `(name, red, green, blue, alpha)` given as text.
    pub fn set_parts<S: AsRef<str>>(&mut self, key: i64, parts: &[S]) -> Result<()> {
        if parts.len() != 5 {
            return Err(CiftiError::coercion("Value should be length 5"));
        }
        let bad = || {
            CiftiError::coercion(
                "Key should be int, value should be sequence of str and 4 floats between 0 and 1",
            )
        };
        let mut rgba = [0f64; 4];
        for (slot, part) in rgba.iter_mut().zip(&parts[1..]) {
            *slot = parse_float(part.as_ref(), "colour").map_err(|_| bad())?;
        }
        let label = Label::new(key, parts[0].as_ref(), rgba[0], rgba[1], rgba[2], rgba[3])
            .map_err(|_| bad())?;
        self.labels.insert(key, label);
        Ok(())
    }

    pub fn set_rgba(&mut self, key: i64, name: impl Into<String>, rgba: [f64; 4]) -> Result<()> {
        let label = Label::new(key, name, rgba[0], rgba[1], rgba[2], rgba[3])?;
        self.labels.insert(key, label);
        Ok(())
    }

    pub fn append(&mut self, label: Label) {
        self.labels.insert(label.key, label);
    }

    pub fn remove(&mut self, key: i64) -> Result<Label> {
        self.labels
            .remove(&key)
            .ok_or_else(|| CiftiError::KeyNotFound(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.labels.keys().copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }
}

/// <Surface>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Surface {
    pub brain_structure: Option<String>,
    pub surface_number_of_vertices: Option<i64>,
}

impl Surface {
    pub fn new(brain_structure: impl Into<String>, surface_number_of_vertices: i64) -> Self {
        Self {
            brain_structure: Some(brain_structure.into()),
            surface_number_of_vertices: Some(surface_number_of_vertices),
        }
    }
}

/// <VoxelIndicesIJK>
///
/// Rows of `(i, j, k)` voxel indices. Read access goes through the slice deref.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VoxelIndicesIJK {
    indices: Vec<[i64; 3]>,
}

impl VoxelIndicesIJK {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<I, R, T>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        let mut out = Self::new();
        out.extend(rows)?;
        Ok(out)
    }

    /// Single-cell access by `(row, column)`.
    pub fn get_cell(&self, row: usize, col: usize) -> Option<i64> {
        self.indices.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn set<R, T>(&mut self, row: usize, value: R) -> Result<()>
    where
        R: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        let row = checked_index(row, self.indices.len())?;
        self.indices[row] = coerce_triple(value)?;
        Ok(())
    }

    pub fn set_cell<T: TryInto<i64>>(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let row = checked_index(row, self.indices.len())?;
        let col = checked_index(col, 3)?;
        self.indices[row][col] = coerce_int(value)?;
        Ok(())
    }

    pub fn insert<R, T>(&mut self, row: usize, value: R) -> Result<()>
    where
        R: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        let triple = coerce_triple(value)?;
        let at = insert_position(row, self.indices.len());
        self.indices.insert(at, triple);
        Ok(())
    }

    pub fn push<R, T>(&mut self, value: R) -> Result<()>
    where
        R: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        self.indices.push(coerce_triple(value)?);
        Ok(())
    }

    pub fn extend<I, R, T>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        for row in rows {
            self.push(row)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, row: usize) -> Result<[i64; 3]> {
        let row = checked_index(row, self.indices.len())?;
        Ok(self.indices.remove(row))
    }
}

impl Deref for VoxelIndicesIJK {
    type Target = [[i64; 3]];

    fn deref(&self) -> &Self::Target {
        &self.indices
    }
}

/// <Vertices>
///
/// Vertex indices of one surface inside a Parcel, tagged with its brain structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vertices {
    pub brain_structure: Option<String>,
    vertices: Vec<i64>,
}

impl Vertices {
    pub fn new(brain_structure: impl Into<String>) -> Self {
        Self {
            brain_structure: Some(brain_structure.into()),
            vertices: Vec::new(),
        }
    }

    pub fn with_vertices<I, T>(brain_structure: impl Into<String>, vertices: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        let mut out = Self::new(brain_structure);
        out.extend(vertices)?;
        Ok(out)
    }

    pub fn set<T: TryInto<i64>>(&mut self, index: usize, value: T) -> Result<()> {
        let index = checked_index(index, self.vertices.len())?;
        self.vertices[index] = coerce_int(value)?;
        Ok(())
    }

    pub fn insert<T: TryInto<i64>>(&mut self, index: usize, value: T) -> Result<()> {
        let value = coerce_int(value)?;
        let at = insert_position(index, self.vertices.len());
        self.vertices.insert(at, value);
        Ok(())
    }

    pub fn push<T: TryInto<i64>>(&mut self, value: T) -> Result<()> {
        self.vertices.push(coerce_int(value)?);
        Ok(())
    }

    pub fn extend<I, T>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        for v in values {
            self.push(v)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<i64> {
        let index = checked_index(index, self.vertices.len())?;
        Ok(self.vertices.remove(index))
    }
}

impl Deref for Vertices {
    type Target = [i64];

    fn deref(&self) -> &Self::Target {
        &self.vertices
    }
}

/// <VertexIndices>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VertexIndices {
    indices: Vec<i64>,
}

impl VertexIndices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I, T>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        let mut out = Self::new();
        out.extend(values)?;
        Ok(out)
    }

    pub fn set<T: TryInto<i64>>(&mut self, index: usize, value: T) -> Result<()> {
        let index = checked_index(index, self.indices.len())?;
        self.indices[index] = coerce_int(value)?;
        Ok(())
    }

    pub fn insert<T: TryInto<i64>>(&mut self, index: usize, value: T) -> Result<()> {
        let value = coerce_int(value)?;
        let at = insert_position(index, self.indices.len());
        self.indices.insert(at, value);
        Ok(())
    }

    pub fn push<T: TryInto<i64>>(&mut self, value: T) -> Result<()> {
        self.indices.push(coerce_int(value)?);
        Ok(())
    }

    pub fn extend<I, T>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        for v in values {
            self.push(v)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<i64> {
        let index = checked_index(index, self.indices.len())?;
        Ok(self.indices.remove(index))
    }
}

impl Deref for VertexIndices {
    type Target = [i64];

    fn deref(&self) -> &Self::Target {
        &self.indices
    }
}

/// <TransformationMatrixVoxelIndicesIJKtoXYZ>
///
/// Affine from voxel indices to spatial coordinates, scaled by `10^meter_exponent` metres.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformationMatrix {
    pub meter_exponent: Option<i64>,
    pub matrix: Option<[[f64; 4]; 4]>,
}

impl TransformationMatrix {
    pub fn new(meter_exponent: i64, matrix: [[f64; 4]; 4]) -> Self {
        Self {
            meter_exponent: Some(meter_exponent),
            matrix: Some(matrix),
        }
    }

    pub fn from_rows<I, R>(meter_exponent: i64, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let mut matrix = [[0f64; 4]; 4];
        let mut n = 0usize;
        for row in rows {
            let row = row.as_ref();
            if n >= 4 || row.len() != 4 {
                return Err(CiftiError::coercion("matrix must be 4x4"));
            }
            matrix[n].copy_from_slice(row);
            n += 1;
        }
        if n != 4 {
            return Err(CiftiError::coercion("matrix must be 4x4"));
        }
        Ok(Self::new(meter_exponent, matrix))
    }
}

/// <Volume>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Volume {
    pub volume_dimensions: Option<[i64; 3]>,
    pub transformation_matrix: Option<TransformationMatrix>,
}

impl Volume {
    pub fn new(volume_dimensions: [i64; 3], transformation_matrix: TransformationMatrix) -> Self {
        Self {
            volume_dimensions: Some(volume_dimensions),
            transformation_matrix: Some(transformation_matrix),
        }
    }

    pub fn set_volume_dimensions<I, T>(&mut self, dims: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<i64>,
    {
        self.volume_dimensions = Some(coerce_triple(dims)?);
        Ok(())
    }
}

/// <NamedMap>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamedMap {
    pub map_name: Option<String>,
    pub metadata: Option<MetaData>,
    pub label_table: Option<LabelTable>,
}

impl NamedMap {
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: Some(map_name.into()),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: MetaData) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_label_table(mut self, label_table: LabelTable) -> Self {
        self.label_table = Some(label_table);
        self
    }
}

/// <Parcel>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parcel {
    pub name: Option<String>,
    pub voxel_indices_ijk: Option<VoxelIndicesIJK>,
    pub vertices: Vec<Vertices>,
}

impl Parcel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn append_vertices(&mut self, vertices: Vertices) {
        self.vertices.push(vertices);
    }

    /// Appends a dynamically typed element, which has to be a `Vertices`.
    pub fn append_element(&mut self, element: CiftiElement) -> Result<()> {
        match element {
            CiftiElement::Vertices(v) => {
                self.vertices.push(v);
                Ok(())
            }
            other => Err(CiftiError::TypeMismatch(format!(
                "Not a valid Vertices instance: <{}>",
                other.tag_name()
            ))),
        }
    }

    pub fn pop_vertices(&mut self, ith: usize) -> Result<Vertices> {
        let ith = checked_index(ith, self.vertices.len())?;
        Ok(self.vertices.remove(ith))
    }
}

/// <BrainModel>
///
/// Maps `index_count` matrix indices starting at `index_offset` onto the vertices or voxels of one
/// brain structure. `model_type` and `brain_structure` are vocabulary strings; they are only
/// checked against the vocabularies under a strict validation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrainModel {
    pub index_offset: Option<i64>,
    pub index_count: Option<i64>,
    pub model_type: Option<String>,
    pub brain_structure: Option<String>,
    pub surface_number_of_vertices: Option<i64>,
    pub voxel_indices_ijk: Option<VoxelIndicesIJK>,
    pub vertex_indices: Option<VertexIndices>,
}

impl BrainModel {
    pub fn new(
        index_offset: i64,
        index_count: i64,
        model_type: impl Into<String>,
        brain_structure: impl Into<String>,
    ) -> Self {
        Self {
            index_offset: Some(index_offset),
            index_count: Some(index_count),
            model_type: Some(model_type.into()),
            brain_structure: Some(brain_structure.into()),
            ..Self::default()
        }
    }
}
