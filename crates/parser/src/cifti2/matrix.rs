use serde::Serialize;

use crate::cifti2::attr_meta::*;
use crate::cifti2::cv_table::{
    is_brain_structure, is_map_type, is_model_type, is_series_unit, valid_map_types,
};
use crate::cifti2::structs::{
    BrainModel, Label, LabelTable, MetaData, NamedMap, Parcel, Surface, TransformationMatrix,
    Vertices, VertexIndices, Volume, VoxelIndicesIJK,
};
use crate::cifti2::validate::{checked_index, insert_position};
use crate::error::{CiftiError, Result};

/// How much checking happens before a header is written.
///
/// `Permissive` only enforces the required-child rules. `Strict` also checks the controlled
/// vocabularies and which element kinds each map type may contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ValidationPolicy {
    #[default]
    Permissive,
    Strict,
}

/// An element that can live directly inside a `<MatrixIndicesMap>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MapElement {
    NamedMap(NamedMap),
    Surface(Surface),
    Parcel(Parcel),
    BrainModel(BrainModel),
    Volume(Volume),
}

impl MapElement {
    pub fn tag_name(&self) -> &'static str {
        match self {
            MapElement::NamedMap(_) => TAG_NAMED_MAP,
            MapElement::Surface(_) => TAG_SURFACE,
            MapElement::Parcel(_) => TAG_PARCEL,
            MapElement::BrainModel(_) => TAG_BRAIN_MODEL,
            MapElement::Volume(_) => TAG_VOLUME,
        }
    }

    #[inline]
    pub fn is_volume(&self) -> bool {
        matches!(self, MapElement::Volume(_))
    }
}

/// Any node of a CIFTI-2 document, for APIs that accept elements of more than one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CiftiElement {
    MetaData(MetaData),
    LabelTable(LabelTable),
    Label(Label),
    NamedMap(NamedMap),
    Surface(Surface),
    VoxelIndicesIJK(VoxelIndicesIJK),
    Vertices(Vertices),
    VertexIndices(VertexIndices),
    TransformationMatrix(TransformationMatrix),
    Volume(Volume),
    Parcel(Parcel),
    BrainModel(BrainModel),
    MatrixIndicesMap(MatrixIndicesMap),
    Matrix(Matrix),
}

impl CiftiElement {
    pub fn tag_name(&self) -> &'static str {
        match self {
            CiftiElement::MetaData(_) => TAG_METADATA,
            CiftiElement::LabelTable(_) => TAG_LABEL_TABLE,
            CiftiElement::Label(_) => TAG_LABEL,
            CiftiElement::NamedMap(_) => TAG_NAMED_MAP,
            CiftiElement::Surface(_) => TAG_SURFACE,
            CiftiElement::VoxelIndicesIJK(_) => TAG_VOXEL_INDICES_IJK,
            CiftiElement::Vertices(_) => TAG_VERTICES,
            CiftiElement::VertexIndices(_) => TAG_VERTEX_INDICES,
            CiftiElement::TransformationMatrix(_) => TAG_TRANSFORMATION_MATRIX,
            CiftiElement::Volume(_) => TAG_VOLUME,
            CiftiElement::Parcel(_) => TAG_PARCEL,
            CiftiElement::BrainModel(_) => TAG_BRAIN_MODEL,
            CiftiElement::MatrixIndicesMap(_) => TAG_MATRIX_INDICES_MAP,
            CiftiElement::Matrix(_) => TAG_MATRIX,
        }
    }
}

macro_rules! impl_from_element {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for CiftiElement {
                fn from(v: $ty) -> Self {
                    CiftiElement::$ty(v)
                }
            }
        )*
    };
}

impl_from_element!(
    MetaData,
    LabelTable,
    Label,
    NamedMap,
    Surface,
    VoxelIndicesIJK,
    Vertices,
    VertexIndices,
    TransformationMatrix,
    Volume,
    Parcel,
    BrainModel,
    MatrixIndicesMap,
    Matrix,
);

impl From<NamedMap> for MapElement {
    fn from(v: NamedMap) -> Self {
        MapElement::NamedMap(v)
    }
}

impl From<Surface> for MapElement {
    fn from(v: Surface) -> Self {
        MapElement::Surface(v)
    }
}

impl From<Parcel> for MapElement {
    fn from(v: Parcel) -> Self {
        MapElement::Parcel(v)
    }
}

impl From<BrainModel> for MapElement {
    fn from(v: BrainModel) -> Self {
        MapElement::BrainModel(v)
    }
}

impl From<Volume> for MapElement {
    fn from(v: Volume) -> Self {
        MapElement::Volume(v)
    }
}

impl TryFrom<CiftiElement> for MapElement {
    type Error = CiftiError;

    fn try_from(el: CiftiElement) -> Result<Self> {
        match el {
            CiftiElement::NamedMap(v) => Ok(MapElement::NamedMap(v)),
            CiftiElement::Surface(v) => Ok(MapElement::Surface(v)),
            CiftiElement::Parcel(v) => Ok(MapElement::Parcel(v)),
            CiftiElement::BrainModel(v) => Ok(MapElement::BrainModel(v)),
            CiftiElement::Volume(v) => Ok(MapElement::Volume(v)),
            other => Err(CiftiError::TypeMismatch(format!(
                "<{}> cannot be placed in a MatrixIndicesMap",
                other.tag_name()
            ))),
        }
    }
}

impl TryFrom<CiftiElement> for MatrixIndicesMap {
    type Error = CiftiError;

    fn try_from(el: CiftiElement) -> Result<Self> {
        match el {
            CiftiElement::MatrixIndicesMap(m) => Ok(m),
            _ => Err(CiftiError::TypeMismatch(
                "Not a valid Cifti2MatrixIndicesMap instance".to_string(),
            )),
        }
    }
}

/// <MatrixIndicesMap>
///
/// Describes what the indices along one or more matrix dimensions refer to. Holds at most one
/// `Volume` among its elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatrixIndicesMap {
    pub applies_to_matrix_dimension: Option<Vec<i64>>,
    pub indices_map_to_data_type: Option<String>,
    pub number_of_series_points: Option<i64>,
    pub series_exponent: Option<i64>,
    pub series_start: Option<f64>,
    pub series_step: Option<f64>,
    pub series_unit: Option<String>,
    maps: Vec<MapElement>,
}

impl MatrixIndicesMap {
    pub fn new<I>(applies_to_matrix_dimension: I, indices_map_to_data_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            applies_to_matrix_dimension: Some(applies_to_matrix_dimension.into_iter().collect()),
            indices_map_to_data_type: Some(indices_map_to_data_type.into()),
            ..Self::default()
        }
    }

    /// Builds a map holding `maps`, rejecting more than one `Volume`.
    pub fn with_maps<I, E>(mut self, maps: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<MapElement>,
    {
        for m in maps {
            self.push(m)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MapElement> {
        self.maps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MapElement> {
        self.maps.iter()
    }

    fn volume_position(&self) -> Option<usize> {
        self.maps.iter().position(MapElement::is_volume)
    }

    fn check_volume_slot(&self, element: &MapElement, replacing: Option<usize>) -> Result<()> {
        if !element.is_volume() {
            return Ok(());
        }
        match self.volume_position() {
            Some(pos) if Some(pos) != replacing => Err(CiftiError::header(
                "Only one Volume can be in a MatrixIndicesMap",
            )),
            _ => Ok(()),
        }
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, element: impl Into<MapElement>) -> Result<MapElement> {
        let index = checked_index(index, self.maps.len())?;
        let element = element.into();
        self.check_volume_slot(&element, Some(index))?;
        Ok(std::mem::replace(&mut self.maps[index], element))
    }

    pub fn insert(&mut self, index: usize, element: impl Into<MapElement>) -> Result<()> {
        let element = element.into();
        self.check_volume_slot(&element, None)?;
        let at = insert_position(index, self.maps.len());
        self.maps.insert(at, element);
        Ok(())
    }

    pub fn push(&mut self, element: impl Into<MapElement>) -> Result<()> {
        let element = element.into();
        self.check_volume_slot(&element, None)?;
        self.maps.push(element);
        Ok(())
    }

    /// Inserts a dynamically typed element; anything that is not a map element is rejected.
    pub fn insert_element(&mut self, index: usize, element: CiftiElement) -> Result<()> {
        self.insert(index, MapElement::try_from(element)?)
    }

    pub fn remove(&mut self, index: usize) -> Result<MapElement> {
        let index = checked_index(index, self.maps.len())?;
        Ok(self.maps.remove(index))
    }

    pub fn named_maps(&self) -> impl Iterator<Item = &NamedMap> {
        self.maps.iter().filter_map(|m| match m {
            MapElement::NamedMap(v) => Some(v),
            _ => None,
        })
    }

    pub fn named_maps_mut(&mut self) -> impl Iterator<Item = &mut NamedMap> {
        self.maps.iter_mut().filter_map(|m| match m {
            MapElement::NamedMap(v) => Some(v),
            _ => None,
        })
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.maps.iter().filter_map(|m| match m {
            MapElement::Surface(v) => Some(v),
            _ => None,
        })
    }

    pub fn parcels(&self) -> impl Iterator<Item = &Parcel> {
        self.maps.iter().filter_map(|m| match m {
            MapElement::Parcel(v) => Some(v),
            _ => None,
        })
    }

    pub fn parcels_mut(&mut self) -> impl Iterator<Item = &mut Parcel> {
        self.maps.iter_mut().filter_map(|m| match m {
            MapElement::Parcel(v) => Some(v),
            _ => None,
        })
    }

    pub fn brain_models(&self) -> impl Iterator<Item = &BrainModel> {
        self.maps.iter().filter_map(|m| match m {
            MapElement::BrainModel(v) => Some(v),
            _ => None,
        })
    }

    pub fn brain_models_mut(&mut self) -> impl Iterator<Item = &mut BrainModel> {
        self.maps.iter_mut().filter_map(|m| match m {
            MapElement::BrainModel(v) => Some(v),
            _ => None,
        })
    }

    pub fn volume(&self) -> Option<&Volume> {
        self.maps.iter().find_map(|m| match m {
            MapElement::Volume(v) => Some(v),
            _ => None,
        })
    }

    pub fn volume_mut(&mut self) -> Option<&mut Volume> {
        self.maps.iter_mut().find_map(|m| match m {
            MapElement::Volume(v) => Some(v),
            _ => None,
        })
    }

    /// Replaces the existing `Volume` in place, or appends one.
    pub fn set_volume(&mut self, volume: Volume) {
        match self.volume_position() {
            Some(pos) => self.maps[pos] = MapElement::Volume(volume),
            None => self.maps.push(MapElement::Volume(volume)),
        }
    }

    pub fn delete_volume(&mut self) -> Result<Volume> {
        let volume = self.volume_position().map(|pos| self.maps.remove(pos));
        let Some(MapElement::Volume(v)) = volume else {
            return Err(CiftiError::KeyNotFound("No Cifti2Volume element".to_string()));
        };
        Ok(v)
    }

    /// Strict checks: map type vocabulary, series unit, element kinds allowed by the map type,
    /// and the brain structure / model type of each child.
    pub fn validate_strict(&self) -> Result<()> {
        let map_type = self.indices_map_to_data_type.as_deref().ok_or_else(|| {
            CiftiError::header("MatrixIndicesMap element requires an IndicesMapToDataType")
        })?;
        if !is_map_type(map_type) {
            return Err(CiftiError::header(format!(
                "{map_type} is not a valid IndicesMapToDataType"
            )));
        }
        if let Some(unit) = self.series_unit.as_deref() {
            if !is_series_unit(unit) {
                return Err(CiftiError::header(format!("{unit} is not a valid SeriesUnit")));
            }
        }
        for m in &self.maps {
            if !valid_map_types(m.tag_name()).contains(&map_type) {
                return Err(CiftiError::header(format!(
                    "<{}> is not allowed in a map of type {map_type}",
                    m.tag_name()
                )));
            }
            match m {
                MapElement::Surface(s) => check_structure(s.brain_structure.as_deref())?,
                MapElement::BrainModel(b) => {
                    check_structure(b.brain_structure.as_deref())?;
                    if let Some(t) = b.model_type.as_deref() {
                        if !is_model_type(t) {
                            return Err(CiftiError::header(format!(
                                "{t} is not a valid ModelType"
                            )));
                        }
                    }
                }
                MapElement::Parcel(p) => {
                    for v in &p.vertices {
                        check_structure(v.brain_structure.as_deref())?;
                    }
                }
                MapElement::NamedMap(_) | MapElement::Volume(_) => {}
            }
        }
        Ok(())
    }
}

fn check_structure(structure: Option<&str>) -> Result<()> {
    match structure {
        Some(s) if !is_brain_structure(s) => Err(CiftiError::header(format!(
            "{s} is not a valid BrainStructure"
        ))),
        _ => Ok(()),
    }
}

impl<'a> IntoIterator for &'a MatrixIndicesMap {
    type Item = &'a MapElement;
    type IntoIter = std::slice::Iter<'a, MapElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.maps.iter()
    }
}

/// <Matrix>
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Matrix {
    pub metadata: Option<MetaData>,
    maps: Vec<MatrixIndicesMap>,
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maps<I: IntoIterator<Item = MatrixIndicesMap>>(maps: I) -> Self {
        Self {
            metadata: None,
            maps: maps.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MatrixIndicesMap> {
        self.maps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut MatrixIndicesMap> {
        self.maps.get_mut(index)
    }

    pub fn set(&mut self, index: usize, map: MatrixIndicesMap) -> Result<MatrixIndicesMap> {
        let index = checked_index(index, self.maps.len())?;
        Ok(std::mem::replace(&mut self.maps[index], map))
    }

    pub fn insert(&mut self, index: usize, map: MatrixIndicesMap) {
        let at = insert_position(index, self.maps.len());
        self.maps.insert(at, map);
    }

    pub fn push(&mut self, map: MatrixIndicesMap) {
        self.maps.push(map);
    }

    pub fn set_element(&mut self, index: usize, element: CiftiElement) -> Result<MatrixIndicesMap> {
        self.set(index, MatrixIndicesMap::try_from(element)?)
    }

    pub fn insert_element(&mut self, index: usize, element: CiftiElement) -> Result<()> {
        self.insert(index, MatrixIndicesMap::try_from(element)?);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<MatrixIndicesMap> {
        let index = checked_index(index, self.maps.len())?;
        Ok(self.maps.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatrixIndicesMap> {
        self.maps.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, MatrixIndicesMap> {
        self.maps.iter_mut()
    }

    /// The map that applies to matrix dimension `dim`, if any.
    pub fn get_index_map(&self, dim: i64) -> Option<&MatrixIndicesMap> {
        self.maps.iter().find(|m| {
            m.applies_to_matrix_dimension
                .as_ref()
                .is_some_and(|dims| dims.contains(&dim))
        })
    }

    /// Sorted matrix dimensions covered by some map.
    pub fn mapped_indices(&self) -> Vec<i64> {
        let mut dims: Vec<i64> = self
            .maps
            .iter()
            .filter_map(|m| m.applies_to_matrix_dimension.as_ref())
            .flatten()
            .copied()
            .collect();
        dims.sort_unstable();
        dims.dedup();
        dims
    }
}

impl<'a> IntoIterator for &'a Matrix {
    type Item = &'a MatrixIndicesMap;
    type IntoIter = std::slice::Iter<'a, MatrixIndicesMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.maps.iter()
    }
}

pub const DEFAULT_VERSION: &str = "2.0";

/// <CIFTI>
///
/// Root of a CIFTI-2 header: one `Matrix` plus the format version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cifti2Header {
    pub matrix: Matrix,
    pub version: String,
}

impl Default for Cifti2Header {
    fn default() -> Self {
        Self {
            matrix: Matrix::default(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl Cifti2Header {
    pub fn new(matrix: Matrix, version: impl Into<String>) -> Self {
        Self {
            matrix,
            version: version.into(),
        }
    }

    pub fn get_index_map(&self, dim: i64) -> Option<&MatrixIndicesMap> {
        self.matrix.get_index_map(dim)
    }

    pub fn mapped_indices(&self) -> Vec<i64> {
        self.matrix.mapped_indices()
    }

    /// Runs the checks that `policy` asks for beyond the ones serialization always performs.
    pub fn validate(&self, policy: ValidationPolicy) -> Result<()> {
        if policy == ValidationPolicy::Permissive {
            return Ok(());
        }
        for (i, m) in self.matrix.iter().enumerate() {
            m.validate_strict().map_err(|e| match e {
                CiftiError::Header(msg) => {
                    CiftiError::Header(format!("MatrixIndicesMap {i}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
