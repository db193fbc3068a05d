//! Element and attribute names of the CIFTI-2 XML schema.

pub const TAG_CIFTI: &str = "CIFTI";
pub const TAG_MATRIX: &str = "Matrix";
pub const TAG_METADATA: &str = "MetaData";
pub const TAG_MD: &str = "MD";
pub const TAG_NAME: &str = "Name";
pub const TAG_VALUE: &str = "Value";
pub const TAG_MATRIX_INDICES_MAP: &str = "MatrixIndicesMap";
pub const TAG_NAMED_MAP: &str = "NamedMap";
pub const TAG_MAP_NAME: &str = "MapName";
pub const TAG_LABEL_TABLE: &str = "LabelTable";
pub const TAG_LABEL: &str = "Label";
pub const TAG_SURFACE: &str = "Surface";
pub const TAG_PARCEL: &str = "Parcel";
pub const TAG_VERTICES: &str = "Vertices";
pub const TAG_VOXEL_INDICES_IJK: &str = "VoxelIndicesIJK";
pub const TAG_BRAIN_MODEL: &str = "BrainModel";
pub const TAG_VERTEX_INDICES: &str = "VertexIndices";
pub const TAG_VOLUME: &str = "Volume";
pub const TAG_TRANSFORMATION_MATRIX: &str = "TransformationMatrixVoxelIndicesIJKtoXYZ";

pub const ATTR_VERSION: &str = "Version";
pub const ATTR_KEY: &str = "Key";
pub const ATTR_RED: &str = "Red";
pub const ATTR_GREEN: &str = "Green";
pub const ATTR_BLUE: &str = "Blue";
pub const ATTR_ALPHA: &str = "Alpha";
pub const ATTR_BRAIN_STRUCTURE: &str = "BrainStructure";
pub const ATTR_SURFACE_NUMBER_OF_VERTICES: &str = "SurfaceNumberOfVertices";
pub const ATTR_NAME: &str = "Name";
pub const ATTR_METER_EXPONENT: &str = "MeterExponent";
pub const ATTR_VOLUME_DIMENSIONS: &str = "VolumeDimensions";
pub const ATTR_INDEX_OFFSET: &str = "IndexOffset";
pub const ATTR_INDEX_COUNT: &str = "IndexCount";
pub const ATTR_MODEL_TYPE: &str = "ModelType";
pub const ATTR_APPLIES_TO_MATRIX_DIMENSION: &str = "AppliesToMatrixDimension";
pub const ATTR_INDICES_MAP_TO_DATA_TYPE: &str = "IndicesMapToDataType";
pub const ATTR_NUMBER_OF_SERIES_POINTS: &str = "NumberOfSeriesPoints";
pub const ATTR_SERIES_EXPONENT: &str = "SeriesExponent";
pub const ATTR_SERIES_START: &str = "SeriesStart";
pub const ATTR_SERIES_STEP: &str = "SeriesStep";
pub const ATTR_SERIES_UNIT: &str = "SeriesUnit";

/// Label colour attributes in write order.
pub const LABEL_COLOR_ATTRS: [&str; 4] = [ATTR_RED, ATTR_GREEN, ATTR_BLUE, ATTR_ALPHA];

/// BrainModel scalar attributes in write order.
pub const BRAIN_MODEL_ATTRS: [&str; 5] = [
    ATTR_INDEX_OFFSET,
    ATTR_INDEX_COUNT,
    ATTR_MODEL_TYPE,
    ATTR_BRAIN_STRUCTURE,
    ATTR_SURFACE_NUMBER_OF_VERTICES,
];

/// MatrixIndicesMap optional attributes in write order; `AppliesToMatrixDimension` precedes them.
pub const MATRIX_INDICES_MAP_ATTRS: [&str; 6] = [
    ATTR_INDICES_MAP_TO_DATA_TYPE,
    ATTR_NUMBER_OF_SERIES_POINTS,
    ATTR_SERIES_EXPONENT,
    ATTR_SERIES_START,
    ATTR_SERIES_STEP,
    ATTR_SERIES_UNIT,
];
