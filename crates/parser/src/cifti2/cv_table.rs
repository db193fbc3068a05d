use hashbrown::HashSet;
use once_cell::sync::Lazy;

pub const INDEX_TYPE_BRAIN_MODELS: &str = "CIFTI_INDEX_TYPE_BRAIN_MODELS";
pub const INDEX_TYPE_PARCELS: &str = "CIFTI_INDEX_TYPE_PARCELS";
pub const INDEX_TYPE_SERIES: &str = "CIFTI_INDEX_TYPE_SERIES";
pub const INDEX_TYPE_SCALARS: &str = "CIFTI_INDEX_TYPE_SCALARS";
pub const INDEX_TYPE_LABELS: &str = "CIFTI_INDEX_TYPE_LABELS";

pub const CIFTI_MAP_TYPES: [&str; 5] = [
    INDEX_TYPE_BRAIN_MODELS,
    INDEX_TYPE_PARCELS,
    INDEX_TYPE_SERIES,
    INDEX_TYPE_SCALARS,
    INDEX_TYPE_LABELS,
];

pub const MODEL_TYPE_SURFACE: &str = "CIFTI_MODEL_TYPE_SURFACE";
pub const MODEL_TYPE_VOXELS: &str = "CIFTI_MODEL_TYPE_VOXELS";

pub const CIFTI_MODEL_TYPES: [&str; 2] = [MODEL_TYPE_SURFACE, MODEL_TYPE_VOXELS];

pub const CIFTI_SERIESUNIT_TYPES: [&str; 4] = ["SECOND", "HERTZ", "METER", "RADIAN"];

pub const CIFTI_BRAIN_STRUCTURES: [&str; 32] = [
    "CIFTI_STRUCTURE_ACCUMBENS_LEFT",
    "CIFTI_STRUCTURE_ACCUMBENS_RIGHT",
    "CIFTI_STRUCTURE_ALL_WHITE_MATTER",
    "CIFTI_STRUCTURE_ALL_GREY_MATTER",
    "CIFTI_STRUCTURE_AMYGDALA_LEFT",
    "CIFTI_STRUCTURE_AMYGDALA_RIGHT",
    "CIFTI_STRUCTURE_BRAIN_STEM",
    "CIFTI_STRUCTURE_CAUDATE_LEFT",
    "CIFTI_STRUCTURE_CAUDATE_RIGHT",
    "CIFTI_STRUCTURE_CEREBELLAR_WHITE_MATTER_LEFT",
    "CIFTI_STRUCTURE_CEREBELLAR_WHITE_MATTER_RIGHT",
    "CIFTI_STRUCTURE_CEREBELLUM",
    "CIFTI_STRUCTURE_CEREBELLUM_LEFT",
    "CIFTI_STRUCTURE_CEREBELLUM_RIGHT",
    "CIFTI_STRUCTURE_CEREBRAL_WHITE_MATTER_LEFT",
    "CIFTI_STRUCTURE_CEREBRAL_WHITE_MATTER_RIGHT",
    "CIFTI_STRUCTURE_CORTEX",
    "CIFTI_STRUCTURE_CORTEX_LEFT",
    "CIFTI_STRUCTURE_CORTEX_RIGHT",
    "CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_LEFT",
    "CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_RIGHT",
    "CIFTI_STRUCTURE_HIPPOCAMPUS_LEFT",
    "CIFTI_STRUCTURE_HIPPOCAMPUS_RIGHT",
    "CIFTI_STRUCTURE_OTHER",
    "CIFTI_STRUCTURE_OTHER_GREY_MATTER",
    "CIFTI_STRUCTURE_OTHER_WHITE_MATTER",
    "CIFTI_STRUCTURE_PALLIDUM_LEFT",
    "CIFTI_STRUCTURE_PALLIDUM_RIGHT",
    "CIFTI_STRUCTURE_PUTAMEN_LEFT",
    "CIFTI_STRUCTURE_PUTAMEN_RIGHT",
    "CIFTI_STRUCTURE_THALAMUS_LEFT",
    "CIFTI_STRUCTURE_THALAMUS_RIGHT",
];

static BRAIN_STRUCTURES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| CIFTI_BRAIN_STRUCTURES.iter().copied().collect());

#[inline]
pub fn is_map_type(s: &str) -> bool {
    CIFTI_MAP_TYPES.contains(&s)
}

#[inline]
pub fn is_model_type(s: &str) -> bool {
    CIFTI_MODEL_TYPES.contains(&s)
}

#[inline]
pub fn is_series_unit(s: &str) -> bool {
    CIFTI_SERIESUNIT_TYPES.contains(&s)
}

#[inline]
pub fn is_brain_structure(s: &str) -> bool {
    BRAIN_STRUCTURES.contains(s)
}

/// Map types under which an element with the given tag may appear in a MatrixIndicesMap.
pub fn valid_map_types(tag: &str) -> &'static [&'static str] {
    match tag {
        "BrainModel" => &[INDEX_TYPE_BRAIN_MODELS],
        "Parcel" => &[INDEX_TYPE_PARCELS],
        "NamedMap" => &[INDEX_TYPE_LABELS],
        "Volume" | "Surface" => &[INDEX_TYPE_SCALARS, INDEX_TYPE_SERIES],
        _ => &[],
    }
}
