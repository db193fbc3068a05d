pub mod attr_meta;
pub mod cv_table;
pub mod matrix;
pub mod ordered_map;
pub mod parse_cifti;
pub mod structs;
pub mod to_xml;
pub(crate) mod validate;

pub use matrix::{
    CiftiElement, Cifti2Header, MapElement, Matrix, MatrixIndicesMap, ValidationPolicy,
};
pub use parse_cifti::parse_cifti_header;
pub use structs::*;
pub use to_xml::XmlSerializable;

#[cfg(test)]
mod tests;
