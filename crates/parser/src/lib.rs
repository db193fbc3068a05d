pub mod cifti2;
pub use cifti2::*;
pub mod error;
pub use error::{CiftiError, Result};
pub mod image;
pub use image::{Cifti2Image, DataObj, load, reshape_dataobj, save};
pub mod nifti2;

/// True when `bytes` start with a NIfTI-2 header whose intent code marks CIFTI-2 content.
pub fn may_contain_header(bytes: &[u8]) -> bool {
    nifti2::may_contain_cifti(bytes)
}

impl Cifti2Header {
    pub fn may_contain_header(bytes: &[u8]) -> bool {
        may_contain_header(bytes)
    }
}
