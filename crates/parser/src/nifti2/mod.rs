pub mod extension;
pub mod header;

pub use extension::{Extension, NIFTI_ECODE_CIFTI, read_extensions, write_extensions};
pub use header::{Nifti2Header, may_contain_cifti};
