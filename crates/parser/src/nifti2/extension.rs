use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{CiftiError, Result};
use crate::nifti2::header::{NIFTI2_HEADER_SIZE, NIFTI2_PREAMBLE_SIZE};

/// Extension code under which CIFTI-2 XML is stored.
pub const NIFTI_ECODE_CIFTI: i32 = 32;

/// One NIfTI header extension: `esize` (multiple of 16, includes the 8-byte prefix), `ecode`,
/// then the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub ecode: i32,
    pub content: Vec<u8>,
}

impl Extension {
    pub fn new(ecode: i32, content: Vec<u8>) -> Self {
        Self { ecode, content }
    }

    /// On-disk size including the prefix and the zero padding.
    pub fn esize(&self) -> usize {
        (8 + self.content.len()).div_ceil(16) * 16
    }

    pub fn is_cifti(&self) -> bool {
        self.ecode == NIFTI_ECODE_CIFTI
    }

    fn write<E: ByteOrder>(&self, out: &mut Vec<u8>) {
        let esize = self.esize();
        let mut prefix = [0u8; 8];
        E::write_i32(&mut prefix[0..4], esize as i32);
        E::write_i32(&mut prefix[4..8], self.ecode);
        out.extend_from_slice(&prefix);
        out.extend_from_slice(&self.content);
        out.resize(out.len() + esize - 8 - self.content.len(), 0);
    }
}

/// Reads the extensions that follow the header, stopping at `limit` (the data offset).
pub fn read_extensions(bytes: &[u8], little_endian: bool, limit: usize) -> Result<Vec<Extension>> {
    if little_endian {
        read::<LittleEndian>(bytes, limit)
    } else {
        read::<BigEndian>(bytes, limit)
    }
}

fn read<E: ByteOrder>(bytes: &[u8], limit: usize) -> Result<Vec<Extension>> {
    let mut out = Vec::new();
    if bytes.len() < NIFTI2_PREAMBLE_SIZE || bytes[NIFTI2_HEADER_SIZE] == 0 {
        return Ok(out);
    }
    let limit = limit.min(bytes.len());
    let mut pos = NIFTI2_PREAMBLE_SIZE;

    while pos + 8 <= limit {
        let esize = E::read_i32(&bytes[pos..]);
        let ecode = E::read_i32(&bytes[pos + 4..]);
        if esize < 8 || pos + esize as usize > limit {
            return Err(CiftiError::FormatMismatch(format!(
                "extension at byte {pos} has invalid size {esize}"
            )));
        }
        let end = pos + esize as usize;
        out.push(Extension::new(ecode, bytes[pos + 8..end].to_vec()));
        pos = end;
    }
    log::trace!("read {} NIfTI extensions", out.len());
    Ok(out)
}

/// Writes the extender flag followed by every extension.
pub fn write_extensions(exts: &[Extension], little_endian: bool, out: &mut Vec<u8>) {
    out.extend_from_slice(&[u8::from(!exts.is_empty()), 0, 0, 0]);
    for ext in exts {
        if little_endian {
            ext.write::<LittleEndian>(out);
        } else {
            ext.write::<BigEndian>(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esize_pads_to_sixteen() {
        assert_eq!(Extension::new(NIFTI_ECODE_CIFTI, vec![]).esize(), 16);
        assert_eq!(Extension::new(NIFTI_ECODE_CIFTI, vec![b'x'; 8]).esize(), 16);
        assert_eq!(Extension::new(NIFTI_ECODE_CIFTI, vec![b'x'; 9]).esize(), 32);
    }

    #[test]
    fn reads_what_it_writes() {
        let exts = vec![
            Extension::new(6, b"comment".to_vec()),
            Extension::new(NIFTI_ECODE_CIFTI, b"<CIFTI/>".to_vec()),
        ];
        let mut bytes = vec![0u8; NIFTI2_HEADER_SIZE];
        write_extensions(&exts, true, &mut bytes);
        let limit = bytes.len();

        let back = read_extensions(&bytes, true, limit).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].ecode, 6);
        assert_eq!(&back[0].content[..7], b"comment");
        assert!(back[0].content[7..].iter().all(|&b| b == 0));
        assert!(back[1].is_cifti());
    }

    #[test]
    fn truncated_extension_is_rejected() {
        let mut bytes = vec![0u8; NIFTI2_HEADER_SIZE];
        write_extensions(&[Extension::new(NIFTI_ECODE_CIFTI, vec![1; 40])], true, &mut bytes);
        bytes.truncate(bytes.len() - 16);
        let limit = bytes.len();
        assert!(matches!(
            read_extensions(&bytes, true, limit),
            Err(CiftiError::FormatMismatch(_))
        ));
    }
}
