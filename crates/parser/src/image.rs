use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::cifti2::{Cifti2Header, XmlSerializable, parse_cifti_header};
use crate::error::{CiftiError, Result};
use crate::nifti2::header::{DT_FLOAT32, NIFTI2_PREAMBLE_SIZE, bitpix_for};
use crate::nifti2::{Extension, NIFTI_ECODE_CIFTI, Nifti2Header, read_extensions, write_extensions};

/// Raw voxel payload: shape, NIfTI datatype and the bytes in the container's byte order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataObj {
    pub shape: Vec<usize>,
    pub datatype: i16,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl DataObj {
    pub fn new(shape: Vec<usize>, datatype: i16, bytes: Vec<u8>) -> Result<Self> {
        let obj = Self {
            shape,
            datatype,
            bytes,
        };
        let expected = obj.expected_len()?;
        if obj.bytes.len() != expected {
            return Err(CiftiError::InvalidArgument(format!(
                "shape {:?} needs {expected} bytes, got {}",
                obj.shape,
                obj.bytes.len()
            )));
        }
        Ok(obj)
    }

    /// Little-endian float32 data.
    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Result<Self> {
        let mut bytes = vec![0u8; values.len() * 4];
        LittleEndian::write_f32_into(values, &mut bytes);
        Self::new(shape, DT_FLOAT32, bytes)
    }

    pub fn to_f32(&self, little_endian: bool) -> Result<Vec<f32>> {
        if self.datatype != DT_FLOAT32 {
            return Err(CiftiError::InvalidArgument(format!(
                "datatype {} is not float32",
                self.datatype
            )));
        }
        let mut out = vec![0f32; self.bytes.len() / 4];
        if little_endian {
            LittleEndian::read_f32_into(&self.bytes, &mut out);
        } else {
            byteorder::BigEndian::read_f32_into(&self.bytes, &mut out);
        }
        Ok(out)
    }

    /// Element count; saturates at `usize::MAX` for shapes no buffer could hold.
    pub fn len(&self) -> usize {
        element_count(&self.shape).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expected_len(&self) -> Result<usize> {
        let bitpix = bitpix_for(self.datatype).ok_or_else(|| {
            CiftiError::InvalidArgument(format!("unsupported NIfTI datatype {}", self.datatype))
        })?;
        byte_len(&self.shape, bitpix).ok_or_else(|| {
            CiftiError::InvalidArgument(format!("shape {:?} overflows the address space", self.shape))
        })
    }
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

fn byte_len(shape: &[usize], bitpix: i16) -> Option<usize> {
    let bits = element_count(shape)?.checked_mul(bitpix.max(0) as usize)?;
    Some(bits / 8)
}

/// Same payload viewed with another shape holding the same number of elements.
pub fn reshape_dataobj(obj: &DataObj, shape: &[usize]) -> Result<DataObj> {
    let n = element_count(shape);
    if n != Some(obj.len()) {
        return Err(CiftiError::coercion(format!(
            "cannot reshape {:?} ({} elements) into {shape:?}",
            obj.shape,
            obj.len()
        )));
    }
    Ok(DataObj {
        shape: shape.to_vec(),
        datatype: obj.datatype,
        bytes: obj.bytes.clone(),
    })
}

/// A CIFTI-2 header together with its NIfTI-2 container and data.
#[derive(Debug, Clone, PartialEq)]
pub struct Cifti2Image {
    pub header: Cifti2Header,
    pub nifti_header: Nifti2Header,
    pub dataobj: DataObj,
    /// Non-CIFTI extensions carried through unchanged.
    pub extensions: Vec<Extension>,
}

impl Cifti2Image {
    pub fn new(header: Cifti2Header, dataobj: DataObj) -> Result<Self> {
        let nifti_header = Nifti2Header::for_cifti_shape(&dataobj.shape, dataobj.datatype)?;
        Ok(Self {
            header,
            nifti_header,
            dataobj,
            extensions: Vec::new(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let nifti_header = Nifti2Header::from_bytes(bytes)?;
        let vox_offset = usize::try_from(nifti_header.vox_offset).map_err(|_| {
            CiftiError::FormatMismatch(format!("negative vox_offset {}", nifti_header.vox_offset))
        })?;
        let mut extensions = read_extensions(bytes, nifti_header.little_endian, vox_offset)?;
        let pos = extensions
            .iter()
            .position(Extension::is_cifti)
            .ok_or_else(|| {
                CiftiError::FormatMismatch(
                    "NIfTI2 header does not contain a CIFTI2 extension".to_string(),
                )
            })?;
        let cifti_ext = extensions.remove(pos);
        for ext in &extensions {
            log::warn!("carrying NIfTI extension with ecode {} through untouched", ext.ecode);
        }
        let header = parse_cifti_header(&cifti_ext.content)?;

        let shape = nifti_header.cifti_shape();
        let nbytes = byte_len(&shape, nifti_header.bitpix).ok_or_else(|| {
            CiftiError::FormatMismatch(format!(
                "data of shape {shape:?} at {} bits per voxel overflows the address space",
                nifti_header.bitpix
            ))
        })?;
        let end = vox_offset.checked_add(nbytes).ok_or_else(|| {
            CiftiError::FormatMismatch(format!(
                "data of {nbytes} bytes at offset {vox_offset} overflows the address space"
            ))
        })?;
        let data = bytes.get(vox_offset..end).ok_or_else(|| {
            CiftiError::FormatMismatch(format!(
                "data needs {nbytes} bytes at offset {vox_offset}, file has {}",
                bytes.len()
            ))
        })?;
        let dataobj = DataObj::new(shape, nifti_header.datatype, data.to_vec())?;
        log::debug!(
            "loaded CIFTI-2 image: shape {:?}, datatype {}, {} extra extensions",
            dataobj.shape,
            dataobj.datatype,
            extensions.len()
        );
        Ok(Self {
            header,
            nifti_header,
            dataobj,
            extensions,
        })
    }

    /// Serializes header, extensions and data. The NIfTI header is refreshed from the data
    /// object first; the CIFTI extension is always written last.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.check_mapped_dims();
        let mut nh = self.nifti_header.clone();
        nh.set_cifti_shape(&self.dataobj.shape)?;
        nh.datatype = self.dataobj.datatype;
        nh.bitpix = bitpix_for(self.dataobj.datatype).ok_or_else(|| {
            CiftiError::InvalidArgument(format!(
                "unsupported NIfTI datatype {}",
                self.dataobj.datatype
            ))
        })?;
        if nh.qform_code == 0 {
            nh.pixdim[..4].fill(1.0);
        }

        let mut exts: Vec<Extension> = self
            .extensions
            .iter()
            .filter(|e| !e.is_cifti())
            .cloned()
            .collect();
        exts.push(Extension::new(NIFTI_ECODE_CIFTI, self.header.to_xml()?));
        let ext_bytes: usize = exts.iter().map(Extension::esize).sum();
        nh.vox_offset = (NIFTI2_PREAMBLE_SIZE + ext_bytes) as i64;

        let mut out = nh.to_bytes();
        write_extensions(&exts, nh.little_endian, &mut out);
        out.extend_from_slice(&self.dataobj.bytes);
        Ok(out)
    }

    fn check_mapped_dims(&self) {
        for dim in 0..self.dataobj.shape.len() as i64 {
            if self.header.get_index_map(dim).is_none() {
                log::warn!("data dimension {dim} has no MatrixIndicesMap");
            }
        }
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Cifti2Image> {
    let path = path.as_ref();
    log::debug!("reading {}", path.display());
    let bytes = fs::read(path)?;
    Cifti2Image::from_bytes(&bytes)
}

pub fn save<P: AsRef<Path>>(img: &Cifti2Image, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = img.to_bytes()?;
    log::debug!("writing {} bytes to {}", bytes.len(), path.display());
    fs::write(path, bytes)?;
    Ok(())
}
