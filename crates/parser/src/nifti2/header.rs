use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{CiftiError, Result};

pub const NIFTI2_HEADER_SIZE: usize = 540;
/// Header plus the 4-byte extender that announces extensions.
pub const NIFTI2_PREAMBLE_SIZE: usize = NIFTI2_HEADER_SIZE + 4;

pub const MAGIC_SINGLE: [u8; 8] = *b"n+2\0\r\n\x1a\n";
pub const MAGIC_PAIR: [u8; 8] = *b"ni2\0\r\n\x1a\n";

pub const DT_UINT8: i16 = 2;
pub const DT_INT16: i16 = 4;
pub const DT_INT32: i16 = 8;
pub const DT_FLOAT32: i16 = 16;
pub const DT_FLOAT64: i16 = 64;
pub const DT_INT8: i16 = 256;
pub const DT_UINT16: i16 = 512;
pub const DT_UINT32: i16 = 768;
pub const DT_INT64: i16 = 1024;
pub const DT_UINT64: i16 = 1280;

/// NIfTI intent codes reserved for CIFTI-2 connectivity files.
pub const CIFTI_INTENT_CODES: std::ops::RangeInclusive<i32> = 3000..=3099;
pub const NIFTI_INTENT_CONNECTIVITY_UNKNOWN: i32 = 3000;

/// Bits per voxel for a NIfTI datatype code, `None` for types this crate does not store.
pub fn bitpix_for(datatype: i16) -> Option<i16> {
    match datatype {
        DT_UINT8 | DT_INT8 => Some(8),
        DT_INT16 | DT_UINT16 => Some(16),
        DT_INT32 | DT_UINT32 | DT_FLOAT32 => Some(32),
        DT_FLOAT64 | DT_INT64 | DT_UINT64 => Some(64),
        _ => None,
    }
}

mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const MAGIC: usize = 4;
    pub const DATATYPE: usize = 12;
    pub const BITPIX: usize = 14;
    pub const DIM: usize = 16;
    pub const INTENT_P1: usize = 80;
    pub const INTENT_P2: usize = 88;
    pub const INTENT_P3: usize = 96;
    pub const PIXDIM: usize = 104;
    pub const VOX_OFFSET: usize = 168;
    pub const SCL_SLOPE: usize = 176;
    pub const SCL_INTER: usize = 184;
    pub const CAL_MAX: usize = 192;
    pub const CAL_MIN: usize = 200;
    pub const SLICE_DURATION: usize = 208;
    pub const TOFFSET: usize = 216;
    pub const SLICE_START: usize = 224;
    pub const SLICE_END: usize = 232;
    pub const DESCRIP: usize = 240;
    pub const AUX_FILE: usize = 320;
    pub const QFORM_CODE: usize = 344;
    pub const SFORM_CODE: usize = 348;
    pub const QUATERN_B: usize = 352;
    pub const QUATERN_C: usize = 360;
    pub const QUATERN_D: usize = 368;
    pub const QOFFSET_X: usize = 376;
    pub const QOFFSET_Y: usize = 384;
    pub const QOFFSET_Z: usize = 392;
    pub const SROW_X: usize = 400;
    pub const SROW_Y: usize = 432;
    pub const SROW_Z: usize = 464;
    pub const SLICE_CODE: usize = 496;
    pub const XYZT_UNITS: usize = 500;
    pub const INTENT_CODE: usize = 504;
    pub const INTENT_NAME: usize = 508;
    pub const DIM_INFO: usize = 524;
}

use offsets::*;

/// The 540-byte NIfTI-2 header that carries CIFTI-2 data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nifti2Header {
    pub magic: [u8; 8],
    pub datatype: i16,
    pub bitpix: i16,
    pub dim: [i64; 8],
    pub intent_p1: f64,
    pub intent_p2: f64,
    pub intent_p3: f64,
    pub pixdim: [f64; 8],
    pub vox_offset: i64,
    pub scl_slope: f64,
    pub scl_inter: f64,
    pub cal_max: f64,
    pub cal_min: f64,
    pub slice_duration: f64,
    pub toffset: f64,
    pub slice_start: i64,
    pub slice_end: i64,
    pub descrip: String,
    pub aux_file: String,
    pub qform_code: i32,
    pub sform_code: i32,
    pub quatern: [f64; 3],
    pub qoffset: [f64; 3],
    pub srow_x: [f64; 4],
    pub srow_y: [f64; 4],
    pub srow_z: [f64; 4],
    pub slice_code: i32,
    pub xyzt_units: i32,
    pub intent_code: i32,
    pub intent_name: String,
    pub dim_info: u8,
    pub little_endian: bool,
}

impl Default for Nifti2Header {
    fn default() -> Self {
        Self {
            magic: MAGIC_SINGLE,
            datatype: DT_FLOAT32,
            bitpix: 32,
            dim: [0; 8],
            intent_p1: 0.0,
            intent_p2: 0.0,
            intent_p3: 0.0,
            pixdim: [1.0; 8],
            vox_offset: NIFTI2_PREAMBLE_SIZE as i64,
            scl_slope: 1.0,
            scl_inter: 0.0,
            cal_max: 0.0,
            cal_min: 0.0,
            slice_duration: 0.0,
            toffset: 0.0,
            slice_start: 0,
            slice_end: 0,
            descrip: String::new(),
            aux_file: String::new(),
            qform_code: 0,
            sform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow_x: [0.0; 4],
            srow_y: [0.0; 4],
            srow_z: [0.0; 4],
            slice_code: 0,
            xyzt_units: 0,
            intent_code: NIFTI_INTENT_CONNECTIVITY_UNKNOWN,
            intent_name: String::new(),
            dim_info: 0,
            little_endian: true,
        }
    }
}

fn read_f64s<E: ByteOrder, const N: usize>(bytes: &[u8], at: usize) -> [f64; N] {
    let mut out = [0f64; N];
    for (i, v) in out.iter_mut().enumerate() {
        *v = E::read_f64(&bytes[at + i * 8..]);
    }
    out
}

fn write_f64s<E: ByteOrder>(buf: &mut [u8], at: usize, values: &[f64]) {
    for (i, v) in values.iter().enumerate() {
        E::write_f64(&mut buf[at + i * 8..], *v);
    }
}

fn read_cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_cstr(buf: &mut [u8], s: &str) {
    let n = s.len().min(buf.len().saturating_sub(1));
    buf[..n].copy_from_slice(&s.as_bytes()[..n]);
}

impl Nifti2Header {
    /// Header for a fresh CIFTI-2 image of the given data shape.
    pub fn for_cifti_shape(shape: &[usize], datatype: i16) -> Result<Self> {
        let bitpix = bitpix_for(datatype).ok_or_else(|| {
            CiftiError::InvalidArgument(format!("unsupported NIfTI datatype {datatype}"))
        })?;
        let mut hdr = Self {
            datatype,
            bitpix,
            ..Self::default()
        };
        hdr.set_cifti_shape(shape)?;
        Ok(hdr)
    }

    /// Stores `shape` behind the four leading unit dimensions CIFTI-2 reserves.
    pub fn set_cifti_shape(&mut self, shape: &[usize]) -> Result<()> {
        if shape.len() > 3 {
            return Err(CiftiError::InvalidArgument(format!(
                "CIFTI-2 data has at most 3 dimensions, got {}",
                shape.len()
            )));
        }
        self.dim = [0; 8];
        self.dim[0] = 4 + shape.len() as i64;
        self.dim[1..5].fill(1);
        for (slot, &n) in self.dim[5..].iter_mut().zip(shape) {
            *slot = n as i64;
        }
        Ok(())
    }

    /// Data shape with the four leading unit dimensions dropped.
    pub fn cifti_shape(&self) -> Vec<usize> {
        let ndim = self.dim[0].clamp(0, 7) as usize;
        self.dim[1..=ndim]
            .iter()
            .skip(4)
            .map(|&n| usize::try_from(n.max(0)).unwrap_or(usize::MAX))
            .collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NIFTI2_HEADER_SIZE {
            return Err(CiftiError::FormatMismatch(format!(
                "need {NIFTI2_HEADER_SIZE} bytes for a NIfTI-2 header, got {}",
                bytes.len()
            )));
        }
        let hdr = if LittleEndian::read_i32(&bytes[SIZEOF_HDR..]) == NIFTI2_HEADER_SIZE as i32 {
            Self::parse::<LittleEndian>(bytes, true)
        } else if BigEndian::read_i32(&bytes[SIZEOF_HDR..]) == NIFTI2_HEADER_SIZE as i32 {
            Self::parse::<BigEndian>(bytes, false)
        } else {
            return Err(CiftiError::FormatMismatch(
                "sizeof_hdr is not 540, not a NIfTI-2 file".to_string(),
            ));
        };
        if hdr.magic != MAGIC_SINGLE && hdr.magic != MAGIC_PAIR {
            return Err(CiftiError::FormatMismatch(
                "bad NIfTI-2 magic string".to_string(),
            ));
        }
        if !(0..=7).contains(&hdr.dim[0]) {
            return Err(CiftiError::FormatMismatch(format!(
                "dim[0] = {} is out of range",
                hdr.dim[0]
            )));
        }
        Ok(hdr)
    }

    fn parse<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Self {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[MAGIC..MAGIC + 8]);
        let mut dim = [0i64; 8];
        for (i, d) in dim.iter_mut().enumerate() {
            *d = E::read_i64(&bytes[DIM + i * 8..]);
        }
        Self {
            magic,
            datatype: E::read_i16(&bytes[DATATYPE..]),
            bitpix: E::read_i16(&bytes[BITPIX..]),
            dim,
            intent_p1: E::read_f64(&bytes[INTENT_P1..]),
            intent_p2: E::read_f64(&bytes[INTENT_P2..]),
            intent_p3: E::read_f64(&bytes[INTENT_P3..]),
            pixdim: read_f64s::<E, 8>(bytes, PIXDIM),
            vox_offset: E::read_i64(&bytes[VOX_OFFSET..]),
            scl_slope: E::read_f64(&bytes[SCL_SLOPE..]),
            scl_inter: E::read_f64(&bytes[SCL_INTER..]),
            cal_max: E::read_f64(&bytes[CAL_MAX..]),
            cal_min: E::read_f64(&bytes[CAL_MIN..]),
            slice_duration: E::read_f64(&bytes[SLICE_DURATION..]),
            toffset: E::read_f64(&bytes[TOFFSET..]),
            slice_start: E::read_i64(&bytes[SLICE_START..]),
            slice_end: E::read_i64(&bytes[SLICE_END..]),
            descrip: read_cstr(&bytes[DESCRIP..DESCRIP + 80]),
            aux_file: read_cstr(&bytes[AUX_FILE..AUX_FILE + 24]),
            qform_code: E::read_i32(&bytes[QFORM_CODE..]),
            sform_code: E::read_i32(&bytes[SFORM_CODE..]),
            quatern: [
                E::read_f64(&bytes[QUATERN_B..]),
                E::read_f64(&bytes[QUATERN_C..]),
                E::read_f64(&bytes[QUATERN_D..]),
            ],
            qoffset: [
                E::read_f64(&bytes[QOFFSET_X..]),
                E::read_f64(&bytes[QOFFSET_Y..]),
                E::read_f64(&bytes[QOFFSET_Z..]),
            ],
            srow_x: read_f64s::<E, 4>(bytes, SROW_X),
            srow_y: read_f64s::<E, 4>(bytes, SROW_Y),
            srow_z: read_f64s::<E, 4>(bytes, SROW_Z),
            slice_code: E::read_i32(&bytes[SLICE_CODE..]),
            xyzt_units: E::read_i32(&bytes[XYZT_UNITS..]),
            intent_code: E::read_i32(&bytes[INTENT_CODE..]),
            intent_name: read_cstr(&bytes[INTENT_NAME..INTENT_NAME + 16]),
            dim_info: bytes[DIM_INFO],
            little_endian,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        if self.little_endian {
            self.write::<LittleEndian>()
        } else {
            self.write::<BigEndian>()
        }
    }

    fn write<E: ByteOrder>(&self) -> Vec<u8> {
        let mut buf = vec![0u8; NIFTI2_HEADER_SIZE];
        E::write_i32(&mut buf[SIZEOF_HDR..], NIFTI2_HEADER_SIZE as i32);
        buf[MAGIC..MAGIC + 8].copy_from_slice(&self.magic);
        E::write_i16(&mut buf[DATATYPE..], self.datatype);
        E::write_i16(&mut buf[BITPIX..], self.bitpix);
        for (i, d) in self.dim.iter().enumerate() {
            E::write_i64(&mut buf[DIM + i * 8..], *d);
        }
        E::write_f64(&mut buf[INTENT_P1..], self.intent_p1);
        E::write_f64(&mut buf[INTENT_P2..], self.intent_p2);
        E::write_f64(&mut buf[INTENT_P3..], self.intent_p3);
        write_f64s::<E>(&mut buf, PIXDIM, &self.pixdim);
        E::write_i64(&mut buf[VOX_OFFSET..], self.vox_offset);
        E::write_f64(&mut buf[SCL_SLOPE..], self.scl_slope);
        E::write_f64(&mut buf[SCL_INTER..], self.scl_inter);
        E::write_f64(&mut buf[CAL_MAX..], self.cal_max);
        E::write_f64(&mut buf[CAL_MIN..], self.cal_min);
        E::write_f64(&mut buf[SLICE_DURATION..], self.slice_duration);
        E::write_f64(&mut buf[TOFFSET..], self.toffset);
        E::write_i64(&mut buf[SLICE_START..], self.slice_start);
        E::write_i64(&mut buf[SLICE_END..], self.slice_end);
        write_cstr(&mut buf[DESCRIP..DESCRIP + 80], &self.descrip);
        write_cstr(&mut buf[AUX_FILE..AUX_FILE + 24], &self.aux_file);
        E::write_i32(&mut buf[QFORM_CODE..], self.qform_code);
        E::write_i32(&mut buf[SFORM_CODE..], self.sform_code);
        E::write_f64(&mut buf[QUATERN_B..], self.quatern[0]);
        E::write_f64(&mut buf[QUATERN_C..], self.quatern[1]);
        E::write_f64(&mut buf[QUATERN_D..], self.quatern[2]);
        E::write_f64(&mut buf[QOFFSET_X..], self.qoffset[0]);
        E::write_f64(&mut buf[QOFFSET_Y..], self.qoffset[1]);
        E::write_f64(&mut buf[QOFFSET_Z..], self.qoffset[2]);
        write_f64s::<E>(&mut buf, SROW_X, &self.srow_x);
        write_f64s::<E>(&mut buf, SROW_Y, &self.srow_y);
        write_f64s::<E>(&mut buf, SROW_Z, &self.srow_z);
        E::write_i32(&mut buf[SLICE_CODE..], self.slice_code);
        E::write_i32(&mut buf[XYZT_UNITS..], self.xyzt_units);
        E::write_i32(&mut buf[INTENT_CODE..], self.intent_code);
        write_cstr(&mut buf[INTENT_NAME..INTENT_NAME + 16], &self.intent_name);
        buf[DIM_INFO] = self.dim_info;
        buf
    }

    #[inline]
    pub fn has_cifti_intent(&self) -> bool {
        CIFTI_INTENT_CODES.contains(&self.intent_code)
    }
}

/// Cheap sniff: a NIfTI-2 header whose intent code is in the CIFTI-2 range.
pub fn may_contain_cifti(bytes: &[u8]) -> bool {
    Nifti2Header::from_bytes(bytes).is_ok_and(|h| h.has_cifti_intent())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_header_reads_back() {
        let mut hdr = Nifti2Header::for_cifti_shape(&[2, 91282], DT_FLOAT32).unwrap();
        hdr.little_endian = false;
        hdr.intent_code = 3006;
        hdr.descrip = "dscalar".to_string();

        let bytes = hdr.to_bytes();
        assert_eq!(bytes.len(), NIFTI2_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &[0, 0, 2, 28]);

        let back = Nifti2Header::from_bytes(&bytes).unwrap();
        assert!(!back.little_endian);
        assert_eq!(back.cifti_shape(), vec![2, 91282]);
        assert_eq!(back.descrip, "dscalar");
        assert!(back.has_cifti_intent());
    }

    #[test]
    fn rejects_nifti1_and_short_buffers() {
        let mut nifti1 = vec![0u8; NIFTI2_HEADER_SIZE];
        LittleEndian::write_i32(&mut nifti1[0..4], 348);
        assert!(matches!(
            Nifti2Header::from_bytes(&nifti1),
            Err(CiftiError::FormatMismatch(_))
        ));
        assert!(Nifti2Header::from_bytes(&[0u8; 100]).is_err());
        assert!(!may_contain_cifti(&nifti1));
    }

    #[test]
    fn intent_range_decides_cifti_sniff() {
        let mut hdr = Nifti2Header::for_cifti_shape(&[4], DT_FLOAT32).unwrap();
        hdr.intent_code = 2;
        assert!(!may_contain_cifti(&hdr.to_bytes()));
        hdr.intent_code = 3099;
        assert!(may_contain_cifti(&hdr.to_bytes()));
        hdr.intent_code = 3100;
        assert!(!may_contain_cifti(&hdr.to_bytes()));
    }
}
