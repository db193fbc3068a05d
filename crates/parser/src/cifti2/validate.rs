use crate::error::{CiftiError, Result};

/// Colour components live in the closed interval [0, 1].
#[inline]
pub fn float_01(val: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&val) {
        return Err(CiftiError::coercion(
            "Float must be between 0 and 1 inclusive",
        ));
    }
    Ok(val)
}

#[inline]
pub fn coerce_int<T: TryInto<i64>>(val: T) -> Result<i64> {
    val.try_into()
        .map_err(|_| CiftiError::coercion("value must be an int"))
}

/// Collects exactly three ints, e.g. one VoxelIndicesIJK row or the volume dimensions.
pub fn coerce_triple<I, T>(vals: I) -> Result<[i64; 3]>
where
    I: IntoIterator<Item = T>,
    T: TryInto<i64>,
{
    let mut out = [0i64; 3];
    let mut n = 0usize;
    for v in vals {
        let v = v
            .try_into()
            .map_err(|_| CiftiError::coercion("value must be a triple of ints"))?;
        if n < 3 {
            out[n] = v;
        }
        n += 1;
    }
    if n != 3 {
        return Err(CiftiError::coercion(format!(
            "value must be a triple of ints, got {n} values"
        )));
    }
    Ok(out)
}

#[inline]
pub fn checked_index(index: usize, len: usize) -> Result<usize> {
    if index >= len {
        return Err(CiftiError::IndexOutOfRange { index, len });
    }
    Ok(index)
}

/// List insertion clamps to the end, so inserting past the tail appends.
#[inline]
pub fn insert_position(index: usize, len: usize) -> usize {
    index.min(len)
}

pub fn parse_int(s: &str, what: &str) -> Result<i64> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| CiftiError::coercion(format!("{what} must be an int, got {s:?}")))
}

pub fn parse_float(s: &str, what: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| CiftiError::coercion(format!("{what} must be a float, got {s:?}")))
}

/// Shortest round-trip text for a float; integral values keep a `.0` suffix.
pub fn format_float(val: f64) -> String {
    if val.is_finite() && val.fract() == 0.0 && val.abs() < 1e16 {
        format!("{val:.1}")
    } else {
        format!("{val}")
    }
}

pub fn join_ints<'a, I: IntoIterator<Item = &'a i64>>(vals: I, sep: &str) -> String {
    vals.into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn split_ints(text: &str, what: &str) -> Result<Vec<i64>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_int(s, what))
        .collect()
}
