use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::cifti2::attr_meta::*;
use crate::cifti2::matrix::{
    Cifti2Header, DEFAULT_VERSION, Matrix, MatrixIndicesMap, ValidationPolicy,
};
use crate::cifti2::structs::*;
use crate::cifti2::validate::{coerce_triple, parse_float, parse_int, split_ints};
use crate::error::{CiftiError, Result};

const KNOWN_TAGS: [&str; 19] = [
    TAG_CIFTI,
    TAG_MATRIX,
    TAG_METADATA,
    TAG_MD,
    TAG_NAME,
    TAG_VALUE,
    TAG_MATRIX_INDICES_MAP,
    TAG_NAMED_MAP,
    TAG_MAP_NAME,
    TAG_LABEL_TABLE,
    TAG_LABEL,
    TAG_SURFACE,
    TAG_PARCEL,
    TAG_VERTICES,
    TAG_VOXEL_INDICES_IJK,
    TAG_BRAIN_MODEL,
    TAG_VERTEX_INDICES,
    TAG_VOLUME,
    TAG_TRANSFORMATION_MATRIX,
];

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn get_attr(start: &BytesStart<'_>, name: &str) -> Option<String> {
    start
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn require_attr(start: &BytesStart<'_>, tag: &str, name: &str) -> Result<String> {
    get_attr(start, name)
        .ok_or_else(|| CiftiError::header(format!("{tag} element requires a {name} attribute")))
}

fn attr_int(start: &BytesStart<'_>, name: &str) -> Result<Option<i64>> {
    get_attr(start, name)
        .map(|s| parse_int(&s, name))
        .transpose()
}

fn attr_float(start: &BytesStart<'_>, name: &str) -> Result<Option<f64>> {
    get_attr(start, name)
        .map(|s| parse_float(&s, name))
        .transpose()
}

fn resolve_ref(r: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = r.resolve_char_ref().map_err(CiftiError::xml)? {
        return Ok(ch.to_string());
    }
    let name = r.decode().map_err(CiftiError::xml)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| CiftiError::xml(format!("unknown entity &{name};")))
}

fn skip_element<R: BufRead>(reader: &mut Reader<R>, end: &str) -> Result<()> {
    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(256);

    while depth != 0 {
        match reader.read_event_into(&mut buf).map_err(CiftiError::xml)? {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                if depth == 1 && e.local_name().as_ref() == end.as_bytes() {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Collects the character data of `<tag>` up to its end tag. Nested elements are ignored.
fn read_text<R: BufRead>(reader: &mut Reader<R>, tag: &str, empty: bool) -> Result<String> {
    let mut out = String::new();
    if empty {
        return Ok(out);
    }
    let mut buf = Vec::with_capacity(256);
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(CiftiError::xml)? {
            Event::Text(t) if depth == 0 => out.push_str(&t.decode().map_err(CiftiError::xml)?),
            Event::CData(t) if depth == 0 => {
                out.push_str(&String::from_utf8_lossy(&t.into_inner()))
            }
            Event::GeneralRef(r) if depth == 0 => out.push_str(&resolve_ref(&r)?),
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                if depth == 0 && e.local_name().as_ref() == tag.as_bytes() {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                return Err(CiftiError::xml(format!(
                    "unexpected end of document inside <{tag}>"
                )));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Hands every child element of `<parent>` to `visit` until the parent's end tag.
///
/// `visit` receives the reader positioned after the child's start tag, plus whether the child
/// was self-closing, and must consume the child completely.
fn walk_children<R, F>(reader: &mut Reader<R>, parent: &str, empty: bool, mut visit: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&mut Reader<R>, &str, &BytesStart<'_>, bool) -> Result<()>,
{
    if empty {
        return Ok(());
    }
    let mut buf = Vec::with_capacity(256);

    loop {
        match reader.read_event_into(&mut buf).map_err(CiftiError::xml)? {
            Event::Start(e) => {
                let tag = tag_name(&e);
                log::trace!("<{tag}> in <{parent}>");
                visit(reader, &tag, &e, false)?;
            }
            Event::Empty(e) => {
                let tag = tag_name(&e);
                log::trace!("<{tag}/> in <{parent}>");
                visit(reader, &tag, &e, true)?;
            }
            Event::End(e) if e.local_name().as_ref() == parent.as_bytes() => return Ok(()),
            Event::Eof => {
                return Err(CiftiError::xml(format!(
                    "unexpected end of document inside <{parent}>"
                )));
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Unknown elements are skipped with a warning; known ones in the wrong place are an error.
fn unexpected<R: BufRead>(
    reader: &mut Reader<R>,
    parent: &str,
    tag: &str,
    empty: bool,
) -> Result<()> {
    if KNOWN_TAGS.contains(&tag) {
        return Err(CiftiError::header(format!(
            "<{tag}> is not allowed inside <{parent}>"
        )));
    }
    log::warn!("skipping unknown element <{tag}> inside <{parent}>");
    if !empty {
        skip_element(reader, tag)?;
    }
    Ok(())
}

/// <CIFTI>
fn parse_cifti<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Cifti2Header> {
    let version = get_attr(start, ATTR_VERSION).unwrap_or_else(|| {
        log::warn!("<CIFTI> has no Version attribute, assuming {DEFAULT_VERSION}");
        DEFAULT_VERSION.to_string()
    });
    let mut matrix = None;
    walk_children(reader, TAG_CIFTI, empty, |r, tag, _, empty| match tag {
        TAG_MATRIX => {
            if matrix.is_some() {
                return Err(CiftiError::header("CIFTI element holds more than one Matrix"));
            }
            matrix = Some(parse_matrix(r, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_CIFTI, tag, empty),
    })?;
    Ok(Cifti2Header::new(matrix.unwrap_or_default(), version))
}

/// <Matrix>
fn parse_matrix<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<Matrix> {
    let mut matrix = Matrix::new();
    walk_children(reader, TAG_MATRIX, empty, |r, tag, start, empty| match tag {
        TAG_METADATA => {
            matrix.metadata = Some(parse_metadata(r, empty)?);
            Ok(())
        }
        TAG_MATRIX_INDICES_MAP => {
            matrix.push(parse_matrix_indices_map(r, start, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_MATRIX, tag, empty),
    })?;
    Ok(matrix)
}

/// <MetaData>
fn parse_metadata<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<MetaData> {
    let mut md = MetaData::new();
    walk_children(reader, TAG_METADATA, empty, |r, tag, _, empty| match tag {
        TAG_MD => {
            let (name, value) = parse_md(r, empty)?;
            md.set(name, value);
            Ok(())
        }
        _ => unexpected(r, TAG_METADATA, tag, empty),
    })?;
    Ok(md)
}

/// <MD>
fn parse_md<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<(String, String)> {
    let mut name = None;
    let mut value = None;
    walk_children(reader, TAG_MD, empty, |r, tag, _, empty| match tag {
        TAG_NAME => {
            name = Some(read_text(r, TAG_NAME, empty)?);
            Ok(())
        }
        TAG_VALUE => {
            value = Some(read_text(r, TAG_VALUE, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_MD, tag, empty),
    })?;
    let name = name.ok_or_else(|| CiftiError::header("MD element requires a Name"))?;
    Ok((name, value.unwrap_or_default()))
}

/// <MatrixIndicesMap>
fn parse_matrix_indices_map<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<MatrixIndicesMap> {
    let mut mim = MatrixIndicesMap::default();
    mim.applies_to_matrix_dimension = get_attr(start, ATTR_APPLIES_TO_MATRIX_DIMENSION)
        .map(|s| split_ints(&s, ATTR_APPLIES_TO_MATRIX_DIMENSION))
        .transpose()?;
    mim.indices_map_to_data_type = get_attr(start, ATTR_INDICES_MAP_TO_DATA_TYPE);
    mim.number_of_series_points = attr_int(start, ATTR_NUMBER_OF_SERIES_POINTS)?;
    mim.series_exponent = attr_int(start, ATTR_SERIES_EXPONENT)?;
    mim.series_start = attr_float(start, ATTR_SERIES_START)?;
    mim.series_step = attr_float(start, ATTR_SERIES_STEP)?;
    mim.series_unit = get_attr(start, ATTR_SERIES_UNIT);
    walk_children(reader, TAG_MATRIX_INDICES_MAP, empty, |r, tag, start, empty| {
        match tag {
            TAG_NAMED_MAP => mim.push(parse_named_map(r, empty)?),
            TAG_SURFACE => mim.push(parse_surface(r, start, empty)?),
            TAG_PARCEL => mim.push(parse_parcel(r, start, empty)?),
            TAG_BRAIN_MODEL => mim.push(parse_brain_model(r, start, empty)?),
            TAG_VOLUME => mim.push(parse_volume(r, start, empty)?),
            _ => unexpected(r, TAG_MATRIX_INDICES_MAP, tag, empty),
        }
    })?;
    Ok(mim)
}

/// <NamedMap>
fn parse_named_map<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<NamedMap> {
    let mut named_map = NamedMap::default();
    walk_children(reader, TAG_NAMED_MAP, empty, |r, tag, _, empty| match tag {
        TAG_METADATA => {
            named_map.metadata = Some(parse_metadata(r, empty)?);
            Ok(())
        }
        TAG_LABEL_TABLE => {
            named_map.label_table = Some(parse_label_table(r, empty)?);
            Ok(())
        }
        TAG_MAP_NAME => {
            named_map.map_name = Some(read_text(r, TAG_MAP_NAME, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_NAMED_MAP, tag, empty),
    })?;
    Ok(named_map)
}

/// <LabelTable>
fn parse_label_table<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<LabelTable> {
    let mut table = LabelTable::new();
    walk_children(reader, TAG_LABEL_TABLE, empty, |r, tag, start, empty| match tag {
        TAG_LABEL => {
            table.append(parse_label(r, start, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_LABEL_TABLE, tag, empty),
    })?;
    Ok(table)
}

/// <Label>
fn parse_label<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Label> {
    let key = parse_int(&require_attr(start, TAG_LABEL, ATTR_KEY)?, ATTR_KEY)?;
    let mut rgba = [0f64; 4];
    for (slot, attr) in rgba.iter_mut().zip(LABEL_COLOR_ATTRS) {
        *slot = parse_float(&require_attr(start, TAG_LABEL, attr)?, attr)?;
    }
    let name = read_text(reader, TAG_LABEL, empty)?;
    Label::new(key, name, rgba[0], rgba[1], rgba[2], rgba[3])
}

/// <Surface>
fn parse_surface<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Surface> {
    let surface = Surface {
        brain_structure: get_attr(start, ATTR_BRAIN_STRUCTURE),
        surface_number_of_vertices: attr_int(start, ATTR_SURFACE_NUMBER_OF_VERTICES)?,
    };
    walk_children(reader, TAG_SURFACE, empty, |r, tag, _, empty| {
        unexpected(r, TAG_SURFACE, tag, empty)
    })?;
    Ok(surface)
}

/// <Parcel>
fn parse_parcel<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Parcel> {
    let mut parcel = Parcel {
        name: get_attr(start, ATTR_NAME),
        ..Parcel::default()
    };
    walk_children(reader, TAG_PARCEL, empty, |r, tag, start, empty| match tag {
        TAG_VOXEL_INDICES_IJK => {
            parcel.voxel_indices_ijk = Some(parse_voxel_indices(r, empty)?);
            Ok(())
        }
        TAG_VERTICES => {
            let mut vertices = Vertices::default();
            vertices.brain_structure = get_attr(start, ATTR_BRAIN_STRUCTURE);
            let text = read_text(r, TAG_VERTICES, empty)?;
            vertices.extend(split_ints(&text, TAG_VERTICES)?)?;
            parcel.append_vertices(vertices);
            Ok(())
        }
        _ => unexpected(r, TAG_PARCEL, tag, empty),
    })?;
    Ok(parcel)
}

/// <VoxelIndicesIJK>
fn parse_voxel_indices<R: BufRead>(reader: &mut Reader<R>, empty: bool) -> Result<VoxelIndicesIJK> {
    let text = read_text(reader, TAG_VOXEL_INDICES_IJK, empty)?;
    let flat = split_ints(&text, TAG_VOXEL_INDICES_IJK)?;
    if flat.len() % 3 != 0 {
        return Err(CiftiError::header(format!(
            "VoxelIndicesIJK holds {} values, which is not a multiple of 3",
            flat.len()
        )));
    }
    VoxelIndicesIJK::from_rows(flat.chunks(3).map(|row| row.to_vec()))
}

/// <BrainModel>
fn parse_brain_model<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<BrainModel> {
    let mut model = BrainModel {
        index_offset: attr_int(start, ATTR_INDEX_OFFSET)?,
        index_count: attr_int(start, ATTR_INDEX_COUNT)?,
        model_type: get_attr(start, ATTR_MODEL_TYPE),
        brain_structure: get_attr(start, ATTR_BRAIN_STRUCTURE),
        surface_number_of_vertices: attr_int(start, ATTR_SURFACE_NUMBER_OF_VERTICES)?,
        ..BrainModel::default()
    };
    walk_children(reader, TAG_BRAIN_MODEL, empty, |r, tag, _, empty| match tag {
        TAG_VOXEL_INDICES_IJK => {
            model.voxel_indices_ijk = Some(parse_voxel_indices(r, empty)?);
            Ok(())
        }
        TAG_VERTEX_INDICES => {
            let text = read_text(r, TAG_VERTEX_INDICES, empty)?;
            model.vertex_indices = Some(VertexIndices::from_values(split_ints(
                &text,
                TAG_VERTEX_INDICES,
            )?)?);
            Ok(())
        }
        _ => unexpected(r, TAG_BRAIN_MODEL, tag, empty),
    })?;
    Ok(model)
}

/// <Volume>
fn parse_volume<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Volume> {
    let mut volume = Volume {
        volume_dimensions: get_attr(start, ATTR_VOLUME_DIMENSIONS)
            .map(|s| split_ints(&s, ATTR_VOLUME_DIMENSIONS).and_then(coerce_triple))
            .transpose()?,
        transformation_matrix: None,
    };
    walk_children(reader, TAG_VOLUME, empty, |r, tag, start, empty| match tag {
        TAG_TRANSFORMATION_MATRIX => {
            volume.transformation_matrix = Some(parse_transformation_matrix(r, start, empty)?);
            Ok(())
        }
        _ => unexpected(r, TAG_VOLUME, tag, empty),
    })?;
    Ok(volume)
}

/// <TransformationMatrixVoxelIndicesIJKtoXYZ>
fn parse_transformation_matrix<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<TransformationMatrix> {
    let meter_exponent = attr_int(start, ATTR_METER_EXPONENT)?;
    let text = read_text(reader, TAG_TRANSFORMATION_MATRIX, empty)?;
    let values = text
        .split_whitespace()
        .map(|s| parse_float(s, TAG_TRANSFORMATION_MATRIX))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != 16 {
        return Err(CiftiError::header(format!(
            "TransformationMatrixVoxelIndicesIJKtoXYZ needs 16 values, got {}",
            values.len()
        )));
    }
    let mut matrix = [[0f64; 4]; 4];
    for (row, chunk) in matrix.iter_mut().zip(values.chunks(4)) {
        row.copy_from_slice(chunk);
    }
    Ok(TransformationMatrix {
        meter_exponent,
        matrix: Some(matrix),
    })
}

/// Parses a complete CIFTI-2 XML document. Trailing NUL padding is ignored.
pub fn parse_cifti_header(xml: &[u8]) -> Result<Cifti2Header> {
    let end = xml.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let mut reader = Reader::from_reader(&xml[..end]);
    let mut buf = Vec::with_capacity(256);

    loop {
        match reader.read_event_into(&mut buf).map_err(CiftiError::xml)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() != TAG_CIFTI.as_bytes() => {
                return Err(CiftiError::header(format!(
                    "root element must be <CIFTI>, found <{}>",
                    tag_name(&e)
                )));
            }
            Event::Start(e) => {
                let header = parse_cifti(&mut reader, &e, false)?;
                log_parsed(&header);
                return Ok(header);
            }
            Event::Empty(e) => {
                let header = parse_cifti(&mut reader, &e, true)?;
                log_parsed(&header);
                return Ok(header);
            }
            Event::Eof => {
                return Err(CiftiError::header("document has no <CIFTI> root element"));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn log_parsed(header: &Cifti2Header) {
    log::debug!(
        "parsed CIFTI-2 header: version {}, {} index maps",
        header.version,
        header.matrix.len()
    );
}

impl Cifti2Header {
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        parse_cifti_header(xml)
    }

    pub fn from_xml_str(xml: &str) -> Result<Self> {
        parse_cifti_header(xml.as_bytes())
    }

    /// True when writing this header, reading the output back and writing again reproduces
    /// the first document byte for byte.
    ///
    /// Trees are not compared: empty optional children are dropped on write and matrix values
    /// are rounded to ten decimals, so a conforming header need not equal its reread copy.
    pub fn rewrite_is_stable(&self, policy: ValidationPolicy) -> Result<bool> {
        let first = self.to_xml_with_policy(policy)?;
        let second = parse_cifti_header(&first)?.to_xml_with_policy(policy)?;
        Ok(first == second)
    }
}
