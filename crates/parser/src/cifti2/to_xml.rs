use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::cifti2::attr_meta::*;
use crate::cifti2::matrix::{
    Cifti2Header, MapElement, Matrix, MatrixIndicesMap, ValidationPolicy,
};
use crate::cifti2::structs::*;
use crate::cifti2::validate::{format_float, join_ints};
use crate::error::{CiftiError, Result};

/// Elements that know how to write themselves as CIFTI-2 XML.
///
/// `write_xml` checks the element's required parts and fails with a header error before
/// anything partial would be emitted for it.
pub trait XmlSerializable {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()>;

    fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        self.write_xml(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn to_xml_string(&self) -> Result<String> {
        Ok(String::from_utf8(self.to_xml()?)?)
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(CiftiError::xml)
}

fn start_tag<'a>(tag: &'a str, attrs: &[(&str, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(tag);
    for (k, v) in attrs {
        start.push_attribute((*k, v.as_str()));
    }
    start
}

/// Writes `<tag ...>` then `body` then `</tag>`, or a self-closing tag when `empty`.
fn write_container<F>(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    attrs: &[(&str, String)],
    empty: bool,
    body: F,
) -> Result<()>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
{
    if empty {
        return emit(writer, Event::Empty(start_tag(tag, attrs)));
    }
    emit(writer, Event::Start(start_tag(tag, attrs)))?;
    body(writer)?;
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    attrs: &[(&str, String)],
    text: &str,
) -> Result<()> {
    write_container(writer, tag, attrs, text.is_empty(), |w| {
        emit(w, Event::Text(BytesText::new(text)))
    })
}

fn format_color(val: f64) -> String {
    if val == 0.0 {
        "0".to_string()
    } else if val == 1.0 {
        "1".to_string()
    } else {
        format_float(val)
    }
}

impl XmlSerializable for MetaData {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        write_container(writer, TAG_METADATA, &[], self.is_empty(), |w| {
            for (name, value) in self.iter() {
                emit(w, Event::Start(BytesStart::new(TAG_MD)))?;
                write_text_element(w, TAG_NAME, &[], name)?;
                write_text_element(w, TAG_VALUE, &[], value)?;
                emit(w, Event::End(BytesEnd::new(TAG_MD)))?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for Label {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        self.validate()?;
        let colors = [self.red, self.green, self.blue, self.alpha];
        let mut attrs = vec![(ATTR_KEY, self.key.to_string())];
        attrs.extend(
            LABEL_COLOR_ATTRS
                .iter()
                .zip(colors)
                .map(|(attr, v)| (*attr, format_color(v))),
        );
        write_text_element(writer, TAG_LABEL, &attrs, &self.label)
    }
}

impl XmlSerializable for LabelTable {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.is_empty() {
            return Err(CiftiError::header(
                "LabelTable element requires at least 1 label",
            ));
        }
        write_container(writer, TAG_LABEL_TABLE, &[], false, |w| {
            for label in self.labels() {
                label.write_xml(w)?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for NamedMap {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let map_name = self.map_name.as_deref().unwrap_or_default();
        write_container(writer, TAG_NAMED_MAP, &[], false, |w| {
            if let Some(md) = self.metadata.as_ref().filter(|m| !m.is_empty()) {
                md.write_xml(w)?;
            }
            if let Some(lt) = self.label_table.as_ref().filter(|t| !t.is_empty()) {
                lt.write_xml(w)?;
            }
            write_text_element(w, TAG_MAP_NAME, &[], map_name)
        })
    }
}

impl XmlSerializable for Surface {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let structure = self.brain_structure.as_ref().ok_or_else(|| {
            CiftiError::header("Surface element requires at least 1 BrainStructure")
        })?;
        let mut attrs = vec![(ATTR_BRAIN_STRUCTURE, structure.clone())];
        if let Some(n) = self.surface_number_of_vertices {
            attrs.push((ATTR_SURFACE_NUMBER_OF_VERTICES, n.to_string()));
        }
        emit(writer, Event::Empty(start_tag(TAG_SURFACE, &attrs)))
    }
}

impl XmlSerializable for VoxelIndicesIJK {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.is_empty() {
            return Err(CiftiError::header(
                "VoxelIndicesIJK element require an index table",
            ));
        }
        let text = self
            .iter()
            .map(|row| join_ints(row, " "))
            .collect::<Vec<_>>()
            .join("\n");
        write_text_element(writer, TAG_VOXEL_INDICES_IJK, &[], &text)
    }
}

impl XmlSerializable for Vertices {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let structure = self
            .brain_structure
            .as_ref()
            .ok_or_else(|| CiftiError::header("Vertices element require a BrainStructure"))?;
        let attrs = [(ATTR_BRAIN_STRUCTURE, structure.clone())];
        write_text_element(writer, TAG_VERTICES, &attrs, &join_ints(self.iter(), " "))
    }
}

impl XmlSerializable for VertexIndices {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.is_empty() {
            return Err(CiftiError::header("VertexIndices element requires indices"));
        }
        write_text_element(writer, TAG_VERTEX_INDICES, &[], &join_ints(self.iter(), " "))
    }
}

impl XmlSerializable for TransformationMatrix {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let matrix = self.matrix.as_ref().ok_or_else(|| {
            CiftiError::header(
                "TransformationMatrixVoxelIndicesIJKtoXYZ element requires a matrix",
            )
        })?;
        let mut attrs = Vec::new();
        if let Some(exp) = self.meter_exponent {
            attrs.push((ATTR_METER_EXPONENT, exp.to_string()));
        }
        let text = matrix
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{v:.10}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        write_text_element(writer, TAG_TRANSFORMATION_MATRIX, &attrs, &text)
    }
}

impl XmlSerializable for Volume {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let dims = self
            .volume_dimensions
            .as_ref()
            .ok_or_else(|| CiftiError::header("Volume element requires dimensions"))?;
        let transform = self.transformation_matrix.as_ref().ok_or_else(|| {
            CiftiError::header(
                "Volume element requires a TransformationMatrixVoxelIndicesIJKtoXYZ",
            )
        })?;
        let attrs = [(ATTR_VOLUME_DIMENSIONS, join_ints(dims, ","))];
        write_container(writer, TAG_VOLUME, &attrs, false, |w| transform.write_xml(w))
    }
}

impl XmlSerializable for Parcel {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let name = self
            .name
            .as_ref()
            .ok_or_else(|| CiftiError::header("Parcel element requires a name"))?;
        let voxels = self.voxel_indices_ijk.as_ref().filter(|v| !v.is_empty());
        let empty = voxels.is_none() && self.vertices.is_empty();
        let attrs = [(ATTR_NAME, name.clone())];
        write_container(writer, TAG_PARCEL, &attrs, empty, |w| {
            if let Some(v) = voxels {
                v.write_xml(w)?;
            }
            for v in &self.vertices {
                v.write_xml(w)?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for BrainModel {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let values = [
            self.index_offset.map(|v| v.to_string()),
            self.index_count.map(|v| v.to_string()),
            self.model_type.clone(),
            self.brain_structure.clone(),
            self.surface_number_of_vertices.map(|v| v.to_string()),
        ];
        let attrs: Vec<(&str, String)> = BRAIN_MODEL_ATTRS
            .iter()
            .zip(values)
            .filter_map(|(attr, v)| v.map(|v| (*attr, v)))
            .collect();
        let voxels = self.voxel_indices_ijk.as_ref().filter(|v| !v.is_empty());
        let vertices = self.vertex_indices.as_ref().filter(|v| !v.is_empty());
        let empty = voxels.is_none() && vertices.is_none();
        write_container(writer, TAG_BRAIN_MODEL, &attrs, empty, |w| {
            if let Some(v) = voxels {
                v.write_xml(w)?;
            }
            if let Some(v) = vertices {
                v.write_xml(w)?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for MapElement {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        match self {
            MapElement::NamedMap(v) => v.write_xml(writer),
            MapElement::Surface(v) => v.write_xml(writer),
            MapElement::Parcel(v) => v.write_xml(writer),
            MapElement::BrainModel(v) => v.write_xml(writer),
            MapElement::Volume(v) => v.write_xml(writer),
        }
    }
}

impl XmlSerializable for MatrixIndicesMap {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let dims = self.applies_to_matrix_dimension.as_ref().ok_or_else(|| {
            CiftiError::header(
                "MatrixIndicesMap element requires to be applied to at least 1 dimension",
            )
        })?;
        let values = [
            self.indices_map_to_data_type.clone(),
            self.number_of_series_points.map(|v| v.to_string()),
            self.series_exponent.map(|v| v.to_string()),
            self.series_start.map(format_float),
            self.series_step.map(format_float),
            self.series_unit.clone(),
        ];
        let mut attrs = vec![(ATTR_APPLIES_TO_MATRIX_DIMENSION, join_ints(dims, ","))];
        attrs.extend(
            MATRIX_INDICES_MAP_ATTRS
                .iter()
                .zip(values)
                .filter_map(|(attr, v)| v.map(|v| (*attr, v))),
        );
        write_container(writer, TAG_MATRIX_INDICES_MAP, &attrs, self.is_empty(), |w| {
            for m in self.iter() {
                m.write_xml(w)?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for Matrix {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.is_empty() && self.metadata.is_none() {
            return Err(CiftiError::header(
                "Matrix element requires either a MatrixIndicesMap or a Metadata element",
            ));
        }
        let metadata = self.metadata.as_ref().filter(|m| !m.is_empty());
        let empty = metadata.is_none() && self.is_empty();
        write_container(writer, TAG_MATRIX, &[], empty, |w| {
            if let Some(md) = metadata {
                md.write_xml(w)?;
            }
            for m in self.iter() {
                m.write_xml(w)?;
            }
            Ok(())
        })
    }
}

impl XmlSerializable for Cifti2Header {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let attrs = [(ATTR_VERSION, self.version.clone())];
        write_container(writer, TAG_CIFTI, &attrs, false, |w| self.matrix.write_xml(w))
    }

    /// Full document: XML declaration, newline, then the `<CIFTI>` root.
    fn to_xml(&self) -> Result<Vec<u8>> {
        self.to_xml_with_policy(ValidationPolicy::Permissive)
    }
}

impl Cifti2Header {
    pub fn to_xml_with_policy(&self, policy: ValidationPolicy) -> Result<Vec<u8>> {
        self.validate(policy)?;
        let mut writer = Writer::new(Vec::new());
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        emit(&mut writer, Event::Text(BytesText::new("\n")))?;
        self.write_xml(&mut writer)?;
        log::debug!(
            "serialized CIFTI-2 header ({} bytes, {} index maps)",
            writer.get_ref().len(),
            self.matrix.len()
        );
        Ok(writer.into_inner())
    }
}
