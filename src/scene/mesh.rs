//! Vertex layouts and mesh buffers.
//!
//! A [`MeshFormat`] lists vertex attributes; each attribute lives in one
//! binding (buffer) at a byte offset within that binding's vertex stride.
//! [`MeshData`] owns one little-endian buffer per binding plus a 32-bit index
//! buffer.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::util::{AttributeDataType, AttributePod, Endian, Error, Result};

/// One vertex attribute of a [`MeshFormat`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttributeFormat {
    pub data_type: AttributeDataType,
    /// Elements per vertex (1-4).
    pub element_count: u8,
    pub name: String,
    pub binding: u32,
    /// Byte offset inside the binding's vertex stride.
    pub offset: u32,
}

impl VertexAttributeFormat {
    #[inline]
    pub fn size(&self) -> usize {
        self.data_type.num_bytes() * self.element_count as usize
    }
}

/// Ordered vertex layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshFormat {
    attributes: Vec<VertexAttributeFormat>,
    strides: Vec<u32>,
}

impl MeshFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute at the end of its binding.
    pub fn push(
        &mut self,
        data_type: AttributeDataType,
        element_count: u8,
        name: impl Into<String>,
        binding: u32,
    ) -> &mut Self {
        let b = binding as usize;
        if self.strides.len() <= b {
            self.strides.resize(b + 1, 0);
        }
        let offset = self.strides[b];
        let attr = VertexAttributeFormat {
            data_type,
            element_count,
            name: name.into(),
            binding,
            offset,
        };
        self.strides[b] += attr.size() as u32;
        self.attributes.push(attr);
        self
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttributeFormat] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttributeFormat> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Number of buffers this layout spans.
    #[inline]
    pub fn num_bindings(&self) -> usize {
        self.strides.len()
    }

    /// Bytes per vertex in `binding` (zero for unused bindings).
    pub fn stride(&self, binding: u32) -> usize {
        self.strides.get(binding as usize).copied().unwrap_or(0) as usize
    }

    /// Identity string: type, count, name, binding and offset of every
    /// attribute, in order. Equal keys mean interchangeable formats.
    pub fn hash_key(&self) -> String {
        let mut key = String::new();
        for a in &self.attributes {
            let _ = write!(
                key,
                "{}:{}:{}:{}:{};",
                a.data_type.name(),
                a.element_count,
                a.name,
                a.binding,
                a.offset
            );
        }
        key
    }
}

/// Vertex and index data of one mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    format: Arc<MeshFormat>,
    vertex_count: usize,
    buffers: Vec<Vec<u8>>,
    indices: Vec<i32>,
}

impl MeshData {
    /// Zero-filled buffers sized for `vertex_count` vertices.
    pub fn new(format: Arc<MeshFormat>, vertex_count: usize) -> Self {
        let buffers = (0..format.num_bindings() as u32)
            .map(|b| vec![0u8; format.stride(b) * vertex_count])
            .collect();
        Self { format, vertex_count, buffers, indices: Vec::new() }
    }

    #[inline]
    pub fn format(&self) -> &Arc<MeshFormat> {
        &self.format
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn buffers(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Little-endian bytes of one binding.
    pub fn buffer(&self, binding: u32) -> Option<&[u8]> {
        self.buffers.get(binding as usize).map(|b| b.as_slice())
    }

    pub fn buffer_mut(&mut self, binding: u32) -> Option<&mut [u8]> {
        self.buffers.get_mut(binding as usize).map(|b| b.as_mut_slice())
    }

    #[inline]
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    pub fn set_indices(&mut self, indices: Vec<i32>) {
        self.indices = indices;
    }

    /// Index buffer as raw bytes in host order (for upload).
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Copy matching attributes out of source buffers.
    ///
    /// `sources[b]` holds the bytes of binding `b` of `src_format`, in the
    /// given byte order. Every destination attribute takes its values from the
    /// source attribute of the same name, converting element types with plain
    /// numeric casts. Destination attributes without a source stay zeroed.
    pub fn copy_from(&mut self, src_format: &MeshFormat, sources: &[&[u8]], src_endian: Endian) -> Result<()> {
        let format = Arc::clone(&self.format);
        for dst in format.attributes() {
            let Some(src) = src_format.attribute(&dst.name) else {
                continue;
            };
            let src_buf = sources.get(src.binding as usize).copied().ok_or_else(|| {
                Error::FormatMismatch(format!("no source buffer for binding {} ({})", src.binding, src.name))
            })?;
            let src_stride = src_format.stride(src.binding);
            let needed = src_stride.saturating_mul(self.vertex_count);
            if src_buf.len() < needed {
                return Err(Error::FormatMismatch(format!(
                    "attribute {} needs {} bytes for {} vertices, stream has {}",
                    src.name,
                    needed,
                    self.vertex_count,
                    src_buf.len()
                )));
            }

            let dst_stride = format.stride(dst.binding);
            let src_elem = src.data_type.num_bytes();
            let dst_elem = dst.data_type.num_bytes();
            let count = dst.element_count.min(src.element_count) as usize;
            let Some(dst_buf) = self.buffers.get_mut(dst.binding as usize) else {
                continue;
            };

            for v in 0..self.vertex_count {
                let s = v * src_stride + src.offset as usize;
                let d = v * dst_stride + dst.offset as usize;
                for e in 0..count {
                    let s = s + e * src_elem;
                    let d = d + e * dst_elem;
                    src.data_type.convert(
                        &src_buf[s..s + src_elem],
                        src_endian,
                        dst.data_type,
                        &mut dst_buf[d..d + dst_elem],
                        Endian::Little,
                    );
                }
            }
        }
        Ok(())
    }

    /// Values of one attribute converted to `T`, `element_count` per vertex.
    pub fn read_attribute<T: AttributePod>(&self, name: &str) -> Option<Vec<T>> {
        let attr = self.format.attribute(name)?;
        let buf = self.buffer(attr.binding)?;
        let stride = self.format.stride(attr.binding);
        let elem = attr.data_type.num_bytes();
        let out_size = T::DATA_TYPE.num_bytes();

        let mut out = Vec::with_capacity(self.vertex_count * attr.element_count as usize);
        let mut tmp = vec![0u8; out_size];
        for v in 0..self.vertex_count {
            for e in 0..attr.element_count as usize {
                let s = v * stride + attr.offset as usize + e * elem;
                attr.data_type.convert(&buf[s..s + elem], Endian::Little, T::DATA_TYPE, &mut tmp, Endian::NATIVE);
                out.push(bytemuck::pod_read_unaligned(&tmp));
            }
        }
        Some(out)
    }

    /// Overwrite one attribute from host values (`element_count` per vertex).
    pub fn write_attribute<T: AttributePod>(&mut self, name: &str, values: &[T]) -> Result<()> {
        let attr = self
            .format
            .attribute(name)
            .cloned()
            .ok_or_else(|| Error::FormatMismatch(format!("no attribute {}", name)))?;
        let per_vertex = attr.element_count as usize;
        if values.len() != self.vertex_count * per_vertex {
            return Err(Error::FormatMismatch(format!(
                "{} values for {} vertices of {}x{}",
                values.len(),
                self.vertex_count,
                per_vertex,
                attr.data_type
            )));
        }
        let stride = self.format.stride(attr.binding);
        let elem = attr.data_type.num_bytes();
        let Some(buf) = self.buffers.get_mut(attr.binding as usize) else {
            return Ok(());
        };
        for (i, value) in values.iter().enumerate() {
            let (v, e) = (i / per_vertex, i % per_vertex);
            let d = v * stride + attr.offset as usize + e * elem;
            T::DATA_TYPE.convert(
                bytemuck::bytes_of(value),
                Endian::NATIVE,
                attr.data_type,
                &mut buf[d..d + elem],
                Endian::Little,
            );
        }
        Ok(())
    }
}

/// Decode an index stream into 32-bit signed indices.
///
/// Reads element 0 of component 0 of each of the first `count` elements.
pub fn read_indices(
    data: &[u8],
    endian: Endian,
    data_type: AttributeDataType,
    stride: usize,
    count: usize,
) -> Result<Vec<i32>> {
    let elem = data_type.num_bytes();
    if elem == 0 || stride < elem {
        return Err(Error::UnsupportedComponentFormat(format!("index stream of {}", data_type)));
    }
    let fits = match count.checked_sub(1) {
        None => true,
        Some(last) => last
            .checked_mul(stride)
            .and_then(|n| n.checked_add(elem))
            .is_some_and(|n| n <= data.len()),
    };
    if !fits {
        return Err(Error::FormatMismatch(format!(
            "{} indices need more than the {} bytes in the stream",
            count,
            data.len()
        )));
    }
    let mut out = Vec::with_capacity(count);
    let mut tmp = [0u8; 4];
    for i in 0..count {
        let s = i * stride;
        data_type.convert(&data[s..s + elem], endian, AttributeDataType::Int32, &mut tmp, Endian::Little);
        out.push(i32::from_le_bytes(tmp));
    }
    Ok(out)
}
