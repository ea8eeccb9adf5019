use std::fs;
use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};

use crate::core::buffer::AccessorReader;

use super::document::GltfDocument;
use super::Err;

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// A glTF document together with the contents of its buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GltfAsset {
    pub document: GltfDocument,
    /// `buffers[i]` holds the bytes of `document.buffers[i]`.
    pub buffers: Vec<Vec<u8>>,
}

impl GltfAsset {
    pub fn reader(&self) -> AccessorReader<'_> {
        AccessorReader::new(&self.document.accessors, &self.document.buffer_views, &self.buffers)
    }

    /// Reads a `.glb` or `.gltf` file. External buffer URIs are resolved
    /// relative to the file's directory.
    pub fn read(path: &Path) -> Result<Self, Err> {
        let data = fs::read(path)?;
        if data.starts_with(b"glTF") {
            Self::from_glb(&data)
        } else {
            Self::from_gltf(&data, path.parent())
        }
    }

    /// Writes the asset as GLB if `path` ends in `.glb`, and as `.gltf` JSON
    /// with embedded buffers otherwise.
    pub fn write(&self, path: &Path) -> Result<(), Err> {
        let is_glb = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("glb"));
        let data = if is_glb { self.to_glb()? } else { self.to_gltf()? };
        fs::write(path, data)?;
        Ok(())
    }

    pub fn from_glb(data: &[u8]) -> Result<Self, Err> {
        let glb = gltf::Glb::from_slice(data)?;
        let document: GltfDocument = serde_json::from_slice(&glb.json)?;
        let bin = glb.bin.map(|b| b.into_owned());
        let buffers = load_buffers(&document, bin, None)?;
        Ok(Self { document, buffers })
    }

    pub fn from_gltf(json: &[u8], base_dir: Option<&Path>) -> Result<Self, Err> {
        let document: GltfDocument = serde_json::from_slice(json)?;
        let buffers = load_buffers(&document, None, base_dir)?;
        Ok(Self { document, buffers })
    }

    /// GLB container bytes. Buffer 0 becomes the BIN chunk; any further
    /// buffers are embedded as data URIs.
    pub fn to_glb(&self) -> Result<Vec<u8>, Err> {
        let mut document = self.document.clone();
        for (i, (buffer, data)) in document.buffers.iter_mut().zip(&self.buffers).enumerate() {
            buffer.byte_length = data.len();
            buffer.uri = (i > 0).then(|| data_uri(data));
        }
        let json = serde_json::to_vec(&document)?;
        let bin = self.buffers.first().map_or(&[][..], Vec::as_slice);

        let mut out = Vec::with_capacity(28 + json.len() + bin.len());
        write_glb(&mut out, &json, bin)?;
        Ok(out)
    }

    /// `.gltf` JSON with every buffer embedded as a base64 data URI.
    pub fn to_gltf(&self) -> Result<Vec<u8>, Err> {
        let mut document = self.document.clone();
        for (buffer, data) in document.buffers.iter_mut().zip(&self.buffers) {
            buffer.byte_length = data.len();
            buffer.uri = Some(data_uri(data));
        }
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

fn data_uri(data: &[u8]) -> String {
    format!("{}{}", DATA_URI_PREFIX, general_purpose::STANDARD.encode(data))
}

fn load_buffers(document: &GltfDocument, mut bin: Option<Vec<u8>>, base_dir: Option<&Path>) -> Result<Vec<Vec<u8>>, Err> {
    let mut out = Vec::with_capacity(document.buffers.len());
    for (i, buffer) in document.buffers.iter().enumerate() {
        let mut data = match &buffer.uri {
            None if i == 0 => bin.take().ok_or_else(|| Err::InvalidUri("buffer 0 has no BIN chunk".to_owned()))?,
            None => return Err(Err::InvalidUri(format!("buffer {} has no uri", i))),
            Some(uri) if uri.starts_with("data:") => {
                let (header, payload) = uri
                    .split_once(',')
                    .ok_or_else(|| Err::InvalidUri(format!("malformed data uri in buffer {}", i)))?;
                if !header.ends_with(";base64") {
                    return Err(Err::InvalidUri(format!("buffer {} is not base64 encoded", i)));
                }
                general_purpose::STANDARD.decode(payload)?
            }
            Some(uri) => {
                let dir = base_dir.ok_or_else(|| Err::InvalidUri(format!("cannot resolve '{}' without a base directory", uri)))?;
                fs::read(dir.join(uri))?
            }
        };
        if data.len() < buffer.byte_length {
            log::warn!("Buffer {} has {} bytes, expected {}", i, data.len(), buffer.byte_length);
        }
        // the BIN chunk may carry padding beyond byteLength
        data.truncate(buffer.byte_length);
        out.push(data);
    }
    Ok(out)
}

/// Writes a GLB container: header, JSON chunk padded with spaces and an
/// optional BIN chunk padded with zeros.
fn write_glb<W: Write>(writer: &mut W, json: &[u8], bin: &[u8]) -> Result<(), Err> {
    let json_padded = (json.len() + 3) & !3;
    let bin_padded = (bin.len() + 3) & !3;
    let total = 12 + 8 + json_padded + if bin.is_empty() { 0 } else { 8 + bin_padded };
    let total = u32::try_from(total).map_err(|_| Err::GlbTooLarge(total))?;

    writer.write_all(b"glTF")?;
    writer.write_all(&2u32.to_le_bytes())?;
    writer.write_all(&total.to_le_bytes())?;

    writer.write_all(&(json_padded as u32).to_le_bytes())?;
    writer.write_all(b"JSON")?;
    writer.write_all(json)?;
    writer.write_all(&b"   "[..json_padded - json.len()])?;

    if !bin.is_empty() {
        writer.write_all(&(bin_padded as u32).to_le_bytes())?;
        writer.write_all(b"BIN\0")?;
        writer.write_all(bin)?;
        writer.write_all(&[0u8; 3][..bin_padded - bin.len()])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gltf::document::Buffer;

    fn asset(bytes: &[u8]) -> GltfAsset {
        let mut document = GltfDocument::default();
        document.buffers.push(Buffer {
            byte_length: bytes.len(),
            ..Default::default()
        });
        GltfAsset {
            document,
            buffers: vec![bytes.to_vec()],
        }
    }

    #[test]
    fn glb_round_trip() {
        let original = asset(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let glb = original.to_glb().unwrap();
        assert_eq!(&glb[..4], b"glTF");
        assert_eq!(glb.len() % 4, 0);
        assert_eq!(u32::from_le_bytes([glb[8], glb[9], glb[10], glb[11]]) as usize, glb.len());
        assert_eq!(GltfAsset::from_glb(&glb).unwrap(), original);
    }

    #[test]
    fn gltf_embeds_buffers() {
        let original = asset(&[9, 8, 7, 6]);
        let json = original.to_gltf().unwrap();
        let text = String::from_utf8(json.clone()).unwrap();
        assert!(text.contains(DATA_URI_PREFIX));

        let read = GltfAsset::from_gltf(&json, None).unwrap();
        assert_eq!(read.buffers, original.buffers);
    }

    #[test]
    fn external_buffer_needs_base_dir() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4,"uri":"data.bin"}]}"#;
        assert!(matches!(GltfAsset::from_gltf(json, None), Err(Err::InvalidUri(_))));
    }

    #[test]
    fn glb_without_bin_chunk() {
        let glb = GltfAsset::default().to_glb().unwrap();
        let read = GltfAsset::from_glb(&glb).unwrap();
        assert!(read.buffers.is_empty());
    }
}
