use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::buffer::{Accessor, BufferView};

/// The subset of the glTF JSON document this crate reads and writes. Members
/// it does not model are kept in `others` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfDocument {
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

impl GltfDocument {
    /// Appends `name` to `extensionsUsed` unless it is already listed.
    pub fn use_extension(&mut self, name: &str) {
        push_unique(&mut self.extensions_used, name);
    }

    /// Appends `name` to `extensionsRequired` unless it is already listed.
    pub fn require_extension(&mut self, name: &str) {
        push_unique(&mut self.extensions_required, name);
    }
}

pub(crate) fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_owned());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_owned(),
            generator: None,
            others: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<usize>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

/// Topology of a primitive.
pub const MODE_TRIANGLES: u32 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: IndexMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

impl Primitive {
    pub fn mode(&self) -> u32 {
        self.mode.unwrap_or(MODE_TRIANGLES)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub others: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_members_survive() {
        let json = serde_json::json!({
            "asset": { "version": "2.0", "copyright": "someone" },
            "extensionsUsed": ["KHR_materials_unlit"],
            "materials": [{ "name": "red" }],
            "meshes": [{
                "name": "box",
                "primitives": [{
                    "attributes": { "POSITION": 0, "NORMAL": 1 },
                    "targets": [],
                    "extensions": { "KHR_foo": { "a": 1 } }
                }]
            }]
        });
        let document: GltfDocument = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(document.asset.others["copyright"], "someone");
        assert!(document.others.contains_key("materials"));
        let primitive = &document.meshes[0].primitives[0];
        assert_eq!(primitive.mode(), MODE_TRIANGLES);
        assert_eq!(primitive.attributes.keys().collect::<Vec<_>>(), ["POSITION", "NORMAL"]);
        assert!(primitive.others.contains_key("targets"));

        assert_eq!(serde_json::to_value(&document).unwrap(), json);
    }

    #[test]
    fn extension_lists_are_sets() {
        let mut document = GltfDocument::default();
        document.use_extension("EXT_a");
        document.use_extension("EXT_a");
        document.require_extension("EXT_a");
        document.require_extension("EXT_a");
        assert_eq!(document.extensions_used, vec!["EXT_a"]);
        assert_eq!(document.extensions_required, vec!["EXT_a"]);
    }
}
