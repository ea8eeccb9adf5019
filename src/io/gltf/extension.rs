use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EXTENSION_NAME: &str = "EXT_mesh_bmesh";

/// The `EXT_mesh_bmesh` block attached to a mesh primitive. Every value other
/// than a `count` is an accessor index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtMeshBmesh {
    pub vertices: VertexData,
    pub edges: EdgeData,
    pub loops: LoopData,
    pub faces: FaceData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VertexData {
    pub count: usize,
    /// VEC3 float.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<usize>,
    /// Flattened vertex to edge adjacency, SCALAR uint32.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<usize>,
    /// `CREASE`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EdgeData {
    pub count: usize,
    /// Endpoint pairs, `2 * count` SCALAR uint32 values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<usize>,
    /// Flattened edge to face adjacency, SCALAR uint32.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<usize>,
    /// `CREASE`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, usize>,
}

/// Seven parallel SCALAR uint32 arrays, one element per loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoopData {
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_vertex: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_edge: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_face: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_next: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_prev: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_radial_next: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_radial_prev: Option<usize>,
    /// `TEXCOORD_n` (VEC2 float) and `COLOR_n` (VEC3 float).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceData {
    pub count: usize,
    /// Flattened face vertex lists, SCALAR uint32.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<usize>,
    /// VEC3 uint32 `[vertexStart, edgeStart, loopStart]` per face.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loops: Option<usize>,
    /// VEC3 float.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<usize>,
    /// `HOLES` (SCALAR uint8)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, usize>,
}

pub const CREASE: &str = "CREASE";
pub const HOLES: &str = "HOLES";

pub fn tex_coord_name(layer: usize) -> String {
    format!("TEXCOORD_{}", layer)
}

pub fn color_name(layer: usize) -> String {
    format!("COLOR_{}", layer)
}

/// Parses `<prefix><digits>` into the layer number.
pub fn parse_layer(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_loop_attribute(name: &str) -> bool {
    parse_layer(name, "TEXCOORD_").is_some() || parse_layer(name, "COLOR_").is_some()
}

impl ExtMeshBmesh {
    /// Checks attribute names against the names each section allows.
    pub fn validate(&self) -> Result<(), Err> {
        let sections: [(&'static str, &BTreeMap<String, usize>, fn(&str) -> bool); 4] = [
            ("vertices", &self.vertices.attributes, |n| n == CREASE),
            ("edges", &self.edges.attributes, |n| n == CREASE),
            ("loops", &self.loops.attributes, is_loop_attribute),
            ("faces", &self.faces.attributes, |n| n == HOLES),
        ];
        for (section, attributes, allowed) in sections {
            if let Some(name) = attributes.keys().find(|n| !allowed(n)) {
                return Err(Err::InvalidAttributeName {
                    section,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Every accessor index the block refers to.
    pub fn accessor_indices(&self) -> Vec<usize> {
        let v = &self.vertices;
        let e = &self.edges;
        let l = &self.loops;
        let f = &self.faces;
        [
            v.positions,
            v.edges,
            e.vertices,
            e.faces,
            l.topology_vertex,
            l.topology_edge,
            l.topology_face,
            l.topology_next,
            l.topology_prev,
            l.topology_radial_next,
            l.topology_radial_prev,
            f.vertices,
            f.offsets,
            f.edges,
            f.loops,
            f.normals,
        ]
        .into_iter()
        .flatten()
        .chain(v.attributes.values().copied())
        .chain(e.attributes.values().copied())
        .chain(l.attributes.values().copied())
        .chain(f.attributes.values().copied())
        .collect()
    }
}

#[remain::sorted]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Err {
    #[error("Attribute '{name}' is not allowed in the {section} section")]
    InvalidAttributeName { section: &'static str, name: String },
}

/// The JSON schema of the extension block.
pub fn json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ExtMeshBmesh)
}
