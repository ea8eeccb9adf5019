use std::io::Cursor;
use std::path::PathBuf;

use bmesh_gltf::io::gltf::summarize;
use bmesh_gltf::io::obj;
use bmesh_gltf::prelude::*;

const CUBE_AND_FAN: &str = "\
o cube
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
v 0 0 1
v 1 0 1
v 0 1 1
v 1 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 3/4 4/3 2/2
f 5/1 6/2 8/3 7/4
f 1/1 2/2 6/3 5/4
f 3/1 7/2 8/3 4/4
f 1/1 5/2 7/3 3/4
f 2/1 4/2 8/3 6/4
o fan
v 0 0 3
v 1 0 3
v 0 1 3
v -1 0 3
f 9 10 11
f 9 11 12
";

fn load() -> Vec<PolygonMesh> {
    obj::load_obj_buf(&mut Cursor::new(CUBE_AND_FAN)).unwrap()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bmesh-gltf-{}-{}", std::process::id(), name))
}

#[test]
fn obj_meshes_survive_gltf() {
    let meshes = load();
    assert_eq!(meshes.len(), 2);
    assert!(meshes[0].has_ngons());
    assert!(!meshes[1].has_ngons());

    let asset = GltfExporter::default().export(&meshes).unwrap();
    let imported = GltfImporter::default().import(&asset);
    assert_eq!(imported.len(), 2);
    // the cube comes back with its quads and UVs, the triangle fan from plain geometry
    assert_eq!(imported[0], meshes[0]);
    assert_eq!(imported[1].faces(), meshes[1].faces());
    assert_eq!(imported[1].positions(), meshes[1].positions());

    let summary = summarize(&asset);
    assert_eq!(summary[0].topology, Some([8, 12, 24, 6]));
    assert_eq!(summary[1].topology, None);
    assert_eq!(summary[1].triangles, 2);
}

#[test]
fn extension_is_declared_once() {
    let cube = load().remove(0);
    let mut copies = Vec::new();
    for i in 0..4 {
        let mut mesh = cube.clone();
        mesh.set_name(&format!("cube{}", i));
        copies.push(mesh);
    }
    let asset = GltfExporter::default().export(&copies).unwrap();
    assert_eq!(asset.document.extensions_used, vec![EXTENSION_NAME.to_owned()]);
    assert!(asset.document.extensions_required.is_empty());
}

#[test]
fn corrupt_extension_falls_back_to_plain_geometry() {
    let cube = load().remove(0);
    let mut asset = GltfExporter::default().export(&[cube.clone(), cube.clone()]).unwrap();
    let block = asset.document.meshes[0].primitives[0]
        .extensions
        .get_mut(EXTENSION_NAME)
        .unwrap();
    block["loops"]["topology_vertex"] = serde_json::json!(9999);

    let imported = GltfImporter::default().import(&asset);
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[0].num_faces(), 12);
    assert!(!imported[0].has_ngons());
    assert_eq!(imported[0].positions(), cube.positions());
    assert_eq!(imported[1].faces(), cube.faces());
}

#[test]
fn oversized_counts_fall_back_to_plain_geometry() {
    let cube = load().remove(0);
    for section in ["vertices", "edges", "loops", "faces"] {
        let mut asset = GltfExporter::default().export(&[cube.clone()]).unwrap();
        let block = asset.document.meshes[0].primitives[0]
            .extensions
            .get_mut(EXTENSION_NAME)
            .unwrap();
        block[section]["count"] = serde_json::json!(u64::MAX);

        let imported = GltfImporter::default().import(&asset);
        assert_eq!(imported.len(), 1, "{}", section);
        assert_eq!(imported[0].num_faces(), 12, "{}", section);
        assert_eq!(imported[0].positions(), cube.positions(), "{}", section);
    }
}

#[test]
fn malformed_extension_block_falls_back() {
    let cube = load().remove(0);
    let mut asset = GltfExporter::default().export(&[cube]).unwrap();
    let block = asset.document.meshes[0].primitives[0]
        .extensions
        .get_mut(EXTENSION_NAME)
        .unwrap();
    block.as_object_mut().unwrap().remove("faces");

    let imported = GltfImporter::default().import(&asset);
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].num_faces(), 12);
}

#[test]
fn glb_file_round_trip() {
    let meshes = load();
    let asset = GltfExporter::default().export(&meshes).unwrap();
    let path = temp_path("round_trip.glb");
    asset.write(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"glTF");
    let read = GltfAsset::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(read.document.meshes, asset.document.meshes);
    assert_eq!(read.buffers, asset.buffers);
    assert_eq!(GltfImporter::default().import(&read)[0], meshes[0]);
}

#[test]
fn gltf_file_round_trip() {
    let meshes = load();
    let asset = GltfExporter::default().export(&meshes).unwrap();
    let path = temp_path("round_trip.gltf");
    asset.write(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("data:application/octet-stream;base64,"));
    assert!(text.contains(EXTENSION_NAME));
    let read = GltfAsset::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(read.buffers, asset.buffers);
    assert_eq!(GltfImporter::default().import(&read)[0], meshes[0]);
}

#[test]
fn external_buffer_is_resolved_next_to_the_file() {
    let meshes = load();
    let asset = GltfExporter::default().export(&meshes).unwrap();
    let dir = temp_path("external");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("scene.bin"), &asset.buffers[0]).unwrap();

    let mut document = asset.document.clone();
    document.buffers[0].uri = Some("scene.bin".to_owned());
    std::fs::write(dir.join("scene.gltf"), serde_json::to_vec(&document).unwrap()).unwrap();

    let read = GltfAsset::read(&dir.join("scene.gltf")).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!(read.buffers, asset.buffers);
    assert_eq!(GltfImporter::default().import(&read)[0], meshes[0]);
}

#[test]
fn imported_meshes_write_back_to_obj() {
    let asset = GltfExporter::default().export(&load()).unwrap();
    let imported = GltfImporter::default().import(&asset);

    let mut out = Vec::new();
    obj::write_obj(&imported, &mut out).unwrap();
    let again = obj::load_obj_buf(&mut Cursor::new(out)).unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(again[0].faces(), imported[0].faces());
    assert_eq!(again[0].tex_coords(0), imported[0].tex_coords(0));
}
