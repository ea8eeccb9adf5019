use std::fmt::Debug;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::core::mesh::builder::{self, MeshBuilder};
use crate::core::mesh::PolygonMesh;
use crate::core::shared::{Vec2, Vec3};

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Face arities cover {covered} corners but the model has {corners}")]
    ArityMismatch { covered: usize, corners: usize },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("OBJ load error: {0}")]
    LoadError(#[from] tobj::LoadError),
    #[error("Mesh builder error: {0}")]
    MeshBuilderError(#[from] builder::Err),
}

// polygons are kept as they are; texture coordinates keep their own indices
fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: false,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Loads every model of an OBJ file as a polygon mesh. Texture coordinates
/// become `TEXCOORD_0` and vertex colors become `COLOR_0`, both per corner.
pub fn load_obj<P: AsRef<Path> + Debug>(path: P) -> Result<Vec<PolygonMesh>, Err> {
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    models.iter().map(to_mesh).collect()
}

/// Like [`load_obj`], reading OBJ text from `reader`. Material libraries are
/// not loaded.
pub fn load_obj_buf<R: BufRead>(reader: &mut R) -> Result<Vec<PolygonMesh>, Err> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| Err(tobj::LoadError::GenericFailure))?;
    models.iter().map(to_mesh).collect()
}

fn to_mesh(model: &tobj::Model) -> Result<PolygonMesh, Err> {
    let mesh = &model.mesh;
    let positions = mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]);

    // an empty arity list means every face is a triangle
    let arities: Vec<usize> = if mesh.face_arities.is_empty() {
        vec![3; mesh.indices.len() / 3]
    } else {
        mesh.face_arities.iter().map(|&a| a as usize).collect()
    };
    let covered: usize = arities.iter().sum();
    if covered != mesh.indices.len() {
        return Err(Err::ArityMismatch {
            covered,
            corners: mesh.indices.len(),
        });
    }

    let mut builder = MeshBuilder::new();
    builder.set_name(&model.name);
    builder.add_vertices(positions);
    let mut start = 0;
    for arity in arities {
        builder.add_face(mesh.indices[start..start + arity].iter().map(|&i| i as usize).collect());
        start += arity;
    }

    if !mesh.texcoords.is_empty() && mesh.texcoord_indices.len() == mesh.indices.len() {
        let tex_coords: Vec<Vec2> = mesh
            .texcoord_indices
            .iter()
            .map(|&t| {
                let t = t as usize * 2;
                match mesh.texcoords.get(t..t + 2) {
                    Some(uv) => [uv[0], uv[1]],
                    None => [0.0; 2],
                }
            })
            .collect();
        builder.set_tex_coords(0, tex_coords);
    }

    if !mesh.vertex_color.is_empty() {
        let colors: Vec<Vec3> = mesh
            .indices
            .iter()
            .map(|&v| {
                let v = v as usize * 3;
                match mesh.vertex_color.get(v..v + 3) {
                    Some(c) => [c[0], c[1], c[2]],
                    None => [0.0; 3],
                }
            })
            .collect();
        builder.set_colors(0, colors);
    }

    Ok(builder.build()?)
}

/// Writes meshes as OBJ text, one object per mesh. `TEXCOORD_0` is written as
/// one `vt` per corner.
pub fn write_obj<W: Write>(meshes: &[PolygonMesh], writer: &mut W) -> Result<(), Err> {
    let mut vertex_base = 1;
    let mut uv_base = 1;
    for mesh in meshes {
        let name = if mesh.name().is_empty() { "mesh" } else { mesh.name() };
        writeln!(writer, "o {}", name)?;
        for p in mesh.positions() {
            writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
        }
        let tex_coords = mesh.tex_coords(0);
        if let Some(tex_coords) = tex_coords {
            for uv in tex_coords {
                writeln!(writer, "vt {} {}", uv[0], uv[1])?;
            }
        }

        let mut corner = 0;
        for face in mesh.faces() {
            write!(writer, "f")?;
            for &v in face {
                if tex_coords.is_some() {
                    write!(writer, " {}/{}", vertex_base + v, uv_base + corner)?;
                } else {
                    write!(writer, " {}", vertex_base + v)?;
                }
                corner += 1;
            }
            writeln!(writer)?;
        }

        vertex_base += mesh.num_vertices();
        if tex_coords.is_some() {
            uv_base += corner;
        }
    }
    Ok(())
}

pub fn save_obj<P: AsRef<Path>>(meshes: &[PolygonMesh], path: P) -> Result<(), Err> {
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_obj(meshes, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD_AND_TRIANGLE: &str = "\
o panel
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 2 0.5 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
f 2/2 5/1 3/3
";

    #[test]
    fn polygons_are_not_triangulated() {
        let meshes = load_obj_buf(&mut Cursor::new(QUAD_AND_TRIANGLE)).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name(), "panel");
        assert_eq!(mesh.faces(), &[vec![0, 1, 2, 3], vec![1, 4, 2]]);
        assert_eq!(
            mesh.tex_coords(0).unwrap(),
            &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [1.0, 0.0], [0.0, 0.0], [1.0, 1.0]]
        );
    }

    #[test]
    fn triangles_only() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let meshes = load_obj_buf(&mut Cursor::new(obj)).unwrap();
        assert_eq!(meshes[0].faces(), &[vec![0, 1, 2]]);
        assert!(meshes[0].tex_coords(0).is_none());
    }

    #[test]
    fn written_obj_reads_back() {
        let meshes = load_obj_buf(&mut Cursor::new(QUAD_AND_TRIANGLE)).unwrap();
        let mut out = Vec::new();
        write_obj(&meshes, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("f 1/1 2/2 3/3 4/4\n"));
        assert!(text.contains("f 2/5 5/6 3/7\n"));

        let again = load_obj_buf(&mut Cursor::new(text)).unwrap();
        assert_eq!(again, meshes);
    }
}
