use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bmesh_gltf::io::gltf::{extension, summarize, ExportOptions, GltfAsset, GltfExporter, GltfImporter};
use bmesh_gltf::io::obj;

#[derive(Parser)]
#[command(name = "bmesh-gltf")]
#[command(about = "Stores polygon mesh topology in glTF files with EXT_mesh_bmesh")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an OBJ file to .glb or .gltf
    Export {
        input: PathBuf,
        output: PathBuf,
        /// Attach the extension to triangle-only meshes as well
        #[arg(long)]
        all_meshes: bool,
    },
    /// Convert a .glb or .gltf file to OBJ, restoring polygons where possible
    Import { input: PathBuf, output: PathBuf },
    /// Print the record counts of every primitive
    Inspect { input: PathBuf },
    /// Print the JSON schema of the extension block
    Schema,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Command::Export {
            input,
            output,
            all_meshes,
        } => export(&input, &output, all_meshes),
        Command::Import { input, output } => import(&input, &output),
        Command::Inspect { input } => inspect(&input),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&extension::json_schema())?);
            Ok(())
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn export(input: &Path, output: &Path, all_meshes: bool) -> Result<()> {
    if extension_of(input) != "obj" {
        anyhow::bail!("Input file must be a .obj file for export");
    }
    if !matches!(extension_of(output).as_str(), "gltf" | "glb") {
        anyhow::bail!("Output file must be a .gltf or .glb file for export");
    }

    let meshes = obj::load_obj(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let cfg = bmesh_gltf::encode::Config {
        skip_triangle_meshes: !all_meshes,
        ..Default::default()
    };
    let asset = GltfExporter::new(ExportOptions::with_config(cfg))
        .export(&meshes)
        .context("Failed to export meshes")?;
    asset
        .write(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!("Wrote {} meshes to {}", meshes.len(), output.display());
    Ok(())
}

fn import(input: &Path, output: &Path) -> Result<()> {
    if extension_of(output) != "obj" {
        anyhow::bail!("Output file must be a .obj file for import");
    }

    let asset = GltfAsset::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let meshes = GltfImporter::default().import(&asset);
    obj::save_obj(&meshes, output).with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!("Wrote {} meshes to {}", meshes.len(), output.display());
    Ok(())
}

fn inspect(input: &Path) -> Result<()> {
    let asset = GltfAsset::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    for summary in summarize(&asset) {
        let name = summary.name.as_deref().unwrap_or("<unnamed>");
        match summary.topology {
            Some([v, e, l, f]) => println!(
                "mesh {} primitive {} ({}): {} vertices, {} edges, {} loops, {} faces, {} triangles",
                summary.mesh, summary.primitive, name, v, e, l, f, summary.triangles
            ),
            None => println!(
                "mesh {} primitive {} ({}): no EXT_mesh_bmesh, {} triangles",
                summary.mesh, summary.primitive, name, summary.triangles
            ),
        }
    }
    Ok(())
}
