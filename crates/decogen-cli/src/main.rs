use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use decogen_cables::pool::CableCatalog;
use decogen_cables::ChainEngine;
use decogen_core::geom::Vec3;
use decogen_core::model::ChainSetting;
use decogen_walls::{build_grids, world_vertices, WallGridConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "decogen")]
#[command(about = "Deterministic cable-chain and paintable-wall geometry generation.")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay saved cable chains and report the rebuilt geometry.
    Chains {
        input: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write the replayed chains back out (round-trip check).
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Build paintable wall grids from a mesh vertex dump.
    Walls {
        input: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        /// Dump the built grids as JSON.
        #[arg(long)]
        grids: Option<PathBuf>,
        #[arg(long, default_value_t = 0.25)]
        vertex_step: f32,
    },
}

/// World-space vertex dump of one wall mesh.
#[derive(Debug, Deserialize)]
struct WallMeshFile {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Chains {
            input,
            report,
            save,
        } => chains(&input, report.as_deref(), save.as_deref()),
        Command::Walls {
            input,
            report,
            grids,
            vertex_step,
        } => walls(&input, report.as_deref(), grids.as_deref(), vertex_step),
    }
}

fn chains(input: &Path, report: Option<&Path>, save: Option<&Path>) -> Result<()> {
    ensure_input_file(input)?;

    let data = std::fs::read_to_string(input).with_context(|| format!("read input: {input:?}"))?;
    let settings: Vec<ChainSetting> =
        serde_json::from_str(&data).context("parse chain settings")?;

    let mut engine = ChainEngine::new(CableCatalog::with_all_defaults());
    let load_report = engine.load(settings);

    if let Some(path) = save {
        let json = serde_json::to_string_pretty(&engine.savable_settings())
            .context("serialize chains")?;
        write_output(path, &json)?;
    }

    let json = serde_json::to_string_pretty(&load_report).context("serialize report")?;
    match report {
        Some(path) => write_output(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn walls(
    input: &Path,
    report: Option<&Path>,
    grids_out: Option<&Path>,
    vertex_step: f32,
) -> Result<()> {
    ensure_input_file(input)?;

    let data = std::fs::read_to_string(input).with_context(|| format!("read input: {input:?}"))?;
    let mesh: WallMeshFile = serde_json::from_str(&data).context("parse wall mesh")?;
    if mesh.positions.len() != mesh.normals.len() {
        bail!(
            "mesh has {} positions but {} normals",
            mesh.positions.len(),
            mesh.normals.len()
        );
    }

    let config = WallGridConfig {
        vertex_step,
        ..WallGridConfig::default()
    };
    let vertices = world_vertices(&mesh.positions, &mesh.normals);
    let (grids, build_report) = build_grids(&config, &vertices, mesh.positions.len());

    if let Some(path) = grids_out {
        let json = serde_json::to_string_pretty(&grids).context("serialize grids")?;
        write_output(path, &json)?;
    }

    let json = serde_json::to_string_pretty(&build_report).context("serialize report")?;
    match report {
        Some(path) => write_output(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_output(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::write(path, json).with_context(|| format!("write output: {path:?}"))
}

fn ensure_input_file(input: &Path) -> Result<()> {
    match std::fs::metadata(input) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => bail!("input must be a regular file: {input:?}"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            match workspace_root_above(&cwd) {
                Some(root) => bail!(
                    "no such input: {input:?} (relative paths resolve against {cwd:?}; \
                     try an absolute path, or rerun from {root:?})"
                ),
                None => bail!("no such input: {input:?} (relative paths resolve against {cwd:?})"),
            }
        }
        Err(err) => Err(err).with_context(|| format!("stat input: {input:?}")),
    }
}

fn workspace_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("Cargo.lock").is_file())
        .map(Path::to_path_buf)
}
