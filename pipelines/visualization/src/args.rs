//! 命令行参数.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Assemble an HTML viewer bundle from a vesicle table and neuron meshes
    Bundle(BundleArgs),

    /// Build a neuroglancer style session JSON from masks and offsets
    State(StateArgs),

    /// Merge neuron and vesicle meshes into a single offset-corrected scene
    Scene(SceneArgs),
}

#[derive(clap::Args)]
pub struct BundleArgs {
    /// Vesicle table artifact (csv or bin)
    pub table: PathBuf,

    /// Type-code colormap JSON copied into the bundle
    pub colormap: PathBuf,

    /// Directory with neuron .glb meshes
    pub glb_dir: PathBuf,

    /// Bundle output directory
    #[arg(short, long, default_value = "vesicle_viewer_output")]
    pub output: PathBuf,
}

#[derive(clap::Args)]
pub struct StateArgs {
    /// Vesicle segmentation npz (one member per neuron)
    pub vesicle_npz: PathBuf,

    /// Offsets CSV
    pub offsets: PathBuf,

    /// Directory with neuron masks (defaults to $EM_MASK_DIR)
    #[arg(long)]
    pub neuron_dir: Option<PathBuf>,

    /// Treat the offsets CSV as a headerless bounding-box table
    #[arg(long)]
    pub bounds: bool,

    /// Voxel resolution in nm as z,y,x
    #[arg(long, value_delimiter = ',', default_value = "30,64,64")]
    pub resolution: Vec<u32>,

    /// Session JSON output path
    #[arg(short, long, default_value = "viewer_state.json")]
    pub output: PathBuf,
}

#[derive(clap::Args)]
pub struct SceneArgs {
    /// Directory with neuron .obj meshes
    pub neuron_mesh_dir: PathBuf,

    /// Directory with vesicle .obj meshes (grouped by neuron prefix)
    pub vesicle_mesh_dir: PathBuf,

    /// Offsets CSV
    pub offsets: PathBuf,

    /// Treat the offsets CSV as a headerless bounding-box table
    #[arg(long)]
    pub bounds: bool,

    /// Merged mesh output path
    #[arg(short, long, default_value = "scene.obj")]
    pub output: PathBuf,

    /// Output format (obj, ply, stl, off); defaults to the output extension
    #[arg(short, long)]
    pub format: Option<String>,
}
