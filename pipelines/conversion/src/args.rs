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
    /// Parse vesicle mapping files into a tabular artifact
    Table(TableArgs),

    /// Convert a neuron voxel mask into a surface mesh
    NeuronMesh(NeuronMeshArgs),

    /// Build a colored icosphere cloud from a vesicle table
    VesicleMesh(VesicleMeshArgs),
}

#[derive(clap::Args)]
pub struct TableArgs {
    /// A *_mapping.txt file or a directory of them (defaults to $EM_MAPPING_DIR)
    pub input: Option<PathBuf>,

    /// Output table path; extension picks the format (csv, json, bin)
    #[arg(short, long, default_value = "vesicle_com_data.bin")]
    pub output: PathBuf,

    /// Directory with *_lv_label.txt / *_sv_label.txt type files
    #[arg(long)]
    pub types_dir: Option<PathBuf>,

    /// Compute neighbor counts within --radius-nm
    #[arg(long)]
    pub neighbors: bool,

    /// Neighbor ball radius in nanometers
    #[arg(long, default_value_t = 500.0)]
    pub radius_nm: f64,
}

#[derive(clap::Args)]
pub struct NeuronMeshArgs {
    /// Neuron mask (.npy or .npz)
    pub input: PathBuf,

    /// Output mesh path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (obj, ply, stl, off); defaults to the output extension
    #[arg(short, long)]
    pub format: Option<String>,

    /// npz member name
    #[arg(long)]
    pub member: Option<String>,

    /// Skip 3x3x3 binary closing
    #[arg(long)]
    pub no_closing: bool,

    /// Skip gap bridging along the slice axis
    #[arg(long)]
    pub no_bridge: bool,

    /// Skip Gaussian smoothing
    #[arg(long)]
    pub no_smooth: bool,

    /// Gaussian smoothing sigma in voxels
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f64,

    /// Save the given preprocessed slice as a QC grayscale PNG next to the mesh
    #[arg(long)]
    pub qc_slice: Option<usize>,
}

#[derive(clap::Args)]
pub struct VesicleMeshArgs {
    /// Vesicle table artifact (csv or bin)
    pub input: PathBuf,

    /// Output mesh path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (obj, ply, stl, off); defaults to the output extension
    #[arg(short, long)]
    pub format: Option<String>,

    /// Icosphere subdivision level per vesicle
    #[arg(long, default_value_t = 4)]
    pub resolution: u32,

    /// Comma separated table columns to color by (x, y, z, volume, radius, type, neighbors)
    #[arg(long, value_delimiter = ',')]
    pub color_by: Vec<String>,

    /// Colormap name (viridis, plasma, gray)
    #[arg(long, default_value = "viridis")]
    pub colormap: String,
}
