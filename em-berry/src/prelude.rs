//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::mapping::{
    collect_mapping_files, parse_label_file, parse_mapping_file, LabelEntry, ParseError,
    SizeClass, VesicleRecord,
};

pub use crate::frame::{FrameFormat, VesicleFrame};

pub use crate::volume::{NeuronMask, OpenMaskError, VesicleVolume};

pub use crate::mesh::{icosphere, marching_cubes, vesicle_cloud, MeshFormat, TriMesh};

pub use crate::colormap::{vertex_colors, ColorColumn, Colormap};

pub use crate::consts::{DEFAULT_NEIGHBOR_RADIUS_NM, VOXEL_PITCH_NM};

pub use crate::dataset::{self, home_data_dir_with, MaskArchive, OffsetTable};

pub use crate::viewer::{assemble_scene, build_bundle, build_state, ViewerState};
