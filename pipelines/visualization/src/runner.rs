//! 各子命令的实际执行流程.

use std::path::Path;

use log::info;

use em_berry::dataset::OffsetTable;
use em_berry::mesh::{ExportError, MeshFormat, SUPPORTED_FORMATS};
use em_berry::viewer::{assemble_scene, build_bundle, build_state, BundleError, SceneError, StateError};
use em_berry::{FrameIoError, VesicleFrame};

use crate::args::{BundleArgs, SceneArgs, StateArgs};

/// 执行流程错误.
#[derive(Debug)]
pub enum RunError {
    /// 表格 I/O 错误.
    Frame(FrameIoError),

    /// 偏移表读取错误.
    Offsets(em_berry::dataset::OffsetError),

    /// bundle 装配错误.
    Bundle(BundleError),

    /// 会话构建错误.
    State(StateError),

    /// 场景装配错误.
    Scene(SceneError),

    /// 网格导出错误.
    Export(ExportError),

    /// 未知格式名. 支持集见第二个参数.
    UnknownFormat(String, &'static [MeshFormat; 4]),

    /// `--resolution` 必须恰好给出 3 个分量.
    BadResolution(Vec<u32>),
}

impl From<FrameIoError> for RunError {
    fn from(e: FrameIoError) -> Self {
        RunError::Frame(e)
    }
}

impl From<em_berry::dataset::OffsetError> for RunError {
    fn from(e: em_berry::dataset::OffsetError) -> Self {
        RunError::Offsets(e)
    }
}

impl From<BundleError> for RunError {
    fn from(e: BundleError) -> Self {
        RunError::Bundle(e)
    }
}

impl From<StateError> for RunError {
    fn from(e: StateError) -> Self {
        RunError::State(e)
    }
}

impl From<SceneError> for RunError {
    fn from(e: SceneError) -> Self {
        RunError::Scene(e)
    }
}

impl From<ExportError> for RunError {
    fn from(e: ExportError) -> Self {
        RunError::Export(e)
    }
}

/// 按命令行开关读取偏移表.
fn load_offsets(path: &Path, bounds: bool) -> Result<OffsetTable, RunError> {
    let table = if bounds {
        OffsetTable::from_bounds_csv(path)?
    } else {
        OffsetTable::from_csv(path)?
    };
    info!("偏移表: {} 个神经元", table.len());
    Ok(table)
}

/// `bundle` 子命令: 装配 HTML 查看器 bundle.
pub fn run_bundle(args: &BundleArgs) -> Result<(), RunError> {
    let frame = VesicleFrame::read(&args.table)?;
    info!("已读入 {} 个囊泡: {}", frame.len(), args.table.display());

    let report = build_bundle(&frame, &args.colormap, &args.glb_dir, &args.output)?;
    info!(
        "bundle 装配完成: {} 个囊泡, {} 个神经元网格 -> {}",
        report.vesicle_count,
        report.neuron_meshes,
        report.out_dir.display()
    );
    Ok(())
}

/// `state` 子命令: 构建会话 JSON.
pub fn run_state(args: &StateArgs) -> Result<(), RunError> {
    let offsets = load_offsets(&args.offsets, args.bounds)?;
    let neuron_dir = args
        .neuron_dir
        .clone()
        .unwrap_or_else(utils::mask_dir_from_env_or_home);

    let Ok(resolution) = <[u32; 3]>::try_from(args.resolution.as_slice()) else {
        return Err(RunError::BadResolution(args.resolution.clone()));
    };
    let state = build_state(&neuron_dir, &args.vesicle_npz, &offsets, Some(resolution))?;
    info!("会话包含 {} 个图层", state.layers.len());

    state.write_json(&args.output).map_err(RunError::State)?;
    info!("会话已写出: {}", args.output.display());
    Ok(())
}

/// `scene` 子命令: 装配合并场景.
pub fn run_scene(args: &SceneArgs) -> Result<(), RunError> {
    let format = match args.format.as_deref() {
        None => None,
        Some(n) => Some(
            MeshFormat::from_name(n)
                .ok_or_else(|| RunError::UnknownFormat(n.to_owned(), &SUPPORTED_FORMATS))?,
        ),
    };

    let offsets = load_offsets(&args.offsets, args.bounds)?;
    let (scene, report) =
        assemble_scene(&args.neuron_mesh_dir, &args.vesicle_mesh_dir, &offsets)?;
    info!(
        "场景: {} 个神经元网格, {} 个囊泡网格, 共 {} 面片",
        report.neurons,
        report.vesicle_meshes,
        scene.face_count()
    );

    scene.export(&args.output, format)?;
    info!("场景已导出: {}", args.output.display());
    Ok(())
}
