//! 各子命令的实际执行流程.

use log::{info, warn};

use em_berry::colormap::{vertex_colors, ColorColumn, Colormap};
use em_berry::mesh::{marching_cubes, vesicle_cloud, ExportError, MeshFormat, SUPPORTED_FORMATS};
use em_berry::{
    collect_label_files, parse_label_file, FrameIoError, LabelEntry, NeuronMask, OpenMaskError,
    ParseError, VesicleFrame,
};

use crate::args::{NeuronMeshArgs, TableArgs, VesicleMeshArgs};

/// 执行流程错误.
#[derive(Debug)]
pub enum RunError {
    /// 映射/标签解析错误.
    Parse(ParseError),

    /// 表格 I/O 错误.
    Frame(FrameIoError),

    /// 掩码打开错误.
    Mask(OpenMaskError),

    /// 网格导出错误.
    Export(ExportError),

    /// 未知格式名. 支持集见第二个参数.
    UnknownFormat(String, &'static [MeshFormat; 4]),

    /// 未知颜色映射名.
    UnknownColormap(String),

    /// 未知着色列名.
    UnknownColumn(String),

    /// QC 切片图保存失败.
    Qc(image::ImageError),
}

impl From<ParseError> for RunError {
    fn from(e: ParseError) -> Self {
        RunError::Parse(e)
    }
}

impl From<FrameIoError> for RunError {
    fn from(e: FrameIoError) -> Self {
        RunError::Frame(e)
    }
}

impl From<OpenMaskError> for RunError {
    fn from(e: OpenMaskError) -> Self {
        RunError::Mask(e)
    }
}

impl From<ExportError> for RunError {
    fn from(e: ExportError) -> Self {
        RunError::Export(e)
    }
}

/// 解析 `--format` 参数. 未指定时交由导出流程按扩展名分派.
fn resolve_format(name: Option<&str>) -> Result<Option<MeshFormat>, RunError> {
    match name {
        None => Ok(None),
        Some(n) => MeshFormat::from_name(n)
            .map(Some)
            .ok_or_else(|| RunError::UnknownFormat(n.to_owned(), &SUPPORTED_FORMATS)),
    }
}

/// `table` 子命令: 映射文件 -> 表格工件.
pub fn run_table(args: &TableArgs) -> Result<(), RunError> {
    let input = args
        .input
        .clone()
        .unwrap_or_else(utils::mapping_dir_from_env_or_home);
    info!("解析映射输入: {}", input.display());

    let mut records = vec![];
    for (path, parsed) in em_berry::dataset::mapping_loader(&input)? {
        let parsed = parsed?;
        info!("{}: {} 条记录", path.display(), parsed.len());
        records.extend(parsed);
    }
    let mut frame = VesicleFrame::from_records(records)?;

    if let Some(types_dir) = &args.types_dir {
        let mut labels: Vec<LabelEntry> = vec![];
        for path in collect_label_files(types_dir)? {
            labels.extend(parse_label_file(&path)?);
        }
        info!("标签连接: {} 条标签", labels.len());
        frame.join_labels(&labels);
    }

    if args.neighbors {
        info!("统计 {} nm 球内邻居数...", args.radius_nm);
        frame.par_neighbor_counts(args.radius_nm);
    }

    let written = frame.write(&args.output)?;
    info!("数据已保存: {}", written.display());
    info!("表格预览:\n{}", frame.preview(5));
    Ok(())
}

/// `neuron-mesh` 子命令: 体素掩码 -> 表面网格.
pub fn run_neuron_mesh(args: &NeuronMeshArgs) -> Result<(), RunError> {
    let format = resolve_format(args.format.as_deref())?;

    let mut mask = NeuronMask::open(&args.input, args.member.as_deref())?;
    info!("掩码形状: {:?}", mask.shape());
    mask.binarize();

    info!("预处理掩码...");
    if !args.no_closing {
        info!("3x3x3 闭运算...");
        mask.binary_closing();
    }
    if !args.no_bridge {
        info!("沿切片方向桥接断层...");
        let bridged = mask.bridge_gaps();
        info!("桥接了 {bridged} 层");
    }
    if !args.no_smooth {
        info!("高斯平滑 (sigma = {})...", args.sigma);
        mask.gaussian_smooth(args.sigma);
    }

    if let Some(x) = args.qc_slice {
        if x < mask.len_x() {
            let qc_path = args.output.with_extension("png");
            mask.save_slice_vis(x, &qc_path).map_err(RunError::Qc)?;
            info!("QC 切片已保存: {}", qc_path.display());
        } else {
            warn!("QC 切片索引 {x} 超出范围 (共 {} 层), 已跳过", mask.len_x());
        }
    }

    info!("运行 marching cubes 提取表面网格...");
    let mut mesh = marching_cubes(mask.to_scalar_field().view(), 0.5);
    if mesh.is_empty() {
        warn!("marching cubes 结果为空网格, 掩码可能为空或预处理后被抹除");
    } else {
        let filled = mesh.fill_holes();
        info!(
            "网格: {} 顶点, {} 面片, 填充 {} 个孔洞",
            mesh.vertex_count(),
            mesh.face_count(),
            filled
        );
    }

    mesh.export(&args.output, format)?;
    info!("导出完成: {}", args.output.display());
    Ok(())
}

/// `vesicle-mesh` 子命令: 表格 -> 球云网格.
pub fn run_vesicle_mesh(args: &VesicleMeshArgs) -> Result<(), RunError> {
    let format = resolve_format(args.format.as_deref())?;
    let colormap = Colormap::from_name(&args.colormap)
        .ok_or_else(|| RunError::UnknownColormap(args.colormap.clone()))?;
    let columns: Vec<ColorColumn> = args
        .color_by
        .iter()
        .map(|n| ColorColumn::from_name(n).ok_or_else(|| RunError::UnknownColumn(n.clone())))
        .collect::<Result<_, _>>()?;

    let frame = VesicleFrame::read(&args.input)?;
    info!("已读入 {} 个囊泡: {}", frame.len(), args.input.display());

    let colors = vertex_colors(frame.rows(), &columns, colormap);
    let mesh = vesicle_cloud(frame.rows(), args.resolution, Some(&colors));
    if mesh.is_empty() {
        warn!("生成的网格为空, 跳过导出: {}", args.output.display());
        return Ok(());
    }
    info!(
        "合并网格: {} 顶点, {} 面片",
        mesh.vertex_count(),
        mesh.face_count()
    );

    mesh.export(&args.output, format)?;
    info!("导出完成: {}", args.output.display());
    Ok(())
}
