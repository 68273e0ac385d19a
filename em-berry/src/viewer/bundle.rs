//! HTML 查看器 bundle 装配.
//!
//! 输出目录结构:
//!
//! ```text
//! out/
//!   index.html        <- 内嵌模板, 登记神经元网格清单
//!   data/
//!     vesicles.json   <- 囊泡表格的行式 JSON
//!     colormap.json   <- 用户配色表的副本
//!   neurons/
//!     *.glb           <- 神经元网格文件的副本
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::frame::{FrameIoError, VesicleFrame};

/// 内嵌的查看器页面模板.
const TEMPLATE_HTML: &str = include_str!("../../assets/viewer_template.html");

/// 模板中神经元清单的替换锚点.
const NEURON_LIST_ANCHOR: &str = "/* NEURON_FILES_PLACEHOLDER */";

/// bundle 装配错误.
#[derive(Debug)]
pub enum BundleError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 表格编码错误.
    Frame(FrameIoError),
}

impl From<std::io::Error> for BundleError {
    fn from(e: std::io::Error) -> Self {
        BundleError::Io(e)
    }
}

/// bundle 装配结果摘要.
#[derive(Debug)]
pub struct BundleReport {
    /// 写入 JSON 的囊泡行数.
    pub vesicle_count: usize,

    /// 复制的神经元网格文件数.
    pub neuron_meshes: usize,

    /// bundle 根目录.
    pub out_dir: PathBuf,
}

/// 装配查看器 bundle.
///
/// `colormap_json` 为用户提供的类型码配色表 (原样复制);
/// `glb_dir` 下所有 `.glb` 文件会被复制进 bundle.
pub fn build_bundle(
    frame: &VesicleFrame,
    colormap_json: &Path,
    glb_dir: &Path,
    out_dir: &Path,
) -> Result<BundleReport, BundleError> {
    let data_dir = out_dir.join("data");
    let neuron_dir = out_dir.join("neurons");
    fs::create_dir_all(&data_dir)?;
    fs::create_dir_all(&neuron_dir)?;

    let vesicle_json = data_dir.join("vesicles.json");
    frame.write_json(&vesicle_json).map_err(BundleError::Frame)?;
    info!("囊泡数据已转换为 JSON: {}", vesicle_json.display());

    let colormap_out = data_dir.join("colormap.json");
    fs::copy(colormap_json, &colormap_out)?;
    info!("配色表已复制: {}", colormap_out.display());

    let mut copied: Vec<String> = vec![];
    for entry in fs::read_dir(glb_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("glb") {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        fs::copy(&path, neuron_dir.join(&name))?;
        copied.push(name);
    }
    copied.sort();
    info!("已复制 {} 个神经元网格到 {}", copied.len(), neuron_dir.display());

    let manifest = format!(
        "window.NEURON_FILES = {};",
        serde_json::to_string(&copied).expect("字符串数组序列化不会失败")
    );
    let html = TEMPLATE_HTML.replace(NEURON_LIST_ANCHOR, &manifest);
    let index = out_dir.join("index.html");
    fs::write(&index, html)?;
    info!("查看器页面已生成: {}", index.display());

    Ok(BundleReport {
        vesicle_count: frame.len(),
        neuron_meshes: copied.len(),
        out_dir: out_dir.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{SizeClass, VesicleRecord};

    #[test]
    fn test_build_bundle_layout() {
        let root = std::env::temp_dir().join("em_berry_bundle_test");
        let _ = fs::remove_dir_all(&root);
        let glb_dir = root.join("glb");
        fs::create_dir_all(&glb_dir).unwrap();
        fs::write(glb_dir.join("KC19.glb"), b"glb-bytes").unwrap();
        fs::write(glb_dir.join("notes.txt"), b"ignored").unwrap();
        let colormap = root.join("colors.json");
        fs::write(&colormap, "{\"0\": [200, 200, 200]}").unwrap();

        let frame = VesicleFrame::from_records(vec![VesicleRecord {
            sample_id: "KC19".into(),
            size_class: SizeClass::Sv,
            vesicle_id: "sv_1".into(),
            x: 1.0,
            y: 2.0,
            z: 3.0,
            volume: 10,
            radius: 1.5,
            type_code: Some(2),
            neighbors: None,
        }])
        .unwrap();

        let out = root.join("viewer");
        let report = build_bundle(&frame, &colormap, &glb_dir, &out).unwrap();
        assert_eq!(report.vesicle_count, 1);
        assert_eq!(report.neuron_meshes, 1);

        assert!(out.join("data/vesicles.json").is_file());
        assert!(out.join("data/colormap.json").is_file());
        assert!(out.join("neurons/KC19.glb").is_file());
        assert!(!out.join("neurons/notes.txt").exists());

        let html = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.contains("window.NEURON_FILES = [\"KC19.glb\"];"));

        let json = fs::read_to_string(out.join("data/vesicles.json")).unwrap();
        assert!(json.contains("\"vesicle_id\":\"sv_1\""));

        fs::remove_dir_all(&root).unwrap();
    }
}
