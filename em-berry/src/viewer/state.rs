//! neuroglancer 风格的会话描述.
//!
//! 为每个同时具有偏移记录与囊泡分割体的神经元掩码生成两个
//! segmentation 图层 (`neuron_{name}` 与 `vesicles_{name}`),
//! 序列化为可被 neuroglancer 前端消费的会话 JSON.
//! 坐标空间固定为 `(z, y, x)`, 单位纳米.

use std::num::NonZeroUsize;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_STATE_RESOLUTION_NM;
use crate::dataset::{mask_loader, MaskArchive, OffsetTable, OpenArchiveError};
use crate::volume::VesicleVolume;
use crate::Idx3d;

/// 会话坐标空间.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinateSpace {
    /// 轴名, 固定为 `["z", "y", "x"]`.
    pub names: [String; 3],

    /// 轴单位, 固定为纳米.
    pub units: [String; 3],

    /// 各轴体素分辨率 (纳米).
    pub scales: [u32; 3],
}

impl CoordinateSpace {
    /// 以给定分辨率创建 `(z, y, x)` 纳米坐标空间.
    pub fn nanometers(scales: [u32; 3]) -> Self {
        Self {
            names: ["z".into(), "y".into(), "x".into()],
            units: ["nm".into(), "nm".into(), "nm".into()],
            scales,
        }
    }
}

/// 单个 segmentation 图层.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentationLayer {
    /// 图层名.
    pub name: String,

    /// 图层类型, 恒为 `"segmentation"`.
    #[serde(rename = "type")]
    pub layer_type: String,

    /// 体数据来源文件.
    pub source: String,

    /// `.npz` 来源的成员名. `.npy` 来源时为 `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,

    /// 体数据形状, `(x, y, z)` 体素.
    pub shape: [usize; 3],

    /// 图层在全局坐标系中的体素偏移, `(z, y, x)` 序.
    pub voxel_offset: [i64; 3],
}

impl SegmentationLayer {
    fn new(name: String, source: String, shape: Idx3d, offset_xyz: [i64; 3]) -> Self {
        let [x, y, z] = offset_xyz;
        Self {
            name,
            layer_type: "segmentation".into(),
            source,
            member: None,
            shape: [shape.0, shape.1, shape.2],
            voxel_offset: [z, y, x],
        }
    }
}

/// 查看器会话描述.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerState {
    /// 坐标空间.
    pub dimensions: CoordinateSpace,

    /// 全部图层.
    pub layers: Vec<SegmentationLayer>,
}

impl ViewerState {
    /// 序列化为 JSON 并写到 `path`.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), StateError> {
        let f = std::io::BufWriter::new(std::fs::File::create(path.as_ref())?);
        serde_json::to_writer_pretty(f, self).map_err(StateError::Json)
    }

    /// 从 JSON 文件读回会话描述.
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        let f = std::io::BufReader::new(std::fs::File::open(path.as_ref())?);
        serde_json::from_reader(f).map_err(StateError::Json)
    }
}

/// 会话构建错误.
#[derive(Debug)]
pub enum StateError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 打开囊泡归档错误.
    Archive(OpenArchiveError),

    /// JSON 编解码错误.
    Json(serde_json::Error),

    /// 没有任何神经元同时具备掩码, 偏移与囊泡分割体.
    NoLayers,
}

impl From<std::io::Error> for StateError {
    fn from(e: std::io::Error) -> Self {
        StateError::Io(e)
    }
}

/// 构建会话描述.
///
/// 遍历 `neuron_dir` 下所有掩码文件; 对每个神经元 `name`:
///
/// 1. 偏移表中无记录, 或囊泡归档 `vesicle_npz` 中无同名成员时,
///    打印警告并跳过;
/// 2. 掩码或分割体打开失败时, 打印警告并跳过;
/// 3. 否则追加 `neuron_{name}` 与 `vesicles_{name}` 两个图层.
///
/// 全部跳过时返回 [`StateError::NoLayers`].
pub fn build_state(
    neuron_dir: &Path,
    vesicle_npz: &Path,
    offsets: &OffsetTable,
    resolution: Option<[u32; 3]>,
) -> Result<ViewerState, StateError> {
    let archive =
        MaskArchive::new(NonZeroUsize::new(1).unwrap(), vesicle_npz).map_err(StateError::Archive)?;
    let resolution = resolution.unwrap_or(DEFAULT_STATE_RESOLUTION_NM);

    let mut layers = vec![];
    for (name, mask) in mask_loader(neuron_dir)? {
        if !offsets.contains(&name) || !archive.contains(&name) {
            warn!("跳过 {name}: 缺少偏移记录或囊泡分割体");
            continue;
        }
        let mask = match mask {
            Ok(m) => m,
            Err(e) => {
                warn!("跳过 {name}: 神经元掩码打开失败: {e:?}");
                continue;
            }
        };
        let vesicles = match archive.volume_by_name(&name) {
            Ok(Some(v)) => VesicleVolume::from_array(v),
            Ok(None) => {
                warn!("跳过 {name}: 囊泡归档中没有该成员");
                continue;
            }
            Err(e) => {
                warn!("跳过 {name}: 囊泡分割体读取失败: {e:?}");
                continue;
            }
        };

        let offset = offsets.get(&name);
        let neuron_source = neuron_dir.join(format!("{name}.npy"));
        let neuron_source = if neuron_source.is_file() {
            neuron_source
        } else {
            neuron_dir.join(format!("{name}.npz"))
        };
        layers.push(SegmentationLayer::new(
            format!("neuron_{name}"),
            neuron_source.display().to_string(),
            mask.shape(),
            offset,
        ));

        let mut layer = SegmentationLayer::new(
            format!("vesicles_{name}"),
            vesicle_npz.display().to_string(),
            vesicles.shape(),
            offset,
        );
        layer.member = Some(name.clone());
        layers.push(layer);

        info!(
            "已加入 {name} 的神经元与囊泡图层 ({} 个囊泡)",
            vesicles.distinct_ids()
        );
    }

    if layers.is_empty() {
        return Err(StateError::NoLayers);
    }
    Ok(ViewerState {
        dimensions: CoordinateSpace::nanometers(resolution),
        layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use ndarray_npy::{NpzWriter, WriteNpyExt};
    use std::fs::{self, File};

    #[test]
    fn test_build_state() {
        let root = std::env::temp_dir().join("em_berry_state_test");
        let _ = fs::remove_dir_all(&root);
        let neuron_dir = root.join("neurons");
        fs::create_dir_all(&neuron_dir).unwrap();

        // 两个神经元掩码, 其中 lonely 缺少偏移与囊泡.
        Array3::<u8>::ones((2, 3, 4))
            .write_npy(File::create(neuron_dir.join("KC19.npy")).unwrap())
            .unwrap();
        Array3::<u8>::ones((2, 2, 2))
            .write_npy(File::create(neuron_dir.join("lonely.npy")).unwrap())
            .unwrap();

        let npz = root.join("vesicles.npz");
        let mut w = NpzWriter::new(File::create(&npz).unwrap());
        w.add_array("KC19", &Array3::<u32>::zeros((2, 3, 4))).unwrap();
        w.finish().unwrap();

        let offsets_csv = root.join("offsets.csv");
        fs::write(&offsets_csv, "name,x,y,z\nKC19,7,8,9\n").unwrap();
        let offsets = OffsetTable::from_csv(&offsets_csv).unwrap();

        let state = build_state(&neuron_dir, &npz, &offsets, None).unwrap();
        assert_eq!(state.dimensions.scales, DEFAULT_STATE_RESOLUTION_NM);
        assert_eq!(state.layers.len(), 2);

        let neuron = &state.layers[0];
        assert_eq!(neuron.name, "neuron_KC19");
        assert_eq!(neuron.layer_type, "segmentation");
        assert_eq!(neuron.shape, [2, 3, 4]);
        // (x, y, z) = (7, 8, 9) -> voxel_offset (z, y, x).
        assert_eq!(neuron.voxel_offset, [9, 8, 7]);

        let vesicles = &state.layers[1];
        assert_eq!(vesicles.name, "vesicles_KC19");
        assert_eq!(vesicles.member.as_deref(), Some("KC19"));

        // JSON 往返.
        let out = root.join("state.json");
        state.write_json(&out).unwrap();
        assert_eq!(ViewerState::read_json(&out).unwrap(), state);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_build_state_no_layers() {
        let root = std::env::temp_dir().join("em_berry_state_empty_test");
        let _ = fs::remove_dir_all(&root);
        let neuron_dir = root.join("neurons");
        fs::create_dir_all(&neuron_dir).unwrap();
        Array3::<u8>::ones((1, 1, 1))
            .write_npy(File::create(neuron_dir.join("a.npy")).unwrap())
            .unwrap();

        let npz = root.join("vesicles.npz");
        let mut w = NpzWriter::new(File::create(&npz).unwrap());
        w.add_array("other", &Array3::<u32>::zeros((1, 1, 1))).unwrap();
        w.finish().unwrap();

        let err = build_state(&neuron_dir, &npz, &OffsetTable::default(), None).unwrap_err();
        assert!(matches!(err, StateError::NoLayers));
        fs::remove_dir_all(&root).unwrap();
    }
}
