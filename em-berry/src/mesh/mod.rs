//! 三角网格与表面提取.
//!
//! [`TriMesh`] 是完全透明的顶点/面片容器, 配套提供 marching cubes
//! 等值面提取, 二十面体球细分, 孔洞填充与多格式导出.

use log::info;

use crate::mapping::VesicleRecord;

mod holes;
mod icosphere;
mod marching;
mod tables;

pub mod export;

pub use export::{ExportError, LoadError, MeshFormat, SUPPORTED_FORMATS};
pub use icosphere::icosphere;
pub use marching::marching_cubes;

/// 顶点统一着色时的默认灰色.
pub const DEFAULT_GRAY: [u8; 4] = [200, 200, 200, 255];

/// 三角网格.
///
/// 该结构完全透明, 用户可以直接读写各字段.
///
/// # 注意
///
/// 调用方保证以下一致性, 否则程序行为未定义:
///
/// 1. `faces` 中的每个索引都小于 `vertices.len()`;
/// 2. `colors` 存在时其长度等于 `vertices.len()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriMesh {
    /// 顶点坐标.
    pub vertices: Vec<[f64; 3]>,

    /// 三角面片, 每项为三个顶点索引.
    pub faces: Vec<[usize; 3]>,

    /// 可选的逐顶点 RGBA 颜色.
    pub colors: Option<Vec<[u8; 4]>>,
}

impl TriMesh {
    /// 空网格.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 面片个数.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// 网格是否为空 (没有任何面片).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// 平移所有顶点.
    pub fn translate(&mut self, offset: [f64; 3]) {
        for v in self.vertices.iter_mut() {
            v[0] += offset[0];
            v[1] += offset[1];
            v[2] += offset[2];
        }
    }

    /// 为所有顶点统一着色.
    pub fn set_uniform_color(&mut self, rgba: [u8; 4]) {
        self.colors = Some(vec![rgba; self.vertices.len()]);
    }

    /// 轴对齐包围盒 `(min, max)`. 空网格返回 `None`.
    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        let mut it = self.vertices.iter();
        let first = *it.next()?;
        let (mut lo, mut hi) = (first, first);
        for v in it {
            for k in 0..3 {
                lo[k] = lo[k].min(v[k]);
                hi[k] = hi[k].max(v[k]);
            }
        }
        Some((lo, hi))
    }

    /// 将另一个网格的内容合并进来.
    ///
    /// 颜色规则: 只要任意一方带颜色, 合并结果就带颜色,
    /// 不带颜色的一方填充 [`DEFAULT_GRAY`].
    pub fn append(&mut self, other: &TriMesh) {
        let base = self.vertices.len();
        if self.colors.is_some() || other.colors.is_some() {
            let mut colors = self
                .colors
                .take()
                .unwrap_or_else(|| vec![DEFAULT_GRAY; base]);
            match &other.colors {
                Some(c) => colors.extend_from_slice(c),
                None => colors.extend(std::iter::repeat(DEFAULT_GRAY).take(other.vertices.len())),
            }
            self.colors = Some(colors);
        }
        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|i| i + base)));
    }

    /// 合并一组网格.
    pub fn concat<'a, I: IntoIterator<Item = &'a TriMesh>>(parts: I) -> Self {
        let mut out = TriMesh::new();
        for p in parts {
            out.append(p);
        }
        out
    }
}

/// 由囊泡表格生成球云网格.
///
/// 每行放置一个半径为 `radius` (体素), 细分级别为 `subdivisions`
/// 的二十面体球, 平移到该行 COM. `colors` 给出逐行 RGBA
/// (长度必须等于行数), 球的所有顶点同色; 传 `None` 则不着色.
///
/// 每处理 1000 行打印一次进度. 行数为 0 时返回空网格.
pub fn vesicle_cloud(
    rows: &[VesicleRecord],
    subdivisions: u32,
    colors: Option<&[[u8; 4]]>,
) -> TriMesh {
    if let Some(c) = colors {
        assert_eq!(c.len(), rows.len());
    }

    let mut out = TriMesh::new();
    for (i, row) in rows.iter().enumerate() {
        let mut sphere = icosphere(subdivisions, row.radius);
        sphere.translate([row.x, row.y, row.z]);
        if let Some(c) = colors {
            sphere.set_uniform_color(c[i]);
        }
        out.append(&sphere);

        if (i + 1) % 1000 == 0 {
            info!("球云装配进度: {}/{}", i + 1, rows.len());
        }
    }
    out
}
