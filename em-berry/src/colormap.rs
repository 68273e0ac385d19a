//! 颜色映射.
//!
//! 以锚点查找表 + 线性插值实现的感知均匀配色, 以及由表格列
//! 计算逐行顶点颜色的工具.

use ordered_float::OrderedFloat;

use crate::mapping::VesicleRecord;
use crate::mesh::DEFAULT_GRAY;

/// viridis 锚点 (matplotlib 采样).
const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

/// plasma 锚点 (matplotlib 采样).
const PLASMA: [[u8; 3]; 5] = [
    [13, 8, 135],
    [126, 3, 168],
    [204, 71, 120],
    [248, 149, 64],
    [240, 249, 33],
];

/// 颜色映射.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Colormap {
    /// 感知均匀, 深紫到亮黄.
    #[default]
    Viridis,

    /// 感知均匀, 深蓝到亮黄.
    Plasma,

    /// 黑白灰度.
    Gray,
}

impl Colormap {
    /// 由名字识别颜色映射, 大小写不敏感. 未知名字返回 `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "viridis" => Some(Colormap::Viridis),
            "plasma" => Some(Colormap::Plasma),
            "gray" | "grey" => Some(Colormap::Gray),
            _ => None,
        }
    }

    /// 在 `t` 处采样. `t` 被钳制到 `[0, 1]`.
    pub fn sample(&self, t: f64) -> [u8; 4] {
        let t = t.clamp(0.0, 1.0);
        let anchors: &[[u8; 3]] = match self {
            Colormap::Viridis => &VIRIDIS,
            Colormap::Plasma => &PLASMA,
            Colormap::Gray => {
                let v = (t * 255.0).round() as u8;
                return [v, v, v, 255];
            }
        };

        // 锚点之间线性插值.
        let span = (anchors.len() - 1) as f64;
        let pos = t * span;
        let lo = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - lo as f64;
        let (a, b) = (anchors[lo], anchors[lo + 1]);
        let lerp = |x: u8, y: u8| (x as f64 + frac * (y as f64 - x as f64)).round() as u8;
        [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255]
    }
}

/// 可以用来着色的表格数值列.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColorColumn {
    /// COM x 坐标.
    X,

    /// COM y 坐标.
    Y,

    /// COM z 坐标.
    Z,

    /// 体素体积.
    Volume,

    /// 等效半径.
    Radius,

    /// 标签类型码 (缺失按 0).
    TypeCode,

    /// 邻居数 (缺失按 0).
    Neighbors,
}

impl ColorColumn {
    /// 由列名识别, 大小写不敏感. 未知列名返回 `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x" => Some(ColorColumn::X),
            "y" => Some(ColorColumn::Y),
            "z" => Some(ColorColumn::Z),
            "volume" => Some(ColorColumn::Volume),
            "radius" => Some(ColorColumn::Radius),
            "type" | "type_code" => Some(ColorColumn::TypeCode),
            "neighbors" => Some(ColorColumn::Neighbors),
            _ => None,
        }
    }

    /// 取出一行中该列的数值.
    pub fn value(&self, row: &VesicleRecord) -> f64 {
        match self {
            ColorColumn::X => row.x,
            ColorColumn::Y => row.y,
            ColorColumn::Z => row.z,
            ColorColumn::Volume => row.volume as f64,
            ColorColumn::Radius => row.radius,
            ColorColumn::TypeCode => row.type_code.unwrap_or(0) as f64,
            ColorColumn::Neighbors => row.neighbors.unwrap_or(0) as f64,
        }
    }
}

/// 按选定列计算逐行 RGBA 颜色.
///
/// `color_by` 为空时返回统一灰色; 单列时按该列的 min/max 归一化采样;
/// 多列时先逐行求和再归一化. 数值全部相同 (min == max) 时所有行
/// 映射到 `t = 0`.
pub fn vertex_colors(
    rows: &[VesicleRecord],
    color_by: &[ColorColumn],
    colormap: Colormap,
) -> Vec<[u8; 4]> {
    if color_by.is_empty() {
        return vec![DEFAULT_GRAY; rows.len()];
    }

    let values: Vec<f64> = rows
        .iter()
        .map(|r| color_by.iter().map(|c| c.value(r)).sum())
        .collect();

    let min = values.iter().copied().map(OrderedFloat).min();
    let max = values.iter().copied().map(OrderedFloat).max();
    let (Some(OrderedFloat(min)), Some(OrderedFloat(max))) = (min, max) else {
        return vec![];
    };
    let width = max - min;

    values
        .iter()
        .map(|&v| {
            let t = if width > 0.0 { (v - min) / width } else { 0.0 };
            colormap.sample(t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SizeClass;

    fn rec(volume: u64, radius: f64) -> VesicleRecord {
        VesicleRecord {
            sample_id: "a".into(),
            size_class: SizeClass::Sv,
            vesicle_id: "sv_1".into(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            volume,
            radius,
            type_code: None,
            neighbors: None,
        }
    }

    #[test]
    fn test_viridis_endpoints() {
        let low = Colormap::Viridis.sample(0.0);
        let high = Colormap::Viridis.sample(1.0);
        // 低端蓝紫 (B > R), 高端亮黄 (R > B).
        assert!(low[2] > low[0]);
        assert!(high[0] > high[2]);
        assert_eq!(low, [68, 1, 84, 255]);
        assert_eq!(high, [253, 231, 37, 255]);
    }

    #[test]
    fn test_sample_clamped() {
        assert_eq!(Colormap::Gray.sample(-3.0), [0, 0, 0, 255]);
        assert_eq!(Colormap::Gray.sample(7.0), [255, 255, 255, 255]);
        assert_eq!(Colormap::Gray.sample(0.5), [128, 128, 128, 255]);
    }

    #[test]
    fn test_vertex_colors_default_gray() {
        let rows = vec![rec(1, 1.0), rec(2, 2.0)];
        let colors = vertex_colors(&rows, &[], Colormap::Viridis);
        assert_eq!(colors, vec![DEFAULT_GRAY; 2]);
    }

    #[test]
    fn test_vertex_colors_single_column() {
        let rows = vec![rec(0, 1.0), rec(100, 1.0), rec(50, 1.0)];
        let colors = vertex_colors(&rows, &[ColorColumn::Volume], Colormap::Gray);
        assert_eq!(colors[0], [0, 0, 0, 255]);
        assert_eq!(colors[1], [255, 255, 255, 255]);
        assert_eq!(colors[2], [128, 128, 128, 255]);
    }

    #[test]
    fn test_vertex_colors_column_sum() {
        // volume + radius 求和后归一化.
        let rows = vec![rec(0, 0.0), rec(50, 50.0)];
        let colors = vertex_colors(
            &rows,
            &[ColorColumn::Volume, ColorColumn::Radius],
            Colormap::Gray,
        );
        assert_eq!(colors[0], [0, 0, 0, 255]);
        assert_eq!(colors[1], [255, 255, 255, 255]);
    }

    #[test]
    fn test_vertex_colors_constant_column() {
        let rows = vec![rec(5, 1.0), rec(5, 1.0)];
        let colors = vertex_colors(&rows, &[ColorColumn::Volume], Colormap::Viridis);
        assert!(colors.iter().all(|&c| c == Colormap::Viridis.sample(0.0)));
    }

    #[test]
    fn test_column_names() {
        assert_eq!(ColorColumn::from_name("Type"), Some(ColorColumn::TypeCode));
        assert_eq!(ColorColumn::from_name("bogus"), None);
        assert_eq!(Colormap::from_name("grey"), Some(Colormap::Gray));
        assert_eq!(Colormap::from_name("jet"), None);
    }
}
