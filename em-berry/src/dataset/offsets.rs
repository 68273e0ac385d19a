//! 神经元体素偏移表.
//!
//! 对齐流程为每个神经元子卷记录其在全局坐标系中的整数体素偏移.
//! 支持两种 CSV 模式:
//!
//! 1. 带表头的偏移表, 必须含 `name` 与 `x`, `y`, `z` 列 (列序任意);
//! 2. 无表头的包围盒表, 每行为
//!    `neuron,z_min,z_max,y_min,y_max,x_min,x_max`, 偏移取各轴最小值.

use std::collections::HashMap;
use std::path::Path;

use log::warn;

use crate::consts::{SHL17_NEURON, SHL17_Y_CORRECTION};

/// 读取偏移表错误.
#[derive(Debug)]
pub enum OffsetError {
    /// csv 解码或底层 I/O 错误.
    Csv(csv::Error),

    /// 表头中缺少必需列.
    MissingColumn(&'static str),
}

impl From<csv::Error> for OffsetError {
    fn from(e: csv::Error) -> Self {
        OffsetError::Csv(e)
    }
}

/// 神经元名到 `(x, y, z)` 体素偏移的映射.
#[derive(Clone, Debug, Default)]
pub struct OffsetTable {
    map: HashMap<String, [i64; 3]>,
}

impl OffsetTable {
    /// 读取带表头的偏移 CSV. `name`, `x`, `y`, `z` 列必须存在,
    /// 列序任意, 多余的列被忽略.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, OffsetError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();
        let col = |want: &'static str| -> Result<usize, OffsetError> {
            headers
                .iter()
                .position(|h| h.trim() == want)
                .ok_or(OffsetError::MissingColumn(want))
        };
        let (ni, xi, yi, zi) = (col("name")?, col("x")?, col("y")?, col("z")?);

        let mut map = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let parse = |i: usize| record.get(i).and_then(|s| s.trim().parse::<i64>().ok());
            let (Some(x), Some(y), Some(z)) = (parse(xi), parse(yi), parse(zi)) else {
                warn!("偏移表存在无法解析的行, 已跳过: {record:?}");
                continue;
            };
            let name = record.get(ni).unwrap_or_default().trim().to_owned();
            map.insert(name, [x, y, z]);
        }
        Ok(Self { map })
    }

    /// 读取无表头的包围盒 CSV, 偏移取各轴最小值.
    ///
    /// 字段不足 7 个或无法解析的行被跳过. [`SHL17_NEURON`] 的 y
    /// 偏移附加 [`SHL17_Y_CORRECTION`] 修正.
    pub fn from_bounds_csv<P: AsRef<Path>>(path: P) -> Result<Self, OffsetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut map = HashMap::new();
        for record in reader.records() {
            let record = record?;
            if record.len() < 7 {
                continue;
            }
            let name = record.get(0).unwrap_or_default().trim().to_owned();
            let parse = |i: usize| record.get(i).and_then(|s| s.trim().parse::<i64>().ok());
            // 字段序: z_min, z_max, y_min, y_max, x_min, x_max.
            let (Some(z), Some(y), Some(x)) = (parse(1), parse(3), parse(5)) else {
                warn!("包围盒表存在无法解析的行, 已跳过: {record:?}");
                continue;
            };
            let y = if name == SHL17_NEURON {
                y + SHL17_Y_CORRECTION
            } else {
                y
            };
            map.insert(name, [x, y, z]);
        }
        Ok(Self { map })
    }

    /// 查询偏移. 未登记的神经元返回零偏移.
    #[inline]
    pub fn get(&self, name: &str) -> [i64; 3] {
        self.map.get(name).copied().unwrap_or([0; 3])
    }

    /// 神经元是否登记在表中?
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// 登记的神经元个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 偏移表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 迭代 `(神经元名, 偏移)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, [i64; 3])> {
        self.map.iter().map(|(k, &v)| (k.as_str(), v))
    }
}
