//! 囊泡表格数据集.
//!
//! [`VesicleFrame`] 是从映射文件解析出的 COM 记录表, 支持标签左连接,
//! 按样本的邻居密度统计, 以及 csv / 行式 json / 紧凑二进制三种持久化格式.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::warn;
use rstar::RTree;

use crate::consts::{DEFAULT_NEIGHBOR_RADIUS_NM, TYPE_UNLABELED, VOXEL_PITCH_NM};
use crate::mapping::{LabelEntry, ParseError, VesicleRecord};

/// 表格工件的持久化格式. 由输出路径扩展名分派.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameFormat {
    /// 逗号分隔文本.
    Csv,

    /// 行式 JSON (记录数组).
    Json,

    /// bincode 紧凑二进制.
    Bin,
}

impl FrameFormat {
    /// 由扩展名识别格式. 未知扩展名返回 `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FrameFormat::Csv),
            "json" => Some(FrameFormat::Json),
            "bin" => Some(FrameFormat::Bin),
            _ => None,
        }
    }
}

/// 表格 I/O 运行时错误.
#[derive(Debug)]
pub enum FrameIoError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// csv 编解码错误.
    Csv(csv::Error),

    /// json 编码错误.
    Json(serde_json::Error),

    /// bincode 编解码错误.
    Bin(bincode::Error),
}

impl From<std::io::Error> for FrameIoError {
    fn from(e: std::io::Error) -> Self {
        FrameIoError::Io(e)
    }
}

impl From<csv::Error> for FrameIoError {
    fn from(e: csv::Error) -> Self {
        FrameIoError::Csv(e)
    }
}

/// 囊泡 COM 记录表.
///
/// 行序与输入顺序一致; 所有列操作 (连接, 邻居统计) 均不增删行, 不改变行序.
#[derive(Clone, Debug, Default)]
pub struct VesicleFrame {
    rows: Vec<VesicleRecord>,
}

impl VesicleFrame {
    /// 从记录集合创建表格. 记录为空时返回 [`ParseError::NoRecords`]
    /// (与上游解析语义一致: 没有任何合法条目是输入错误).
    pub fn from_records(rows: Vec<VesicleRecord>) -> Result<Self, ParseError> {
        if rows.is_empty() {
            return Err(ParseError::NoRecords);
        }
        Ok(Self { rows })
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表格是否为空. 经 [`Self::from_records`] 创建的表格恒为非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 行切片视图.
    #[inline]
    pub fn rows(&self) -> &[VesicleRecord] {
        &self.rows
    }

    /// 行迭代器.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &VesicleRecord> {
        self.rows.iter()
    }

    /// 以 `(sample_id, vesicle_id)` 为键左连接标签.
    ///
    /// 每一行都会获得类型码: 匹配成功时为标签值,
    /// 否则为 [`TYPE_UNLABELED`].
    pub fn join_labels(&mut self, labels: &[LabelEntry]) {
        let table: HashMap<(&str, &str), i64> = labels
            .iter()
            .map(|e| ((e.sample_id.as_str(), e.vesicle_id.as_str()), e.type_code))
            .collect();
        for row in self.rows.iter_mut() {
            let key = (row.sample_id.as_str(), row.vesicle_id.as_str());
            row.type_code = Some(table.get(&key).copied().unwrap_or(TYPE_UNLABELED));
        }
    }

    /// 按行序返回每行在物理空间 (纳米) 中的 COM 坐标.
    ///
    /// 体素索引按 [`VOXEL_PITCH_NM`] 逐轴缩放.
    fn physical_coords(&self) -> Vec<[f64; 3]> {
        let [px, py, pz] = VOXEL_PITCH_NM;
        self.rows
            .iter()
            .map(|r| [r.x * px, r.y * py, r.z * pz])
            .collect()
    }

    /// 行索引按样本分组. 分组按样本首次出现的顺序排列.
    fn sample_groups(&self) -> Vec<Vec<usize>> {
        let mut slot: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = vec![];
        for (i, row) in self.rows.iter().enumerate() {
            let sid = row.sample_id.as_str();
            let g = *slot.entry(sid).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[g].push(i);
        }
        groups
    }

    /// 对单个样本的行集合计算邻居数. 返回值与 `rows_idx` 对齐.
    fn sample_neighbor_counts(coords: &[[f64; 3]], rows_idx: &[usize], radius_nm: f64) -> Vec<u64> {
        let pts: Vec<[f64; 3]> = rows_idx.iter().map(|&i| coords[i]).collect();
        let tree = RTree::bulk_load(pts.clone());
        let r2 = radius_nm * radius_nm;
        pts.iter()
            .map(|p| {
                // 球查询包含自身, 统计时减掉.
                (tree.locate_within_distance(*p, r2).count() - 1) as u64
            })
            .collect()
    }

    /// 计算每行在 `radius_nm` 纳米球内的同样本邻居数, 写入 `neighbors` 列.
    ///
    /// 样本之间完全独立: 不同样本的囊泡即使坐标重合也互不可见.
    /// 默认半径见 [`DEFAULT_NEIGHBOR_RADIUS_NM`].
    pub fn neighbor_counts(&mut self, radius_nm: f64) {
        assert!(radius_nm >= 0.0);
        let coords = self.physical_coords();
        for rows_idx in self.sample_groups() {
            let counts = Self::sample_neighbor_counts(&coords, &rows_idx, radius_nm);
            for (&i, c) in rows_idx.iter().zip(counts) {
                self.rows[i].neighbors = Some(c);
            }
        }
    }

    /// 以默认半径运行 [`Self::neighbor_counts`].
    #[inline]
    pub fn neighbor_counts_default(&mut self) {
        self.neighbor_counts(DEFAULT_NEIGHBOR_RADIUS_NM);
    }

    /// 表格前 `n` 行的文本预览, 用于日志.
    pub fn preview(&self, n: usize) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for row in self.rows.iter().take(n) {
            let _ = writeln!(
                out,
                "{} {} {:?} ({:.2}, {:.2}, {:.2}) vol={} r={:.3} type={:?} nb={:?}",
                row.sample_id,
                row.vesicle_id,
                row.size_class,
                row.x,
                row.y,
                row.z,
                row.volume,
                row.radius,
                row.type_code,
                row.neighbors,
            );
        }
        out
    }

    /// 写出 csv 工件.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), FrameIoError> {
        let mut w = csv::Writer::from_path(path.as_ref())?;
        for row in self.rows.iter() {
            w.serialize(row)?;
        }
        w.flush()?;
        Ok(())
    }

    /// 写出行式 json 工件.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), FrameIoError> {
        let f = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(f, &self.rows).map_err(FrameIoError::Json)
    }

    /// 写出 bincode 紧凑二进制工件.
    pub fn write_bin<P: AsRef<Path>>(&self, path: P) -> Result<(), FrameIoError> {
        let f = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(f, &self.rows).map_err(FrameIoError::Bin)
    }

    /// 按输出扩展名分派持久化格式并写出.
    ///
    /// 未知扩展名会打印一条警告, 并回退为扩展名 `.bin` 的二进制工件
    /// (实际写出路径作为返回值).
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, FrameIoError> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FrameFormat::from_extension);

        let (path, format) = match format {
            Some(f) => (path.to_owned(), f),
            None => {
                let fallback = path.with_extension("bin");
                warn!("不支持的表格扩展名, 回退为二进制: {}", fallback.display());
                (fallback, FrameFormat::Bin)
            }
        };
        match format {
            FrameFormat::Csv => self.write_csv(&path)?,
            FrameFormat::Json => self.write_json(&path)?,
            FrameFormat::Bin => self.write_bin(&path)?,
        }
        Ok(path)
    }

    /// 读回 csv 工件.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, FrameIoError> {
        let mut r = csv::Reader::from_path(path.as_ref())?;
        let rows = r
            .deserialize::<VesicleRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// 读回 bincode 工件.
    pub fn read_bin<P: AsRef<Path>>(path: P) -> Result<Self, FrameIoError> {
        let f = BufReader::new(File::open(path.as_ref())?);
        let rows = bincode::deserialize_from(f).map_err(FrameIoError::Bin)?;
        Ok(Self { rows })
    }

    /// 按扩展名分派读回表格工件 (csv 或 bin).
    ///
    /// json 工件面向查看器, 不支持读回; 未知扩展名按二进制处理.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, FrameIoError> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FrameFormat::from_extension)
        {
            Some(FrameFormat::Csv) => Self::read_csv(path),
            _ => Self::read_bin(path),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl VesicleFrame {
    /// 借助 `rayon`, 按样本并行地计算邻居数. 语义与
    /// [`Self::neighbor_counts`] 完全一致.
    pub fn par_neighbor_counts(&mut self, radius_nm: f64) {
        assert!(radius_nm >= 0.0);
        let coords = self.physical_coords();
        let groups: Vec<(Vec<usize>, Vec<u64>)> = self
            .sample_groups()
            .into_par_iter()
            .map(|rows_idx| {
                let counts = Self::sample_neighbor_counts(&coords, &rows_idx, radius_nm);
                (rows_idx, counts)
            })
            .collect();
        for (rows_idx, counts) in groups {
            for (i, c) in rows_idx.into_iter().zip(counts) {
                self.rows[i].neighbors = Some(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SizeClass;

    fn rec(sample: &str, id: &str, x: f64, y: f64, z: f64) -> VesicleRecord {
        VesicleRecord {
            sample_id: sample.to_owned(),
            size_class: SizeClass::Sv,
            vesicle_id: id.to_owned(),
            x,
            y,
            z,
            volume: 100,
            radius: 3.5,
            type_code: None,
            neighbors: None,
        }
    }

    #[test]
    fn test_from_records_rejects_empty() {
        assert!(matches!(
            VesicleFrame::from_records(vec![]),
            Err(ParseError::NoRecords)
        ));
    }

    #[test]
    fn test_join_labels_fills_unlabeled() {
        let mut frame =
            VesicleFrame::from_records(vec![rec("a", "sv_1", 0.0, 0.0, 0.0), rec("a", "sv_2", 1.0, 1.0, 1.0)])
                .unwrap();
        frame.join_labels(&[LabelEntry {
            sample_id: "a".into(),
            vesicle_id: "sv_1".into(),
            type_code: 7,
        }]);
        assert_eq!(frame.rows()[0].type_code, Some(7));
        assert_eq!(frame.rows()[1].type_code, Some(TYPE_UNLABELED));
    }

    #[test]
    fn test_join_labels_respects_sample() {
        let mut frame = VesicleFrame::from_records(vec![rec("a", "sv_1", 0.0, 0.0, 0.0)]).unwrap();
        frame.join_labels(&[LabelEntry {
            sample_id: "b".into(),
            vesicle_id: "sv_1".into(),
            type_code: 7,
        }]);
        // 样本不同, 不参与连接.
        assert_eq!(frame.rows()[0].type_code, Some(TYPE_UNLABELED));
    }

    #[test]
    fn test_neighbor_counts_pitch_scaling() {
        // x 方向体素间距 30 nm: 相距 10 体素 = 300 nm, 相距 20 体素 = 600 nm.
        let mut frame = VesicleFrame::from_records(vec![
            rec("a", "sv_1", 0.0, 0.0, 0.0),
            rec("a", "sv_2", 10.0, 0.0, 0.0),
            rec("a", "sv_3", 30.0, 0.0, 0.0),
        ])
        .unwrap();
        frame.neighbor_counts(500.0);
        assert_eq!(frame.rows()[0].neighbors, Some(1));
        assert_eq!(frame.rows()[1].neighbors, Some(1));
        assert_eq!(frame.rows()[2].neighbors, Some(0));
    }

    #[test]
    fn test_neighbor_counts_samples_independent() {
        let mut frame = VesicleFrame::from_records(vec![
            rec("a", "sv_1", 0.0, 0.0, 0.0),
            rec("b", "sv_1", 0.0, 0.0, 0.0),
        ])
        .unwrap();
        frame.neighbor_counts(500.0);
        assert_eq!(frame.rows()[0].neighbors, Some(0));
        assert_eq!(frame.rows()[1].neighbors, Some(0));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_neighbor_counts_matches_serial() {
        let rows: Vec<_> = (0..64)
            .map(|i| rec(if i % 2 == 0 { "a" } else { "b" }, "sv", (i / 2) as f64, 0.0, 0.0))
            .collect();
        let mut serial = VesicleFrame::from_records(rows.clone()).unwrap();
        let mut par = VesicleFrame::from_records(rows).unwrap();
        serial.neighbor_counts(500.0);
        par.par_neighbor_counts(500.0);
        for (a, b) in serial.rows().iter().zip(par.rows()) {
            assert_eq!(a.neighbors, b.neighbors);
        }
    }

    #[test]
    fn test_write_dispatch_and_roundtrip() {
        let dir = std::env::temp_dir().join("em_berry_frame_test");
        std::fs::create_dir_all(&dir).unwrap();

        let mut frame = VesicleFrame::from_records(vec![
            rec("a", "sv_1", 1.5, 2.0, 3.0),
            rec("a", "sv_2", 4.0, 5.0, 6.0),
        ])
        .unwrap();
        frame.join_labels(&[]);

        let csv_path = dir.join("t.csv");
        assert_eq!(frame.write(&csv_path).unwrap(), csv_path);
        let back = VesicleFrame::read(&csv_path).unwrap();
        assert_eq!(back.rows(), frame.rows());

        let bin_path = dir.join("t.bin");
        frame.write(&bin_path).unwrap();
        assert_eq!(VesicleFrame::read(&bin_path).unwrap().rows(), frame.rows());

        // 未知扩展名回退为 .bin.
        let odd = dir.join("t.parquet");
        let actual = frame.write(&odd).unwrap();
        assert_eq!(actual, dir.join("t.bin"));
        assert!(actual.is_file());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
