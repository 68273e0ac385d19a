//! 囊泡映射/标签文本文件的解析.
//!
//! 映射文件 (`*_mapping.txt`) 的每个条目形如
//! `(z, y, x): ('tag', lv_17, 4096, 1.53e2, ...)`,
//! 依次给出 COM 坐标, 标记名, 囊泡标识符, 体素体积和半径.
//! 标签文件 (`*_{lv,sv}_label.txt`) 的条目形如 `(17:3)`,
//! 为囊泡编号指定整数类型码.
//!
//! 两类文件均透明支持 gzip 压缩 (`.txt.gz`).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 映射条目正则. 坐标为十进制小数, 体积为整数, 半径允许科学计数法.
static MAPPING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\((\d+\.?\d*), (\d+\.?\d*), (\d+\.?\d*)\): \('(\w+)', (\w+_\d+), (\d+), (\d+\.?\d*(?:e[-+]?\d+)?)",
    )
    .unwrap()
});

/// 标签条目正则: `(囊泡编号:类型码)`.
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+):(\d+)\)").unwrap());

/// 解析运行时错误.
#[derive(Debug)]
pub enum ParseError {
    /// 输入既不是 `*_mapping.txt` 文件也不是目录.
    NotMappingInput(PathBuf),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 所有输入中没有任何合法囊泡条目.
    NoRecords,
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// 囊泡尺寸类别. 由文件名推导: 文件名包含 `_lv_` 为大囊泡, 否则为小囊泡.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    /// 大囊泡 (large vesicle).
    #[serde(rename = "lv")]
    Lv,

    /// 小囊泡 (small vesicle).
    #[serde(rename = "sv")]
    Sv,
}

impl SizeClass {
    /// 由文件名推导尺寸类别.
    #[inline]
    pub fn from_file_name(name: &str) -> Self {
        if name.contains("_lv_") {
            SizeClass::Lv
        } else {
            SizeClass::Sv
        }
    }

    /// 类别的小写短名, 同时也是囊泡标识符的前缀.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Lv => "lv",
            SizeClass::Sv => "sv",
        }
    }
}

/// 单个囊泡的 COM 记录.
///
/// 坐标为体素索引 (可以为小数, 因为 COM 是加权平均), 已经换算到表格约定的
/// `(x, y, z)` 轴序. `volume` 为体素个数, `radius` 为等效半径 (体素).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesicleRecord {
    /// 样本标识符 (文件名首个 `_` 之前的部分).
    pub sample_id: String,

    /// 尺寸类别.
    pub size_class: SizeClass,

    /// 囊泡标识符, 形如 `lv_17`.
    pub vesicle_id: String,

    /// COM x 坐标 (体素).
    pub x: f64,

    /// COM y 坐标 (体素).
    pub y: f64,

    /// COM z 坐标 (体素).
    pub z: f64,

    /// 体素体积.
    pub volume: u64,

    /// 等效半径 (体素).
    pub radius: f64,

    /// 标签连接后的类型码. 未连接或未标注时为 `None`.
    #[serde(default)]
    pub type_code: Option<i64>,

    /// 邻居密度统计结果. 未计算时为 `None`.
    #[serde(default)]
    pub neighbors: Option<u64>,
}

/// 单个囊泡的标签行.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabelEntry {
    /// 样本标识符.
    pub sample_id: String,

    /// 囊泡标识符, 形如 `sv_3`.
    pub vesicle_id: String,

    /// 整数类型码.
    pub type_code: i64,
}

/// 读取文本文件全部内容. 扩展名以 `.gz` 结尾时经过 gzip 解压.
fn read_text(path: &Path) -> std::io::Result<String> {
    let mut content = String::new();
    let mut file = File::open(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        GzDecoder::new(file).read_to_string(&mut content)?;
    } else {
        file.read_to_string(&mut content)?;
    }
    Ok(content)
}

/// 文件名 (不含目录) 是否是映射文件?
#[inline]
fn is_mapping_name(name: &str) -> bool {
    name.ends_with("_mapping.txt") || name.ends_with("_mapping.txt.gz")
}

/// 由文件名提取样本标识符: 文件名首个 `_` 之前的部分.
fn sample_id_of(path: &Path) -> String {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("映射/标签文件名必须是合法 UTF-8");
    stem.split('_').next().unwrap_or(stem).to_owned()
}

/// 收集映射文件输入.
///
/// `path` 为单个 `*_mapping.txt`/`*_mapping.txt.gz` 文件, 或一个包含
/// 若干此类文件的目录 (按文件名升序返回). 其他输入返回
/// [`ParseError::NotMappingInput`].
pub fn collect_mapping_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>, ParseError> {
    let path = path.as_ref();
    if path.is_file() {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        return if is_mapping_name(name) {
            Ok(vec![path.to_owned()])
        } else {
            Err(ParseError::NotMappingInput(path.to_owned()))
        };
    }
    if !path.is_dir() {
        return Err(ParseError::NotMappingInput(path.to_owned()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_mapping_name)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// 解析一段映射文本. `sample_id` 与 `size_class` 由调用者从文件名提供.
///
/// 不匹配正则的行会被静默跳过. 坐标在此处完成 x/z 交换:
/// 映射文件按 `(z, y, x)` 顺序存储 COM, 记录按 `(x, y, z)` 暴露.
pub fn parse_mapping_text(
    text: &str,
    sample_id: &str,
    size_class: SizeClass,
) -> Vec<VesicleRecord> {
    MAPPING_RE
        .captures_iter(text)
        .map(|cap| {
            // 捕获组依次为文件内的三个坐标, 标记名, 囊泡 id, 体积, 半径.
            // 文件内第一个坐标是 z, 第三个是 x.
            let (z, y, x) = (
                cap[1].parse::<f64>().unwrap(),
                cap[2].parse::<f64>().unwrap(),
                cap[3].parse::<f64>().unwrap(),
            );
            VesicleRecord {
                sample_id: sample_id.to_owned(),
                size_class,
                vesicle_id: cap[5].to_owned(),
                x,
                y,
                z,
                volume: cap[6].parse().unwrap(),
                radius: cap[7].parse().unwrap(),
                type_code: None,
                neighbors: None,
            }
        })
        .collect()
}

/// 解析单个映射文件.
///
/// 样本标识符与尺寸类别由文件名推导. 见 [`parse_mapping_text`].
pub fn parse_mapping_file<P: AsRef<Path>>(path: P) -> Result<Vec<VesicleRecord>, ParseError> {
    let path = path.as_ref();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let size_class = SizeClass::from_file_name(name);
    let sample_id = sample_id_of(path);
    let text = read_text(path)?;
    Ok(parse_mapping_text(&text, &sample_id, size_class))
}

/// 解析一段标签文本. 囊泡标识符由 `prefix` (即尺寸类别短名) 与编号拼接.
pub fn parse_label_text(text: &str, sample_id: &str, prefix: SizeClass) -> Vec<LabelEntry> {
    LABEL_RE
        .captures_iter(text)
        .map(|cap| LabelEntry {
            sample_id: sample_id.to_owned(),
            vesicle_id: format!("{}_{}", prefix.as_str(), &cap[1]),
            type_code: cap[2].parse().unwrap(),
        })
        .collect()
}

/// 解析单个标签文件. 前缀与样本标识符由文件名推导.
pub fn parse_label_file<P: AsRef<Path>>(path: P) -> Result<Vec<LabelEntry>, ParseError> {
    let path = path.as_ref();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let prefix = SizeClass::from_file_name(name);
    let sample_id = sample_id_of(path);
    let text = read_text(path)?;
    Ok(parse_label_text(&text, &sample_id, prefix))
}

/// 收集目录下所有标签文件 (`*_lv_label.txt` 与 `*_sv_label.txt`, 含 `.gz`).
pub fn collect_label_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, ParseError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name().and_then(|n| n.to_str()).is_some_and(|n| {
                ["_lv_label.txt", "_sv_label.txt"]
                    .iter()
                    .any(|suf| n.ends_with(suf) || n.ends_with(&format!("{suf}.gz")))
            })
        })
        .collect();
    files.sort();
    Ok(files)
}
