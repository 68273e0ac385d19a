//! 数据集操作.
//!
//! 提供迭代器风格的目录数据获取模式, 神经元偏移表与 npz 掩码归档.

use std::path::{Path, PathBuf};

use crate::mapping::{self, ParseError, VesicleRecord};
use crate::volume::{NeuronMask, OpenMaskError};

mod archive;
mod offsets;

pub use archive::{MaskArchive, OpenArchiveError};
pub use offsets::{OffsetError, OffsetTable};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_data_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_data_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 从指定路径创建映射文件加载器.
///
/// 返回的加载器按文件名升序迭代 `path` 下 (或 `path` 本身指向的)
/// 所有映射文件, 逐个产出 `(文件名, 解析结果)`.
pub fn mapping_loader<P: AsRef<Path>>(path: P) -> Result<MappingLoader, ParseError> {
    let mut files = mapping::collect_mapping_files(path)?;
    files.reverse();
    Ok(MappingLoader { files_rev: files })
}

/// 映射文件加载器.
#[derive(Debug)]
pub struct MappingLoader {
    files_rev: Vec<PathBuf>,
}

impl Iterator for MappingLoader {
    type Item = (PathBuf, Result<Vec<VesicleRecord>, ParseError>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files_rev.pop()?;
        let records = mapping::parse_mapping_file(&path);
        Some((path, records))
    }
}

impl ExactSizeIterator for MappingLoader {
    #[inline]
    fn len(&self) -> usize {
        self.files_rev.len()
    }
}

/// 从指定目录创建神经元掩码加载器.
///
/// 返回的加载器按文件名升序迭代目录下所有 `.npy`/`.npz` 文件,
/// 逐个产出 `(神经元名, 打开结果)`. 神经元名为文件主干名.
///
/// # 注意
///
/// `path` 必须是目录, 否则程序 panic.
pub fn mask_loader<P: AsRef<Path>>(path: P) -> std::io::Result<MaskLoader> {
    let path = path.as_ref();
    assert!(path.is_dir());

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "npy" | "npz"))
        })
        .collect();
    files.sort();
    files.reverse();
    Ok(MaskLoader { files_rev: files })
}

/// 神经元掩码加载器.
#[derive(Debug)]
pub struct MaskLoader {
    files_rev: Vec<PathBuf>,
}

impl Iterator for MaskLoader {
    type Item = (String, Result<NeuronMask, OpenMaskError>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files_rev.pop()?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        Some((name, NeuronMask::open(&path, None)))
    }
}

impl ExactSizeIterator for MaskLoader {
    #[inline]
    fn len(&self) -> usize {
        self.files_rev.len()
    }
}
