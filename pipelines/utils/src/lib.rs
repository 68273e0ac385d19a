//! 对 `em-berry::dataset` 的更一层封装. 提供更直接的数据目录定位.

use em_berry::dataset::{self, MappingLoader, MaskLoader};
use em_berry::ParseError;
use std::env;
use std::path::{Path, PathBuf};

/// 获取囊泡映射文件基本路径.
///
/// 1. 若环境变量 `$EM_MAPPING_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/mappings`.
pub fn mapping_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("EM_MAPPING_DIR") {
        PathBuf::from(d)
    } else {
        dataset::home_data_dir_with(["mappings"]).unwrap()
    }
}

/// 获取囊泡标签文件基本路径.
///
/// 1. 若环境变量 `$EM_LABEL_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/labels`.
pub fn label_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("EM_LABEL_DIR") {
        PathBuf::from(d)
    } else {
        dataset::home_data_dir_with(["labels"]).unwrap()
    }
}

/// 获取神经元掩码基本路径.
///
/// 1. 若环境变量 `$EM_MASK_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/masks`.
pub fn mask_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("EM_MASK_DIR") {
        PathBuf::from(d)
    } else {
        dataset::home_data_dir_with(["masks"]).unwrap()
    }
}

/// 获取囊泡映射文件加载器.
pub fn mapping_loader<P: AsRef<Path>>(path: P) -> Result<MappingLoader, ParseError> {
    dataset::mapping_loader(path)
}

/// 从 `$EM_MAPPING_DIR` 或者 `$HOME/dataset/mappings` 下加载囊泡映射文件加载器.
#[inline]
pub fn mapping_loader_from_env_or_home() -> Result<MappingLoader, ParseError> {
    mapping_loader(mapping_dir_from_env_or_home())
}

/// 获取神经元掩码加载器.
pub fn mask_loader<P: AsRef<Path>>(path: P) -> std::io::Result<MaskLoader> {
    dataset::mask_loader(path)
}

/// 从 `$EM_MASK_DIR` 或者 `$HOME/dataset/masks` 下加载神经元掩码加载器.
#[inline]
pub fn mask_loader_from_env_or_home() -> std::io::Result<MaskLoader> {
    mask_loader(mask_dir_from_env_or_home())
}
