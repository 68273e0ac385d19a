//! npz 掩码归档.

use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 打开 `MaskArchive` 错误.
#[derive(Debug)]
pub enum OpenArchiveError {
    /// workers 太大. 最多支持 64.
    TooManyWorkers(u32),

    /// 打开 npz 文件错误.
    ReadNpzError(ReadNpzError),

    /// 其他底层 I/O 错误.
    IoError(std::io::Error),
}

/// Npz 掩码归档.
///
/// 该结构可用于建模硬盘上已存储的多个囊泡分割体的压缩文件,
/// 每个成员以神经元名索引.
pub struct MaskArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    turn: AtomicUsize,
}

impl std::fmt::Debug for MaskArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskArchive")
            .field("entries", &self.entries.len())
            .field("turn", &self.turn)
            .finish()
    }
}

impl MaskArchive {
    /// 初始化.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64. 系统会从路径 `p` 打开文件
    /// `workers` 次, 并为每个打开通道指定一个排他入口点 (以期获得更高的并行度).
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> Result<Self, OpenArchiveError> {
        let workers = workers.get();
        if workers > 64 {
            return Err(OpenArchiveError::TooManyWorkers(64));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new()
                .read(true)
                .open(p.as_ref())
                .map_err(OpenArchiveError::IoError)?;
            v.push(Mutex::new(
                NpzReader::new(file).map_err(OpenArchiveError::ReadNpzError)?,
            ));
        }
        Ok(Self {
            entries: v,
            turn: AtomicUsize::new(0),
        })
    }

    /// 将成员名解析为归档内的实际条目名 (允许带或不带 `.npy` 后缀).
    fn resolve_name(&self, name: &str) -> Result<Option<String>, ReadNpzError> {
        let names = self.member_names()?;
        let with_suffix = format!("{name}.npy");
        let resolved = [name, with_suffix.as_str()]
            .into_iter()
            .find(|m| names.iter().any(|n| n == m))
            .map(str::to_owned);
        Ok(resolved)
    }

    /// 归档是否包含名为 `name` 的分割体?
    pub fn contains(&self, name: &str) -> bool {
        self.resolve_name(name).is_ok_and(|r| r.is_some())
    }

    /// 通过成员名获取底层 3D 分割体内容. 成员不存在时返回 `Ok(None)`.
    pub fn volume_by_name(&self, name: &str) -> Result<Option<Array3<u32>>, ReadNpzError> {
        let Some(resolved) = self.resolve_name(name)? else {
            return Ok(None);
        };
        let slot = self.next_slot();
        let mut file = self.entries[slot].lock().unwrap();
        file.by_name::<OwnedRepr<u32>, Ix3>(resolved.as_str())
            .map(Some)
    }

    /// 获取底层 npz 文件包含的所有成员名.
    pub fn member_names(&self) -> Result<Vec<String>, ReadNpzError> {
        let slot = self.next_slot();
        self.entries[slot].lock().unwrap().names()
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    /// 获取底层 npz 文件的分割体个数.
    pub fn member_len(&self) -> usize {
        let slot = self.next_slot();
        self.entries[slot].lock().unwrap().len()
    }

    fn next_slot(&self) -> usize {
        self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::NpzWriter;

    #[test]
    fn test_archive_roundtrip() {
        let dir = std::env::temp_dir().join("em_berry_archive_test");
        std::fs::create_dir_all(&dir).unwrap();
        let p = dir.join("vesicles.npz");

        let mut arr = Array3::<u32>::zeros((2, 2, 2));
        arr[(0, 1, 0)] = 42;
        let mut w = NpzWriter::new(File::create(&p).unwrap());
        w.add_array("KC19", &arr).unwrap();
        w.add_array("SHL17", &Array3::<u32>::zeros((1, 1, 1))).unwrap();
        w.finish().unwrap();

        let archive = MaskArchive::new(NonZeroUsize::new(2).unwrap(), &p).unwrap();
        assert_eq!(archive.worker_len(), 2);
        assert_eq!(archive.member_len(), 2);
        assert!(archive.contains("KC19"));
        assert!(!archive.contains("unknown"));

        let vol = archive.volume_by_name("KC19").unwrap().unwrap();
        assert_eq!(vol[(0, 1, 0)], 42);
        assert!(archive.volume_by_name("unknown").unwrap().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_too_many_workers() {
        let err = MaskArchive::new(NonZeroUsize::new(65).unwrap(), "/nonexistent").unwrap_err();
        assert!(matches!(err, OpenArchiveError::TooManyWorkers(64)));
    }
}
