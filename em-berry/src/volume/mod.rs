//! 体素掩码数据结构.
//!
//! 两类体数据: [`NeuronMask`] 是 `u8` 二值掩码 (神经元胞体),
//! [`VesicleVolume`] 是 `u32` 逐囊泡 id 分割体. 均以 `.npy` 或
//! `.npz` (指定成员名) 文件打开, 按扩展名分派格式.

use std::fs::File;
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayView2, ArrayViewMut, Axis, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpyExt, ReadNpzError, ReadableElement};

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d};

mod bridge;
mod morph;
mod smooth;

/// npz 默认成员名. 上游导出工具将主数据集命名为 `main`.
pub const DEFAULT_NPZ_MEMBER: &str = "main";

/// 打开掩码文件错误.
#[derive(Debug)]
pub enum OpenMaskError {
    /// 既不是 `.npy` 也不是 `.npz`.
    UnsupportedExtension(std::path::PathBuf),

    /// npz 中不存在请求的成员.
    MissingMember(String),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// npy 解码错误.
    Npy(ReadNpyError),

    /// npz 解码错误.
    Npz(ReadNpzError),
}

impl From<std::io::Error> for OpenMaskError {
    fn from(e: std::io::Error) -> Self {
        OpenMaskError::Io(e)
    }
}

/// 按扩展名分派打开 3D 数组. npz 成员名允许带或不带 `.npy` 后缀.
fn open_array<T: ReadableElement>(
    path: &Path,
    member: Option<&str>,
) -> Result<Array3<T>, OpenMaskError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => {
            let f = File::open(path)?;
            Array3::<T>::read_npy(f).map_err(OpenMaskError::Npy)
        }
        Some("npz") => {
            let f = File::open(path)?;
            let mut npz = NpzReader::new(f).map_err(OpenMaskError::Npz)?;
            let member = member.unwrap_or(DEFAULT_NPZ_MEMBER);
            let names = npz.names().map_err(OpenMaskError::Npz)?;
            let with_suffix = format!("{member}.npy");
            let resolved = [member, with_suffix.as_str()]
                .into_iter()
                .find(|m| names.iter().any(|n| n == m))
                .ok_or_else(|| OpenMaskError::MissingMember(member.to_owned()))?;
            npz.by_name::<OwnedRepr<T>, Ix3>(resolved)
                .map_err(OpenMaskError::Npz)
        }
        _ => Err(OpenMaskError::UnsupportedExtension(path.to_owned())),
    }
}

/// 神经元二值体素掩码. 轴序与存储一致, 记作 `(x, y, z)`;
/// 断层桥接沿第 0 轴 (x, 即切片方向) 进行.
#[derive(Debug, Clone)]
pub struct NeuronMask {
    data: Array3<u8>,
}

impl NeuronMask {
    /// 打开掩码文件. `member` 仅对 `.npz` 有意义, 缺省为
    /// [`DEFAULT_NPZ_MEMBER`].
    pub fn open<P: AsRef<Path>>(path: P, member: Option<&str>) -> Result<Self, OpenMaskError> {
        let data = open_array::<u8>(path.as_ref(), member)?;
        Ok(Self { data })
    }

    /// 从裸数据直接创建掩码实体.
    ///
    /// # 注意
    ///
    /// 体素值应为 0 或任意非零前景值; 该方法主要用于实验目的.
    #[inline]
    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// 数据形状, 记作 `(x, y, z)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }

    /// 切片形状 `(y, z)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, y, z) = self.shape();
        (y, z)
    }

    /// 沿第 0 轴的切片个数.
    #[inline]
    pub fn len_x(&self) -> usize {
        self.shape().0
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (x0, y0, z0): &Idx3d) -> bool {
        let (x, y, z) = self.shape();
        *x0 < x && *y0 < y && *z0 < z
    }

    /// 获取第 `x_index` 层切片视图. 越界时 panic.
    #[inline]
    pub fn slice_at(&self, x_index: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(0), x_index)
    }

    /// 按升序迭代所有切片视图.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, u8>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u8, Ix3> {
        self.data.view_mut()
    }

    /// 前景体素个数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 掩码是否不含任何前景.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.foreground_count() == 0
    }

    /// 将所有非零体素归一为 [`MASK_FOREGROUND`].
    pub fn binarize(&mut self) {
        self.data
            .iter_mut()
            .filter(|p| is_foreground(**p))
            .for_each(|p| *p = MASK_FOREGROUND);
    }

    /// 以 0/1 浮点标量场的形式复制掩码, 供等值面提取.
    pub fn to_scalar_field(&self) -> Array3<f32> {
        self.data
            .map(|&p| if is_foreground(p) { 1.0f32 } else { 0.0 })
    }

    /// 将第 `x_index` 层切片按黑白二值保存为灰度图, 用于 QC.
    ///
    /// 越界时 panic.
    pub fn save_slice_vis<P: AsRef<Path>>(
        &self,
        x_index: usize,
        path: P,
    ) -> image::ImageResult<()> {
        let sli = self.slice_at(x_index);
        let (h, w) = (sli.shape()[0], sli.shape()[1]);
        let mut buf = image::GrayImage::new(w as u32, h as u32);
        for ((y, z), &pix) in sli.indexed_iter() {
            let v = if is_foreground(pix) { WHITE } else { BLACK };
            buf.put_pixel(z as u32, y as u32, image::Luma([v]));
        }
        buf.save(path)
    }
}

/// 囊泡 id 分割体. 0 为背景, 非零值为囊泡标识.
#[derive(Debug, Clone)]
pub struct VesicleVolume {
    data: Array3<u32>,
}

impl VesicleVolume {
    /// 打开分割体文件. `member` 仅对 `.npz` 有意义.
    pub fn open<P: AsRef<Path>>(path: P, member: Option<&str>) -> Result<Self, OpenMaskError> {
        let data = open_array::<u32>(path.as_ref(), member)?;
        Ok(Self { data })
    }

    /// 从裸数据直接创建实体. 主要用于实验目的.
    #[inline]
    pub fn from_array(data: Array3<u32>) -> Self {
        Self { data }
    }

    /// 数据形状, 记作 `(x, y, z)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u32, Ix3> {
        self.data.view()
    }

    /// 分割体中值为 `id` 的体素个数.
    #[inline]
    pub fn count(&self, id: u32) -> usize {
        self.data.iter().filter(|p| **p == id).count()
    }

    /// 不同囊泡 id 的个数 (不含背景 0).
    pub fn distinct_ids(&self) -> usize {
        use itertools::Itertools;

        self.data.iter().filter(|p| **p != 0).unique().count()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Zip;
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl NeuronMask {
    /// 借助 `rayon`, 并行地将所有非零体素归一为 [`MASK_FOREGROUND`].
    pub fn par_binarize(&mut self) {
        Zip::from(&mut self.data).par_for_each(|p| {
            if is_foreground(*p) {
                *p = MASK_FOREGROUND;
            }
        });
    }
}
