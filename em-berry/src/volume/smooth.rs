//! 高斯平滑与阈值化.
//!
//! 掩码以 0/1 浮点场做可分离高斯卷积 (核半径 4 sigma, 对称反射边界),
//! 再以 0.5 为阈值回到二值掩码. 用于在等值面提取前抹平锯齿.

use ndarray::{Array3, Axis};

use super::NeuronMask;
use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};

/// 归一化一维高斯核, 半径为 `4 sigma` 向上取整.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    debug_assert!(sigma > 0.0);
    let radius = (4.0 * sigma).ceil() as i64;
    let mut k: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = k.iter().sum();
    k.iter_mut().for_each(|v| *v /= sum);
    k
}

/// 对称反射索引 (scipy `reflect` 模式): `(d c b a | a b c d | d c b a)`.
fn reflect(mut i: i64, n: i64) -> usize {
    debug_assert!(n >= 1);
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// 沿 `axis` 做一维卷积.
fn convolve_axis(data: &Array3<f64>, axis: usize, kernel: &[f64]) -> Array3<f64> {
    let n = data.shape()[axis] as i64;
    let radius = (kernel.len() / 2) as i64;
    let mut out = Array3::<f64>::zeros(data.raw_dim());

    for (i, mut plane) in out.axis_iter_mut(Axis(axis)).enumerate() {
        for (j, &w) in kernel.iter().enumerate() {
            let src = reflect(i as i64 + j as i64 - radius, n);
            let src_plane = data.index_axis(Axis(axis), src);
            plane.zip_mut_with(&src_plane, |acc, &v| *acc += w * v);
        }
    }
    out
}

/// 平滑实现块
impl NeuronMask {
    /// 以标准差 `sigma` (体素) 的高斯核平滑掩码并重新阈值化, 原地执行.
    ///
    /// 阈值固定为 0.5: 平滑后场值严格大于 0.5 的体素为前景.
    ///
    /// # 注意
    ///
    /// `sigma` 必须为正, 否则程序 panic.
    pub fn gaussian_smooth(&mut self, sigma: f64) {
        assert!(sigma > 0.0);

        let kernel = gaussian_kernel(sigma);
        let mut field = self
            .data()
            .map(|&p| if p == MASK_BACKGROUND { 0.0f64 } else { 1.0 });
        for axis in 0..3 {
            field = convolve_axis(&field, axis, &kernel);
        }

        self.data_mut()
            .zip_mut_with(&field, |p, &v| {
                *p = if v > 0.5 {
                    MASK_FOREGROUND
                } else {
                    MASK_BACKGROUND
                };
            });
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::{gaussian_kernel, reflect};
    use crate::volume::NeuronMask;

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..k.len() / 2 {
            assert_eq!(k[i], k[k.len() - 1 - i]);
        }
        assert!(k[4] > k[3]);
    }

    #[test]
    fn test_reflect_mode() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
    }

    #[test]
    fn test_smooth_removes_lone_voxel() {
        let mut arr = Array3::<u8>::zeros((9, 9, 9));
        arr[(4, 4, 4)] = 1;
        let mut mask = NeuronMask::from_array(arr);
        mask.gaussian_smooth(1.0);
        assert!(mask.is_blank());
    }

    #[test]
    fn test_smooth_keeps_block_interior() {
        let mut arr = Array3::<u8>::zeros((13, 13, 13));
        for x in 3..10 {
            for y in 3..10 {
                for z in 3..10 {
                    arr[(x, y, z)] = 1;
                }
            }
        }
        let mut mask = NeuronMask::from_array(arr);
        mask.gaussian_smooth(1.0);
        // 块中心留存, 远离块的区域仍为背景.
        assert_eq!(mask.data()[(6, 6, 6)], 1);
        assert_eq!(mask.data()[(0, 0, 0)], 0);
        assert!(!mask.is_blank());
    }

    #[test]
    fn test_smooth_blank_stays_blank() {
        let mut mask = NeuronMask::from_array(Array3::<u8>::zeros((5, 5, 5)));
        mask.gaussian_smooth(1.0);
        assert!(mask.is_blank());
    }
}
