//! 3D 形态学操作.
//!
//! 结构元固定为 3x3x3 实心盒. 盒形结构元可按轴分解,
//! 因此膨胀/腐蚀均以三次一维滑动极值实现.

use ndarray::{Array3, Axis};

use super::NeuronMask;
use crate::consts::gray::*;

/// 沿 `axis` 做半径 1 的一维滑动极值.
///
/// `oob` 为越界位置的填充值: 膨胀取背景 (越界处没有前景可扩散),
/// 腐蚀取前景 (越界处不约束).
fn axis_extremum(data: &Array3<u8>, axis: usize, take_max: bool, oob: u8) -> Array3<u8> {
    let n = data.shape()[axis];
    let mut out = data.clone();
    for (i, mut lane) in out.axis_iter_mut(Axis(axis)).enumerate() {
        let prev = if i > 0 {
            Some(data.index_axis(Axis(axis), i - 1))
        } else {
            None
        };
        let next = if i + 1 < n {
            Some(data.index_axis(Axis(axis), i + 1))
        } else {
            None
        };
        lane.indexed_iter_mut().for_each(|(pos, p)| {
            let a = prev.map_or(oob, |v| v[pos]);
            let b = next.map_or(oob, |v| v[pos]);
            *p = if take_max {
                (*p).max(a).max(b)
            } else {
                (*p).min(a).min(b)
            };
        });
    }
    out
}

/// 3x3x3 盒形膨胀.
fn dilate_box(data: &Array3<u8>) -> Array3<u8> {
    let mut cur = axis_extremum(data, 0, true, MASK_BACKGROUND);
    cur = axis_extremum(&cur, 1, true, MASK_BACKGROUND);
    axis_extremum(&cur, 2, true, MASK_BACKGROUND)
}

/// 3x3x3 盒形腐蚀.
fn erode_box(data: &Array3<u8>) -> Array3<u8> {
    let mut cur = axis_extremum(data, 0, false, MASK_FOREGROUND);
    cur = axis_extremum(&cur, 1, false, MASK_FOREGROUND);
    axis_extremum(&cur, 2, false, MASK_FOREGROUND)
}

/// 形态学实现块
impl NeuronMask {
    /// 3x3x3 盒形结构元的二值闭运算 (先膨胀后腐蚀), 原地执行.
    ///
    /// 能闭合跨度不超过结构元的缝隙与内部空洞.
    /// 边界规则: 越界体素在膨胀时视为背景, 在腐蚀时视为前景,
    /// 因此对贴边的实心体闭运算是恒等的.
    ///
    /// # 注意
    ///
    /// 调用前应先 `self.binarize()`, 否则非 0/1 体素值的极值
    /// 结果没有形态学意义.
    pub fn binary_closing(&mut self) {
        debug_assert!(self.data().iter().all(|&p| p <= MASK_FOREGROUND));
        let dilated = dilate_box(&self.data);
        self.data = erode_box(&dilated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::NeuronMask;

    fn solid_block(shape: (usize, usize, usize), lo: usize, hi: usize) -> Array3<u8> {
        let mut arr = Array3::<u8>::zeros(shape);
        for x in lo..hi {
            for y in lo..hi {
                for z in lo..hi {
                    arr[(x, y, z)] = 1;
                }
            }
        }
        arr
    }

    #[test]
    fn test_closing_fills_interior_hole() {
        let mut arr = solid_block((7, 7, 7), 1, 6);
        arr[(3, 3, 3)] = 0;
        let mut mask = NeuronMask::from_array(arr);
        mask.binary_closing();
        assert_eq!(mask.data()[(3, 3, 3)], 1);
    }

    #[test]
    fn test_closing_bridges_single_gap() {
        let mut arr = Array3::<u8>::zeros((5, 5, 5));
        arr[(2, 2, 1)] = 1;
        arr[(2, 2, 3)] = 1;
        let mut mask = NeuronMask::from_array(arr);
        mask.binary_closing();
        assert_eq!(mask.data()[(2, 2, 2)], 1);
        // 原有前景不丢失.
        assert_eq!(mask.data()[(2, 2, 1)], 1);
        assert_eq!(mask.data()[(2, 2, 3)], 1);
    }

    #[test]
    fn test_closing_identity_on_solid_interior_block() {
        let arr = solid_block((9, 9, 9), 2, 7);
        let mut mask = NeuronMask::from_array(arr.clone());
        mask.binary_closing();
        assert_eq!(mask.data(), arr.view());
    }

    #[test]
    fn test_closing_identity_on_border_block() {
        // 贴边实心体在边界规则下不被腐蚀.
        let arr = solid_block((4, 4, 4), 0, 4);
        let mut mask = NeuronMask::from_array(arr.clone());
        mask.binary_closing();
        assert_eq!(mask.data(), arr.view());
    }

    #[test]
    fn test_closing_keeps_background_empty() {
        let mut mask = NeuronMask::from_array(Array3::<u8>::zeros((4, 4, 4)));
        mask.binary_closing();
        assert!(mask.is_blank());
    }
}
