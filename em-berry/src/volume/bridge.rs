//! 沿第 0 轴 (切片方向) 的断层桥接.
//!
//! EM 掩码的部分切片可能在上游导出时整层丢失. 桥接规则:
//! 位于两个有效切片之间的空切片取两侧有效切片的体素级交集
//! (保守桥接, 只延续两侧都存在的结构); 两端的空切片复制最近的
//! 有效切片.

use log::warn;
use ndarray::Axis;

use super::NeuronMask;
use crate::consts::gray::is_foreground;

/// 断层桥接实现块
impl NeuronMask {
    /// 含前景的切片索引, 升序.
    fn valid_slices(&self) -> Vec<usize> {
        self.slice_iter()
            .enumerate()
            .filter_map(|(i, s)| s.iter().any(|&p| is_foreground(p)).then_some(i))
            .collect()
    }

    /// 桥接所有空切片, 原地执行. 返回被改写的切片个数.
    ///
    /// 有效切片 (含前景的切片) 永远不会被修改. 若有效切片不足两个,
    /// 打印警告并保持掩码不变.
    pub fn bridge_gaps(&mut self) -> usize {
        let valid = self.valid_slices();
        if valid.len() < 2 {
            warn!("有效切片不足 2 层, 跳过断层桥接");
            return 0;
        }

        let (first, last) = (valid[0], *valid.last().unwrap());
        let mut written = 0usize;

        for x in 0..self.len_x() {
            if valid.binary_search(&x).is_ok() {
                continue;
            }

            // 两侧最近的有效切片.
            let above = valid.partition_point(|&v| v < x);
            let filled = if x < first {
                self.slice_at(first).to_owned()
            } else if x > last {
                self.slice_at(last).to_owned()
            } else {
                let (lo, hi) = (valid[above - 1], valid[above]);
                let mut sli = self.slice_at(lo).to_owned();
                sli.zip_mut_with(&self.slice_at(hi), |a, &b| *a = (*a).min(b));
                sli
            };

            self.data_mut()
                .index_axis_mut(Axis(0), x)
                .assign(&filled);
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use crate::volume::NeuronMask;

    /// 4 层掩码: 第 1, 3 层有前景, 第 0, 2 层为空.
    fn gapped() -> NeuronMask {
        let mut arr = Array3::<u8>::zeros((4, 2, 2));
        // 第 1 层: (0,0) 与 (0,1); 第 3 层: (0,0) 与 (1,1).
        arr[(1, 0, 0)] = 1;
        arr[(1, 0, 1)] = 1;
        arr[(3, 0, 0)] = 1;
        arr[(3, 1, 1)] = 1;
        NeuronMask::from_array(arr)
    }

    #[test]
    fn test_bridge_interior_is_intersection() {
        let mut mask = gapped();
        assert_eq!(mask.bridge_gaps(), 2);
        // 第 2 层 = 第 1 层 ∩ 第 3 层 = {(0,0)}.
        assert_eq!(mask.data()[(2, 0, 0)], 1);
        assert_eq!(mask.data()[(2, 0, 1)], 0);
        assert_eq!(mask.data()[(2, 1, 1)], 0);
    }

    #[test]
    fn test_bridge_ends_copy_nearest() {
        let mut mask = gapped();
        mask.bridge_gaps();
        // 第 0 层复制第 1 层.
        assert_eq!(mask.data()[(0, 0, 0)], 1);
        assert_eq!(mask.data()[(0, 0, 1)], 1);
        assert_eq!(mask.data()[(0, 1, 1)], 0);
    }

    #[test]
    fn test_bridge_preserves_valid_slices() {
        let mut mask = gapped();
        let before: Vec<u8> = mask.slice_at(1).iter().copied().collect();
        mask.bridge_gaps();
        let after: Vec<u8> = mask.slice_at(1).iter().copied().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_bridge_needs_two_valid_slices() {
        let mut arr = Array3::<u8>::zeros((3, 2, 2));
        arr[(1, 0, 0)] = 1;
        let mut mask = NeuronMask::from_array(arr.clone());
        assert_eq!(mask.bridge_gaps(), 0);
        assert_eq!(mask.data(), arr.view());

        let mut blank = NeuronMask::from_array(Array3::<u8>::zeros((3, 2, 2)));
        assert_eq!(blank.bridge_gaps(), 0);
    }
}
