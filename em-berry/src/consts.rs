//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 掩码中背景的体素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 掩码中前景 (神经元胞体) 的体素值.
    pub const MASK_FOREGROUND: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 体素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != MASK_BACKGROUND
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 体素各向异性物理尺寸, 以纳米为单位, 按表格列 `(x, y, z)` 排列.
///
/// # 注意
///
/// 该值来自采集协议 (切片方向 30 nm, 面内 8 nm), 不同数据集可能不同.
pub const VOXEL_PITCH_NM: [f64; 3] = [30.0, 8.0, 8.0];

/// 邻居密度统计的默认球半径, 以纳米为单位.
pub const DEFAULT_NEIGHBOR_RADIUS_NM: f64 = 500.0;

/// neuroglancer 风格会话的默认体素分辨率, 以纳米为单位, 按 `(z, y, x)` 排列.
pub const DEFAULT_STATE_RESOLUTION_NM: [u32; 3] = [30, 64, 64];

/// 未标注囊泡的类型码. 标签连接时缺失的行会被填充为该值.
pub const TYPE_UNLABELED: i64 = 0;

/// 囊泡类型码是否代表 "未标注"?
#[inline]
pub const fn is_unlabeled(type_code: i64) -> bool {
    matches!(type_code, TYPE_UNLABELED)
}

/// 个别神经元在 bounds CSV 中的 y 偏移修正量 (体素).
///
/// 该修正继承自原始对齐流程: `SHL17` 的包围盒在导出时少加了一个
/// 子卷偏移, 在读取处补偿.
pub const SHL17_Y_CORRECTION: i64 = 4000;

/// 需要 y 偏移修正的神经元名.
pub const SHL17_NEURON: &str = "SHL17";
