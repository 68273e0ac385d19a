#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 EM (电镜) 体数据中囊泡分割与神经元掩码的结构化信息和基础转换算法.
//!
//! 该 crate 是一组 "读输入 -> 调库函数 -> 写输出" 转换管线的公共底座:
//! 文本映射文件解析, 表格化数据集, 体素掩码预处理, 表面网格提取与导出,
//! 以及查看器工件 (HTML bundle / 会话 JSON / 合并场景) 的装配.
//!
//! # 注意
//!
//! 1. 该 crate 面向离线批处理脚本, 不存在常驻服务与并发协调;
//!   `rayon` feature 仅提供数据并行加速.
//! 2. 在非期望情况下 (违反调用契约), 程序会直接 panic, 而不会导致内存错误.
//!   As what Rust promises.
//!
//! # 开发计划
//!
//! ### 映射/标签文本解析 ✅
//!
//! `*_mapping.txt` 与 `*_label.txt` 的正则解析, 透明支持 gzip.
//!
//! 实现位于 `em-berry/src/mapping`.
//!
//! ### 囊泡表格数据集 ✅
//!
//! COM 记录表: 标签左连接, 按样本的邻居密度统计, csv/json/bin 持久化.
//!
//! 实现位于 `em-berry/src/frame`.
//!
//! ### 体素掩码预处理 ✅
//!
//! 3D 闭运算, 沿 x 轴的断层桥接, 高斯平滑与阈值化.
//!
//! 实现位于 `em-berry/src/volume`.
//!
//! ### 表面网格 ✅
//!
//! marching cubes 等值面提取, 二十面体球细分, 孔洞填充,
//! OBJ/PLY/STL/OFF 导出.
//!
//! 实现位于 `em-berry/src/mesh`.
//!
//! ### 查看器工件 ✅
//!
//! HTML bundle 装配, neuroglancer 风格会话 JSON, 偏移合并场景.
//!
//! 实现位于 `em-berry/src/viewer`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

pub mod consts;

mod mapping;

pub use mapping::{
    collect_label_files, collect_mapping_files, parse_label_file, parse_label_text,
    parse_mapping_file, parse_mapping_text, LabelEntry, ParseError, SizeClass, VesicleRecord,
};

mod frame;

pub use frame::{FrameFormat, FrameIoError, VesicleFrame};

/// 体素掩码数据结构与预处理.
pub mod volume;

pub use volume::{NeuronMask, OpenMaskError, VesicleVolume};

/// 三角网格与表面提取.
pub mod mesh;

pub use mesh::{MeshFormat, TriMesh};

pub mod colormap;

pub mod dataset;

pub mod viewer;

pub mod prelude;
