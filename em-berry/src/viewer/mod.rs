//! 查看器工件装配.
//!
//! 三类离线工件: HTML 查看器 bundle, neuroglancer 风格会话 JSON,
//! 以及偏移合并场景网格. 均为 "读输入 -> 装配 -> 写输出" 的
//! 一次性流程, 不涉及任何常驻服务.

mod bundle;
mod scene;
mod state;

pub use bundle::{build_bundle, BundleError, BundleReport};
pub use scene::{assemble_scene, SceneError, SceneReport};
pub use state::{build_state, CoordinateSpace, SegmentationLayer, StateError, ViewerState};
