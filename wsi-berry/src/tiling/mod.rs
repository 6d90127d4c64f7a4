//! 分块与标注算法核心.
//!
//! 数据流: 组织掩膜 → [`grid`] 筛选 tile → [`scale`] 换算回全分辨率
//! → [`raster`] 栅格化标注 → [`patch`] 细分 → [`label`] 分类.

pub mod grid;
pub mod label;
pub mod patch;
pub mod raster;
pub mod scale;

pub use grid::TileDescriptor;
pub use label::{CmpOp, LabelRule, LabelRuleSet};
pub use patch::{PatchRecord, SlidePatchManifest, TileEntry};
