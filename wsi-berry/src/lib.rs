#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将病理全切片 (WSI) 金字塔图像与像素空间的标注多边形转换为
//! 带标签的固定大小训练 patch.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 处理流程
//!
//! 1. 在低分辨率层级上做组织检测, 得到二值组织掩膜 ([`tissue`]);
//! 2. 将掩膜按固定大小划分为网格, 只保留组织覆盖率达标的 tile ([`tiling::grid`]);
//! 3. 通过层级降采样因子把 tile 换算回全分辨率坐标 ([`tiling::scale`]);
//! 4. 对每个 tile 栅格化标注多边形, 得到 tile 内的标注掩膜 ([`tiling::raster`]);
//! 5. 按重叠步长把 tile 细分为 patch, 根据标注覆盖率分类并输出
//!    ([`tiling::patch`], [`tiling::label`]);
//! 6. [`pipeline::SlidePipeline`] 负责串联以上步骤并批量处理切片目录.
//!
//! # 注意
//!
//! 1. 切片读取通过 [`slide::SlideReader`] trait 注入, 本 crate 自带的
//!   [`slide::PyramidSlide`] 只支持普通位图文件; OpenSlide 等真实 WSI
//!   后端可以自行实现该 trait 接入.
//! 2. 在非期望情况下 (违反坐标不变量等), 程序会直接 panic,
//!   而不会导致内存错误. As what Rust promises.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 高精度通用坐标 / 向量. 标注多边形顶点使用该类型.
pub type Idx2dF = (f64, f64);

pub mod consts;

mod error;

pub use error::{AnnotError, ConfigError, PipelineError, SinkError, SlideError};

pub mod annot;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod slide;
pub mod tiling;
pub mod tissue;

pub use annot::PolygonSet;
pub use config::{AnnotationFormat, PatchConfig};
pub use pipeline::{RunSummary, SlidePipeline};
pub use sink::{FsPatchSink, NullSink, PatchSink};
pub use slide::{PyramidSlide, SlideReader};
pub use tiling::{
    LabelRule, LabelRuleSet, PatchRecord, SlidePatchManifest, TileDescriptor, TileEntry,
};

pub mod prelude;
