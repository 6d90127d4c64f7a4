//! 运行时错误.
//!
//! 错误分层与处理策略:
//!
//! 1. 配置错误 ([`ConfigError`]): 对整次运行致命, 由调用者终止程序;
//! 2. 标注 / 切片错误 ([`AnnotError`], [`SlideError`]): 对单张切片致命,
//!   批处理时记录日志后跳过该切片;
//! 3. 输出错误 ([`SinkError`]): 同上, 按切片隔离;
//! 4. 几何不变量被破坏属于编程错误, 直接 panic, 不进入错误通道.

use std::path::PathBuf;
use thiserror::Error;

/// 配置加载与校验错误.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件不可读.
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件不是合法 JSON 或字段不完整.
    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 字段取值非法 (如 overlap 不在 [0, 1) 内).
    #[error("配置非法: {0}")]
    Invalid(String),
}

/// 标注文件解析错误.
#[derive(Debug, Error)]
pub enum AnnotError {
    /// 标注文件不可读.
    #[error("标注文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    /// GeoJSON 解析失败.
    #[error("GeoJSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 厂商 XML 解析失败.
    #[error("标注 XML 解析失败: {0}")]
    Xml(#[from] roxmltree::Error),

    /// XML 顶点的 `X`/`Y` 属性无法解析为数值.
    #[error("非法顶点坐标: {0:?}")]
    BadVertex(String),

    /// 既不是 geojson 也不是 xml.
    #[error("无法识别的标注格式: {0:?}")]
    UnknownFormat(PathBuf),
}

/// 切片读取错误.
#[derive(Debug, Error)]
pub enum SlideError {
    /// 底层图像文件打开或解码失败.
    #[error("切片图像读取失败: {0}")]
    Image(#[from] image::ImageError),

    /// 区域读取越界.
    #[error("区域读取越界: 层级 {level} 起点 ({x}, {y}) 大小 {w}x{h}")]
    OutOfBounds {
        /// 请求起点 x (level 0 坐标).
        x: usize,
        /// 请求起点 y (level 0 坐标).
        y: usize,
        /// 请求宽度 (目标层级坐标).
        w: usize,
        /// 请求高度 (目标层级坐标).
        h: usize,
        /// 目标层级.
        level: u32,
    },
}

/// patch / manifest 输出错误.
#[derive(Debug, Error)]
pub enum SinkError {
    /// 目录创建或文件写入失败.
    #[error("输出写入失败: {0}")]
    Io(#[from] std::io::Error),

    /// patch 图像编码失败.
    #[error("patch 图像编码失败: {0}")]
    Image(#[from] image::ImageError),

    /// manifest 序列化失败.
    #[error("manifest 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 流水线错误. 各来源错误的汇总类型.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 配置错误.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 标注错误.
    #[error(transparent)]
    Annot(#[from] AnnotError),

    /// 切片错误.
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// 输出错误.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// 切片目录枚举失败.
    #[error("目录读取失败: {0}")]
    Io(#[from] std::io::Error),
}
