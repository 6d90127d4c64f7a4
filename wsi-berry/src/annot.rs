//! 标注文件解析.
//!
//! 支持两种格式, 按文件扩展名分发:
//!
//! 1. GeoJSON: 取每个 polygon feature 的外环顶点;
//! 2. 厂商 XML: 取所有 `Type="Polygon"` 元素下带 `X`/`Y` 属性的顶点节点.
//!
//! 顶点坐标为全分辨率切片像素坐标, 浮点精度.

use crate::{AnnotError, Idx2dF};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 单个多边形的有序顶点序列. 首尾顶点不必重复, 闭合是隐含的.
pub type Polygon = Vec<Idx2dF>;

/// 一张切片的全部标注多边形, 按解析顺序编号.
///
/// 多边形之间没有顺序语义, 栅格化时按逻辑或合并.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSet(Vec<Polygon>);

impl PolygonSet {
    /// 从多边形列表直接构建.
    #[inline]
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self(polygons)
    }

    /// 多边形个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否没有任何多边形.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按编号升序迭代多边形.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.0.iter()
    }

    /// 获取编号为 `idx` 的多边形. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Polygon> {
        self.0.get(idx)
    }
}

/// 解析标注文件. 扩展名必须是 `geojson` 或 `xml`,
/// 其余一律返回 [`AnnotError::UnknownFormat`].
pub fn load_annotations<P: AsRef<Path>>(path: P) -> Result<PolygonSet, AnnotError> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str());
    match ext {
        Some("geojson") => parse_geojson(&fs::read_to_string(path)?),
        Some("xml") => parse_xml(&fs::read_to_string(path)?),
        _ => Err(AnnotError::UnknownFormat(path.to_owned())),
    }
}

#[derive(Deserialize)]
struct GeoJsonRoot {
    features: Vec<GeoJsonFeature>,
}

#[derive(Deserialize)]
struct GeoJsonFeature {
    geometry: GeoJsonGeometry,
}

#[derive(Deserialize)]
struct GeoJsonGeometry {
    /// polygon 坐标: 环的列表, 每个环是 `[x, y]` 的列表.
    coordinates: Vec<Vec<[f64; 2]>>,
}

/// 解析 GeoJSON 文本. 只处理 polygon feature 的外环 (第 0 个环),
/// 内环 (孔洞) 不支持.
fn parse_geojson(text: &str) -> Result<PolygonSet, AnnotError> {
    let root: GeoJsonRoot = serde_json::from_str(text)?;
    let polygons = root
        .features
        .into_iter()
        .filter_map(|f| f.geometry.coordinates.into_iter().next())
        .map(|ring| ring.into_iter().map(|[x, y]| (x, y)).collect())
        .collect();
    Ok(PolygonSet(polygons))
}

/// 解析厂商 XML 文本.
///
/// 结构约定: 任意层级下属性 `Type="Polygon"` 的元素代表一个多边形,
/// 其子树中所有同时带 `X` 和 `Y` 属性的元素为顶点, 按文档序排列.
fn parse_xml(text: &str) -> Result<PolygonSet, AnnotError> {
    let doc = roxmltree::Document::parse(text)?;

    let mut polygons = Vec::new();
    for node in doc
        .descendants()
        .filter(|n| n.attribute("Type") == Some("Polygon"))
    {
        let mut polygon = Polygon::new();
        for coord in node.descendants() {
            let (Some(x), Some(y)) = (coord.attribute("X"), coord.attribute("Y")) else {
                continue;
            };
            // 无法解析的顶点视为文件损坏.
            let x: f64 = x.parse().map_err(|_| AnnotError::BadVertex(x.to_owned()))?;
            let y: f64 = y.parse().map_err(|_| AnnotError::BadVertex(y.to_owned()))?;
            polygon.push((x, y));
        }
        polygons.push(polygon);
    }
    Ok(PolygonSet(polygons))
}
