//! 运行配置.
//!
//! 配置是显式传入的只读结构, 各组件不读取任何全局状态.
//! 从 JSON 文件加载后应立即调用 [`PatchConfig::validate`].

use crate::tiling::LabelRuleSet;
use crate::ConfigError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// 标注文件格式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFormat {
    /// GeoJSON polygon features.
    GeoJson,

    /// 厂商 XML (`Type="Polygon"` 元素, 顶点带 `X`/`Y` 属性).
    Xml,
}

impl AnnotationFormat {
    /// 该格式对应的文件扩展名.
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Xml => "xml",
        }
    }
}

/// 单次运行的完整配置.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchConfig {
    /// 切片文件目录.
    pub slides_dir: PathBuf,

    /// 标注文件目录. 标注文件与切片文件按去掉扩展名后的文件名配对.
    pub annotation_dir: PathBuf,

    /// 输出根目录. patch 按标签分子目录存放, manifest 存放在
    /// `meta_data/` 下.
    pub output_dir: PathBuf,

    /// 标注文件格式.
    pub annotation_format: AnnotationFormat,

    /// 组织检测所在的金字塔层级. 缺省时使用最粗层级.
    #[serde(default)]
    pub processing_level: Option<u32>,

    /// tile 边长, 以组织检测层级的像素为单位.
    pub tile_size: usize,

    /// tile 的最小组织覆盖率, 取值于 [0, 1].
    pub tissue_coverage: f64,

    /// patch 边长, 以全分辨率像素为单位.
    pub patch_size: usize,

    /// 相邻 patch 的重叠比例, 取值于 [0, 1).
    pub overlap: f64,

    /// 有序标签规则. 前面的规则优先匹配.
    pub label_rules: LabelRuleSet,

    /// 是否跳过没有标注文件的切片.
    #[serde(default)]
    pub skip_unlabeled_slides: bool,

    /// 是否把 patch 像素写成 PNG 文件. 关闭时只输出 manifest.
    #[serde(default = "default_true")]
    pub save_patches: bool,

    /// 是否输出 tile 覆盖率示意图.
    #[serde(default)]
    pub save_overlay: bool,
}

fn default_true() -> bool {
    true
}

impl PatchConfig {
    /// 从 JSON 文件加载配置并完成校验.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let cfg: Self = serde_json::from_reader(BufReader::new(file))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 校验各字段取值.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size 必须为正".into()));
        }
        if self.patch_size == 0 {
            return Err(ConfigError::Invalid("patch_size 必须为正".into()));
        }
        if !(0.0..=1.0).contains(&self.tissue_coverage) {
            return Err(ConfigError::Invalid(format!(
                "tissue_coverage 必须在 [0, 1] 内, 实际为 {}",
                self.tissue_coverage
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(ConfigError::Invalid(format!(
                "overlap 必须在 [0, 1) 内, 实际为 {}",
                self.overlap
            )));
        }
        if self.label_rules.is_empty() {
            return Err(ConfigError::Invalid("label_rules 不能为空".into()));
        }
        if let Some(rule) = self
            .label_rules
            .iter()
            .find(|r| !(0.0..=1.0).contains(&r.threshold))
        {
            return Err(ConfigError::Invalid(format!(
                "标签 {:?} 的阈值必须在 [0, 1] 内, 实际为 {}",
                rule.label, rule.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json() -> serde_json::Value {
        serde_json::json!({
            "slides_dir": "slides",
            "annotation_dir": "annotations",
            "output_dir": "output",
            "annotation_format": "geojson",
            "processing_level": 3,
            "tile_size": 64,
            "tissue_coverage": 0.7,
            "patch_size": 256,
            "overlap": 0.25,
            "label_rules": [
                {"label": "tumor", "type": "<=", "threshold": 0.9},
                {"label": "normal", "type": "==", "threshold": 0.0}
            ]
        })
    }

    fn from_value(v: serde_json::Value) -> PatchConfig {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_config_parse_and_defaults() {
        let cfg = from_value(base_json());
        cfg.validate().unwrap();

        assert_eq!(cfg.annotation_format, AnnotationFormat::GeoJson);
        assert_eq!(cfg.processing_level, Some(3));
        assert_eq!(cfg.label_rules.len(), 2);

        // 缺省字段.
        assert!(!cfg.skip_unlabeled_slides);
        assert!(cfg.save_patches);
        assert!(!cfg.save_overlay);
    }

    #[test]
    fn test_config_validation() {
        let mut v = base_json();
        v["overlap"] = serde_json::json!(1.0);
        assert!(from_value(v).validate().is_err());

        let mut v = base_json();
        v["tile_size"] = serde_json::json!(0);
        assert!(from_value(v).validate().is_err());

        let mut v = base_json();
        v["label_rules"][0]["threshold"] = serde_json::json!(1.5);
        assert!(from_value(v).validate().is_err());

        let mut v = base_json();
        v["label_rules"] = serde_json::json!([]);
        assert!(from_value(v).validate().is_err());
    }
}
