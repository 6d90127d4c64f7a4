//! 基于标注覆盖率的 patch 分类.

use crate::consts::gray;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// 规则的比较算子.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    /// 精确相等. 对浮点覆盖率做精确比较, 实际上只对 0.0 和 1.0 有意义.
    #[serde(rename = "==")]
    Eq,

    /// 阈值在左侧的大于等于比较, 即匹配当且仅当 `threshold >= p`.
    ///
    /// # 注意
    ///
    /// 比较方向沿用原始生成器的行为, 与常规读法 (`p >= threshold`)
    /// 相反. 依赖该算子前请确认这正是想要的语义.
    #[serde(rename = ">=")]
    Ge,

    /// 匹配当且仅当 `threshold <= p`.
    #[serde(rename = "<=")]
    Le,
}

/// 单条标签规则: 覆盖率满足比较条件时给出 `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    /// 标签名, 同时用作输出子目录名.
    pub label: String,

    /// 比较算子.
    #[serde(rename = "type")]
    pub op: CmpOp,

    /// 覆盖率阈值, 取值于 [0, 1].
    pub threshold: f64,
}

impl LabelRule {
    /// 判断覆盖率 `p` 是否满足该规则.
    #[inline]
    pub fn matches(&self, p: f64) -> bool {
        match self.op {
            CmpOp::Eq => self.threshold == p,
            CmpOp::Ge => self.threshold >= p,
            CmpOp::Le => self.threshold <= p,
        }
    }
}

/// 有序标签规则集. 匹配时从前往后评估, 第一条满足的规则胜出,
/// 因此规则顺序是语义的一部分.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelRuleSet(Vec<LabelRule>);

impl LabelRuleSet {
    /// 按给定顺序构建规则集.
    #[inline]
    pub fn new(rules: Vec<LabelRule>) -> Self {
        Self(rules)
    }

    /// 规则条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否没有任何规则.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按定义序迭代规则.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, LabelRule> {
        self.0.iter()
    }

    /// 对覆盖率 `p` 做分类, 返回第一条匹配规则的标签.
    /// 没有规则匹配时返回 `None` (该 patch 会被静默丢弃, 不是错误).
    pub fn classify(&self, p: f64) -> Option<&str> {
        self.0
            .iter()
            .find(|rule| rule.matches(p))
            .map(|rule| rule.label.as_str())
    }
}

/// 计算 patch 标注掩膜中被标注像素的占比, 取值于 [0, 1].
#[inline]
pub fn annotated_ratio(mask: ArrayView2<u8>) -> f64 {
    debug_assert_ne!(mask.len(), 0);
    let annotated = mask.iter().filter(|p| gray::is_nonzero(**p)).count();
    annotated as f64 / mask.len() as f64
}
