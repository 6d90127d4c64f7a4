//! tile 的 patch 细分.
//!
//! 以 `patch_size - floor(patch_size * overlap)` 为步长在 tile 上走网格,
//! 末端 patch 夹取到 tile 边界内, 保证每个 patch 恰好为
//! `patch_size x patch_size` 且完全落在 tile 内.

use crate::tiling::label::{annotated_ratio, LabelRuleSet};
use crate::{Idx2d, SinkError};
use ndarray::{s, ArrayView2, ArrayView3};
use serde::Serialize;
use std::collections::BTreeMap;

/// 一个被接受 (匹配到标签) 的 patch, 坐标以 tile 局部像素为单位.
/// 创建后不再修改.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchRecord {
    /// patch 左上角 x (tile 局部坐标).
    pub x_pos: usize,

    /// patch 左上角 y (tile 局部坐标).
    pub y_pos: usize,

    /// patch 边长.
    pub patch_size: usize,

    /// 匹配到的标签.
    pub label: String,

    /// 所属切片名.
    pub slide_name: String,
}

/// 一个 tile 的处理结果: 全分辨率位置尺寸与其中接受的 patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TileEntry {
    /// tile 左上角 x (全分辨率坐标).
    pub x_pos: usize,

    /// tile 左上角 y (全分辨率坐标).
    pub y_pos: usize,

    /// tile 的全分辨率边长.
    pub size: usize,

    /// tile 内接受的 patch, 按 tile 内稠密序号索引.
    pub patches: BTreeMap<usize, PatchRecord>,
}

/// 一张切片的全部处理结果, 按 tile 稠密序号索引.
///
/// 该结构是单张切片处理的可查询输出, 持久化后本 crate 不再读取.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SlidePatchManifest(BTreeMap<usize, TileEntry>);

impl SlidePatchManifest {
    /// 记录序号为 `tile_idx` 的 tile 结果.
    #[inline]
    pub fn insert(&mut self, tile_idx: usize, entry: TileEntry) {
        self.0.insert(tile_idx, entry);
    }

    /// tile 个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否不含任何 tile.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按 tile 序号升序迭代.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&usize, &TileEntry)> {
        self.0.iter()
    }

    /// 所有 tile 中接受的 patch 总数.
    pub fn patch_count(&self) -> usize {
        self.0.values().map(|t| t.patches.len()).sum()
    }
}

/// 由 patch 边长与重叠比例计算网格步长.
///
/// # 注意
///
/// `overlap` 必须在 `[0, 1)` 内, 否则程序 panic.
#[inline]
pub fn patch_step(patch_size: usize, overlap: f64) -> usize {
    assert!(
        (0.0..1.0).contains(&overlap),
        "overlap 必须在 [0, 1) 内, 实际为 {overlap}"
    );
    let px_overlap = (patch_size as f64 * overlap) as usize;
    let step = patch_size - px_overlap;
    debug_assert!(step >= 1);
    step
}

/// 单轴上的 patch 起点序列.
///
/// 从 0 开始按 `step` 递增; 一旦 `起点 + patch_size` 触及或越过
/// `size`, 该起点被夹取为 `size - patch_size`, 并终止此轴的迭代.
/// 因此末端 patch 与邻居的实际重叠可能超过配置的 `overlap`.
///
/// # 注意
///
/// 必须满足 `0 < patch_size <= size`, 否则程序 panic.
pub fn axis_positions(size: usize, patch_size: usize, step: usize) -> Vec<usize> {
    assert!(
        patch_size > 0 && patch_size <= size,
        "patch 边长 {patch_size} 必须为正且不超过 tile 边长 {size}"
    );
    let steps = size.div_ceil(step);

    let mut ans = Vec::with_capacity(steps);
    for i in 0..steps {
        let candidate = i * step;
        if candidate + patch_size >= size {
            ans.push(size - patch_size);
            break;
        }
        ans.push(candidate);
    }
    ans
}

/// 把 tile 细分为 patch 并逐个分类.
///
/// `tile` 为 `(S, S, 3)` 的 RGB 像素, `annot_mask` 为 `(S, S)`
/// 的标注掩膜. 网格按先行后列的顺序走; 匹配到标签的 patch 获得
/// tile 内稠密序号并回调 `on_patch` (序号, 记录, patch 像素),
/// 未匹配的 patch 被静默丢弃.
///
/// 返回按序号索引的全部接受记录.
///
/// # 注意
///
/// `tile` 与 `annot_mask` 的空间尺寸必须一致且为正方形, 否则程序 panic.
pub fn subdivide_tile<F>(
    tile: ArrayView3<u8>,
    annot_mask: ArrayView2<u8>,
    patch_size: usize,
    overlap: f64,
    rules: &LabelRuleSet,
    slide_name: &str,
    mut on_patch: F,
) -> Result<BTreeMap<usize, PatchRecord>, SinkError>
where
    F: FnMut(usize, &PatchRecord, ArrayView3<u8>) -> Result<(), SinkError>,
{
    let (h, w, c) = tile.dim();
    assert_eq!(h, w, "tile 必须为正方形");
    assert_eq!(c, 3, "tile 必须为 RGB 三通道");
    assert_eq!((h, w), annot_mask.dim(), "tile 与标注掩膜尺寸不一致");

    let size = h;
    let mut patches = BTreeMap::new();
    let mut patch_idx = 0usize;

    for (x, y) in patch_positions(size, patch_size, overlap) {
        let patch_mask = annot_mask.slice(s![y..y + patch_size, x..x + patch_size]);
        let Some(label) = rules.classify(annotated_ratio(patch_mask)) else {
            continue;
        };

        let record = PatchRecord {
            x_pos: x,
            y_pos: y,
            patch_size,
            label: label.to_owned(),
            slide_name: slide_name.to_owned(),
        };
        let pixels = tile.slice(s![y..y + patch_size, x..x + patch_size, ..]);
        on_patch(patch_idx, &record, pixels)?;
        patches.insert(patch_idx, record);
        patch_idx += 1;
    }
    Ok(patches)
}

/// 细分产生的 patch 起点总表, 按先行后列排列.
/// [`subdivide_tile`] 按该顺序走网格.
pub fn patch_positions(size: usize, patch_size: usize, overlap: f64) -> Vec<Idx2d> {
    let positions = axis_positions(size, patch_size, patch_step(patch_size, overlap));
    let mut ans = Vec::with_capacity(positions.len() * positions.len());
    for &y in &positions {
        for &x in &positions {
            ans.push((x, y));
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiling::label::{CmpOp, LabelRule};
    use ndarray::{Array2, Array3};

    fn rules_always(label: &str) -> LabelRuleSet {
        // threshold >= p 对任意 p ∈ [0, 1] 成立.
        LabelRuleSet::new(vec![LabelRule {
            label: label.into(),
            op: CmpOp::Ge,
            threshold: 1.0,
        }])
    }

    #[test]
    fn test_axis_clamp_concrete() {
        // tile 100, patch 60, overlap 0: 第二步 60+60 > 100, 夹取到 40.
        assert_eq!(axis_positions(100, 60, 60), vec![0, 40]);
    }

    #[test]
    fn test_axis_exact_fit_stops() {
        // 120 = 2 * 60: 起点 60 处 60+60 == 120 触发夹取 (无位移) 并终止.
        assert_eq!(axis_positions(120, 60, 60), vec![0, 60]);
    }

    #[test]
    fn test_axis_patch_equals_tile() {
        assert_eq!(axis_positions(64, 64, 64), vec![0]);
    }

    #[test]
    fn test_axis_with_overlap() {
        // patch 60, overlap 0.5 -> step 30.
        assert_eq!(patch_step(60, 0.5), 30);
        assert_eq!(axis_positions(100, 60, 30), vec![0, 30, 40]);
    }

    #[test]
    fn test_positions_row_major_and_in_bounds() {
        let pos = patch_positions(100, 60, 0.0);
        assert_eq!(pos, vec![(0, 0), (40, 0), (0, 40), (40, 40)]);
        for (x, y) in pos {
            assert!(x + 60 <= 100 && y + 60 <= 100);
        }
    }

    #[test]
    #[should_panic]
    fn test_patch_larger_than_tile_panics() {
        axis_positions(50, 60, 60);
    }

    #[test]
    fn test_subdivide_all_patches_exact_size() {
        let tile = Array3::<u8>::zeros((100, 100, 3));
        let mask = Array2::<u8>::zeros((100, 100));

        let mut seen = 0usize;
        let records = subdivide_tile(
            tile.view(),
            mask.view(),
            60,
            0.0,
            &rules_always("x"),
            "s",
            |idx, record, pixels| {
                assert_eq!(idx, seen);
                assert_eq!(pixels.dim(), (60, 60, 3));
                assert_eq!(record.patch_size, 60);
                seen += 1;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(seen, 4);
        assert_eq!(records.len(), 4);
        // 稠密序号.
        assert_eq!(records.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_subdivide_follows_patch_positions() {
        let tile = Array3::<u8>::zeros((100, 100, 3));
        let mask = Array2::<u8>::zeros((100, 100));

        let mut visited = Vec::new();
        subdivide_tile(
            tile.view(),
            mask.view(),
            60,
            0.0,
            &rules_always("x"),
            "s",
            |_, record, _| {
                visited.push((record.x_pos, record.y_pos));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(visited, patch_positions(100, 60, 0.0));
    }

    #[test]
    fn test_subdivide_unlabeled_discarded() {
        let tile = Array3::<u8>::zeros((100, 100, 3));
        // 只有左上 60x60 patch 被完全标注.
        let mut mask = Array2::<u8>::zeros((100, 100));
        mask.slice_mut(s![0..60, 0..60]).fill(1);

        // 只接受完全标注的 patch.
        let rules = LabelRuleSet::new(vec![LabelRule {
            label: "full".into(),
            op: CmpOp::Eq,
            threshold: 1.0,
        }]);

        let records = subdivide_tile(
            tile.view(),
            mask.view(),
            60,
            0.0,
            &rules,
            "s",
            |_, _, _| Ok(()),
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let only = &records[&0];
        assert_eq!((only.x_pos, only.y_pos), (0, 0));
        assert_eq!(only.label, "full");
    }

    #[test]
    fn test_subdivide_sink_error_propagates() {
        let tile = Array3::<u8>::zeros((64, 64, 3));
        let mask = Array2::<u8>::zeros((64, 64));
        let result = subdivide_tile(
            tile.view(),
            mask.view(),
            32,
            0.0,
            &rules_always("x"),
            "s",
            |_, _, _| Err(SinkError::Io(std::io::Error::other("写入失败"))),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_counts() {
        let mut manifest = SlidePatchManifest::default();
        let mut entry = TileEntry {
            x_pos: 0,
            y_pos: 0,
            size: 100,
            patches: BTreeMap::new(),
        };
        entry.patches.insert(
            0,
            PatchRecord {
                x_pos: 0,
                y_pos: 0,
                patch_size: 50,
                label: "t".into(),
                slide_name: "s".into(),
            },
        );
        manifest.insert(0, entry);
        manifest.insert(1, TileEntry::default());

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.patch_count(), 1);
    }
}
