//! 组织掩膜的网格划分.

use crate::consts::{gray, OVERLAY_ACCEPTED_RGB};
use image::RgbImage;
use itertools::iproduct;
use ndarray::{s, ArrayView2};
use serde::Serialize;

/// 一个组织覆盖率达标的 tile, 坐标以掩膜所在层级的像素为单位.
///
/// 由 [`relevant_tiles`] 创建, 创建后不再修改.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileDescriptor {
    /// tile 左上角 x (列方向).
    pub x: usize,

    /// tile 左上角 y (行方向).
    pub y: usize,

    /// tile 边长.
    pub size: usize,

    /// 掩膜所在的金字塔层级.
    pub level: u32,
}

/// 计算掩膜区域的非零像素占比, 取值于 [0, 1].
#[inline]
pub fn coverage(region: ArrayView2<u8>) -> f64 {
    debug_assert_ne!(region.len(), 0);
    let nonzero = region.iter().filter(|p| gray::is_nonzero(**p)).count();
    nonzero as f64 / region.len() as f64
}

/// 把组织掩膜按 `tile_size` 划分为规则网格, 返回覆盖率不低于
/// `min_coverage` 的 tile, 按行优先序排列.
///
/// 尾部不足一个 tile 的行列直接丢弃, 不参与处理. 这是有意保留的
/// 边界策略, 代价是掩膜边缘最多损失 `tile_size - 1` 像素宽的组织.
///
/// # 注意
///
/// `tile_size` 必须为正, 否则程序 panic.
pub fn relevant_tiles(
    mask: ArrayView2<u8>,
    tile_size: usize,
    min_coverage: f64,
    level: u32,
) -> Vec<TileDescriptor> {
    assert_ne!(tile_size, 0, "tile_size 必须为正");
    let (h, w) = mask.dim();
    let (rows, cols) = (h / tile_size, w / tile_size);

    iproduct!(0..rows, 0..cols)
        .filter_map(|(row, col)| {
            let (y, x) = (row * tile_size, col * tile_size);
            let cell = mask.slice(s![y..y + tile_size, x..x + tile_size]);
            (coverage(cell) >= min_coverage).then_some(TileDescriptor {
                x,
                y,
                size: tile_size,
                level,
            })
        })
        .collect()
}

/// 生成覆盖率示意图: 掩膜灰度转 RGB, 被接受的 tile 用红色边框标出.
///
/// 仅用于人工检查, 不参与后续计算.
pub fn tile_overlay(mask: ArrayView2<u8>, tiles: &[TileDescriptor]) -> RgbImage {
    let (h, w) = mask.dim();
    let mut img = RgbImage::new(w as u32, h as u32);
    for ((y, x), &pix) in mask.indexed_iter() {
        img.put_pixel(x as u32, y as u32, image::Rgb([pix, pix, pix]));
    }

    let red = image::Rgb(OVERLAY_ACCEPTED_RGB);
    for tile in tiles {
        let (x0, y0) = (tile.x as u32, tile.y as u32);
        let (x1, y1) = (x0 + tile.size as u32 - 1, y0 + tile.size as u32 - 1);
        for x in x0..=x1 {
            img.put_pixel(x, y0, red);
            img.put_pixel(x, y1, red);
        }
        for y in y0..=y1 {
            img.put_pixel(x0, y, red);
            img.put_pixel(x1, y, red);
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::MASK_TISSUE;
    use ndarray::Array2;

    #[test]
    fn test_quadrant_mask_single_tile() {
        // 100x100 掩膜, 左上 50x50 全为组织, 其余为背景.
        let mut mask = Array2::<u8>::zeros((100, 100));
        mask.slice_mut(s![0..50, 0..50]).fill(MASK_TISSUE);

        let tiles = relevant_tiles(mask.view(), 50, 0.5, 2);
        assert_eq!(tiles.len(), 1);
        assert_eq!(
            tiles[0],
            TileDescriptor {
                x: 0,
                y: 0,
                size: 50,
                level: 2
            }
        );
    }

    #[test]
    fn test_tiles_never_overlap_and_meet_coverage() {
        let mut mask = Array2::<u8>::zeros((90, 120));
        mask.slice_mut(s![10..70, 5..95]).fill(MASK_TISSUE);

        let tiles = relevant_tiles(mask.view(), 30, 0.4, 0);
        for tile in &tiles {
            let cell = mask.slice(s![tile.y..tile.y + tile.size, tile.x..tile.x + tile.size]);
            assert!(coverage(cell) >= 0.4);
        }
        // 网格对齐的 tile 互不重叠.
        for (i, a) in tiles.iter().enumerate() {
            for b in tiles.iter().skip(i + 1) {
                let apart = a.x + a.size <= b.x
                    || b.x + b.size <= a.x
                    || a.y + a.size <= b.y
                    || b.y + b.size <= a.y;
                assert!(apart, "{a:?} 与 {b:?} 重叠");
            }
        }
    }

    #[test]
    fn test_partial_rows_dropped() {
        // 70x70 掩膜全为组织, tile 50: 只能容纳 1x1 个完整 tile.
        let mask = Array2::<u8>::from_elem((70, 70), MASK_TISSUE);
        let tiles = relevant_tiles(mask.view(), 50, 0.1, 0);
        assert_eq!(tiles.len(), 1);
        assert_eq!((tiles[0].x, tiles[0].y), (0, 0));
    }

    #[test]
    fn test_row_major_order() {
        let mask = Array2::<u8>::from_elem((60, 60), MASK_TISSUE);
        let tiles = relevant_tiles(mask.view(), 30, 0.0, 0);
        let pos: Vec<_> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(pos, vec![(0, 0), (30, 0), (0, 30), (30, 30)]);
    }

    #[test]
    fn test_coverage_range() {
        let mut mask = Array2::<u8>::zeros((4, 4));
        assert_eq!(coverage(mask.view()), 0.0);
        mask.fill(MASK_TISSUE);
        assert_eq!(coverage(mask.view()), 1.0);
        mask.slice_mut(s![0..2, ..]).fill(0);
        assert_eq!(coverage(mask.view()), 0.5);
    }

    #[test]
    fn test_overlay_draws_border() {
        let mask = Array2::<u8>::from_elem((20, 20), MASK_TISSUE);
        let tiles = relevant_tiles(mask.view(), 10, 0.0, 0);
        let img = tile_overlay(mask.view(), &tiles);
        assert_eq!(img.get_pixel(0, 0), &image::Rgb(OVERLAY_ACCEPTED_RGB));
        // tile 内部不上色.
        assert_eq!(img.get_pixel(5, 5), &image::Rgb([MASK_TISSUE; 3]));
    }
}
