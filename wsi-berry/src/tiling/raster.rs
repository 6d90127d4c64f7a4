//! 标注多边形的栅格化.
//!
//! 多边形以全分辨率切片坐标给出; 栅格化前先平移到 tile 局部坐标,
//! 完全落在 tile 之外的多边形自然地不产生任何像素.

use crate::annot::PolygonSet;
use crate::consts::gray::MASK_ANNOTATED;
use crate::Idx2dF;
use ndarray::Array2;

/// 把多边形集合栅格化为 tile 的标注掩膜.
///
/// `tile_origin` 为 tile 左上角的全分辨率坐标 `(x, y)`, `size`
/// 为 tile 的全分辨率边长. 返回 `size x size` 的二值掩膜,
/// 多边形内部为 [`MASK_ANNOTATED`], 其余为 0. 多个多边形按逻辑或
/// 合并, 重复覆盖与单次覆盖等价.
pub fn rasterize_polygons(
    polygons: &PolygonSet,
    tile_origin: (usize, usize),
    size: usize,
) -> Array2<u8> {
    let mut mask = Array2::<u8>::zeros((size, size));
    let (tile_x, tile_y) = (tile_origin.0 as f64, tile_origin.1 as f64);

    let mut local: Vec<Idx2dF> = Vec::new();
    for polygon in polygons.iter() {
        // 平移到 tile 局部坐标, 顶点取整到最近整数.
        local.clear();
        local.extend(
            polygon
                .iter()
                .map(|&(x, y)| ((x - tile_x).round(), (y - tile_y).round())),
        );
        fill_polygon(&mut mask, &local);
    }
    mask
}

/// 对单个多边形做扫描填充. 顶点为 tile 局部坐标,
/// 首尾顶点不必重复 (闭合是隐含的).
fn fill_polygon(mask: &mut Array2<u8>, verts: &[Idx2dF]) {
    if verts.len() < 3 {
        return;
    }
    let (h, w) = mask.dim();

    // 包围盒裁剪到掩膜范围, 减少逐点测试量.
    let (min_x, min_y, max_x, max_y) = bbox(verts);
    let x0 = min_x.max(0.0) as usize;
    let y0 = min_y.max(0.0) as usize;
    if min_x >= w as f64 || min_y >= h as f64 || max_x < 0.0 || max_y < 0.0 {
        return;
    }
    let x1 = (max_x as usize).min(w - 1);
    let y1 = (max_y as usize).min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            if point_in_polygon((x as f64, y as f64), verts) {
                mask[[y, x]] = MASK_ANNOTATED;
            }
        }
    }
}

/// 射线法 (even-odd) 判断点是否在多边形内.
fn point_in_polygon((x, y): Idx2dF, verts: &[Idx2dF]) -> bool {
    let mut inside = false;
    let n = verts.len();
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = verts[i];
        let (xj, yj) = verts[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn bbox(verts: &[Idx2dF]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for &(x, y) in verts {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}
