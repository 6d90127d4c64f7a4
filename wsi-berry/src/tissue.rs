//! 组织检测.
//!
//! 把低分辨率层级的 RGB(A) 图像映射为二值组织掩膜: 灰度化后用 Otsu
//! 自动阈值分割, 取较暗的一类为组织 (玻片空白区域接近白色),
//! 再做一次 3x3 膨胀以闭合细小空隙.

use crate::consts::gray::{MASK_BACKGROUND, MASK_TISSUE};
use ndarray::{Array2, ArrayView2, ArrayView3};

/// 对 RGB(A) 图像做组织检测, 返回与输入同空间形状的二值掩膜
/// (组织为 [`MASK_TISSUE`], 其余为 [`MASK_BACKGROUND`]).
///
/// # 注意
///
/// 输入必须为 3 或 4 通道, alpha 通道被忽略; 否则程序 panic.
pub fn detect_tissue(image: ArrayView3<u8>) -> Array2<u8> {
    let gray = to_gray(image);
    let threshold = otsu_threshold(gray.view());
    let mask = gray.mapv(|p| {
        if p <= threshold {
            MASK_TISSUE
        } else {
            MASK_BACKGROUND
        }
    });
    dilate3(mask.view())
}

/// RGB(A) 转单通道灰度 (ITU-R BT.601 加权).
pub fn to_gray(image: ArrayView3<u8>) -> Array2<u8> {
    let (h, w, c) = image.dim();
    assert!(matches!(c, 3 | 4), "只支持 3 或 4 通道图像, 实际为 {c}");

    Array2::from_shape_fn((h, w), |(y, x)| {
        let (r, g, b) = (
            image[[y, x, 0]] as f32,
            image[[y, x, 1]] as f32,
            image[[y, x, 2]] as f32,
        );
        (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8
    })
}

/// Otsu 自动阈值: 在 256 级直方图上最大化类间方差.
///
/// 返回的阈值 `t` 把像素划分为 `p <= t` (暗类) 与 `p > t` (亮类).
pub fn otsu_threshold(gray: ArrayView2<u8>) -> u8 {
    let mut histogram = [0u64; 256];
    for &p in gray.iter() {
        histogram[p as usize] += 1;
    }
    let total = gray.len() as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut weight_b = 0.0;
    let mut max_variance = 0.0;
    let mut threshold = 0u8;

    for (i, &count) in histogram.iter().enumerate() {
        weight_b += count as f64;
        if weight_b == 0.0 {
            continue;
        }
        let weight_f = total - weight_b;
        if weight_f == 0.0 {
            break;
        }
        sum_b += i as f64 * count as f64;

        let mean_b = sum_b / weight_b;
        let mean_f = (sum - sum_b) / weight_f;
        let variance = weight_b * weight_f * (mean_b - mean_f) * (mean_b - mean_f);
        if variance > max_variance {
            max_variance = variance;
            threshold = i as u8;
        }
    }
    threshold
}

/// 3x3 全一核的二值膨胀.
fn dilate3(mask: ArrayView2<u8>) -> Array2<u8> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let y_range = y.saturating_sub(1)..=(y + 1).min(h - 1);
        for ny in y_range {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                if mask[[ny, nx]] == MASK_TISSUE {
                    return MASK_TISSUE;
                }
            }
        }
        MASK_BACKGROUND
    })
}
