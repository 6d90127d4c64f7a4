//! 切片读取.
//!
//! [`SlideReader`] 是外部切片后端的注入点, 接口与 OpenSlide 的
//! `read_region` 族一致. 本模块自带的 [`PyramidSlide`] 以普通位图
//! 文件为底, 用二倍降采样合成金字塔, 便于在没有真实 WSI 后端的
//! 环境下运行完整流水线.

use crate::consts::PYRAMID_MIN_DIM;
use crate::{Idx2d, SlideError};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ndarray::Array3;
use std::path::Path;

/// 金字塔切片的读取接口.
///
/// 与 OpenSlide 约定一致: level 0 为全分辨率, 层级越大分辨率越低;
/// 区域读取的起点总是以 level 0 坐标给出.
pub trait SlideReader {
    /// 金字塔层级数, 至少为 1.
    fn level_count(&self) -> u32;

    /// 指定层级的分辨率 `(宽, 高)`.
    ///
    /// 层级越界属于调用方契约违反, 程序 panic.
    fn level_dimensions(&self, level: u32) -> Idx2d;

    /// 指定层级相对 level 0 的降采样因子.
    ///
    /// 层级越界属于调用方契约违反, 程序 panic.
    fn level_downsample(&self, level: u32) -> f64;

    /// 读取一个矩形区域, 返回 `(高, 宽, 4)` 的 RGBA 像素.
    ///
    /// `pos` 为区域左上角的 **level 0** 坐标 `(x, y)`;
    /// `size` 为 **目标层级** 下的区域大小 `(宽, 高)`.
    /// 区域越界时返回 [`SlideError::OutOfBounds`].
    fn read_region(&self, pos: Idx2d, level: u32, size: Idx2d) -> Result<Array3<u8>, SlideError>;
}

/// 普通位图文件合成的金字塔切片.
///
/// 打开时以原图为 level 0, 逐层二倍降采样, 直到最短边小于
/// [`PYRAMID_MIN_DIM`] 为止. 各层级降采样因子恰为 2 的幂.
pub struct PyramidSlide {
    levels: Vec<RgbaImage>,
}

impl PyramidSlide {
    /// 打开位图文件并构建金字塔.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SlideError> {
        let base = image::open(path.as_ref())?.to_rgba8();
        Ok(Self::from_image(base))
    }

    /// 从内存中的 RGBA 图像直接构建金字塔.
    ///
    /// # 注意
    ///
    /// `base` 的宽高必须为正, 否则程序 panic.
    pub fn from_image(base: RgbaImage) -> Self {
        assert!(
            base.width() > 0 && base.height() > 0,
            "图像尺寸必须为正"
        );
        let mut levels = vec![base];
        loop {
            let last = levels.last().unwrap();
            let (w, h) = (last.width() / 2, last.height() / 2);
            if w.min(h) < PYRAMID_MIN_DIM {
                break;
            }
            levels.push(imageops::resize(last, w, h, FilterType::Triangle));
        }
        Self { levels }
    }

    fn level_image(&self, level: u32) -> &RgbaImage {
        self.levels
            .get(level as usize)
            .unwrap_or_else(|| panic!("金字塔层级 {level} 不存在"))
    }
}

impl SlideReader for PyramidSlide {
    #[inline]
    fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    fn level_dimensions(&self, level: u32) -> Idx2d {
        let img = self.level_image(level);
        (img.width() as usize, img.height() as usize)
    }

    fn level_downsample(&self, level: u32) -> f64 {
        let _ = self.level_image(level);
        (1u64 << level) as f64
    }

    fn read_region(&self, pos: Idx2d, level: u32, size: Idx2d) -> Result<Array3<u8>, SlideError> {
        let img = self.level_image(level);
        let factor = 1usize << level;
        let (x, y) = (pos.0 / factor, pos.1 / factor);
        let (w, h) = size;

        if x + w > img.width() as usize || y + h > img.height() as usize {
            return Err(SlideError::OutOfBounds {
                x: pos.0,
                y: pos.1,
                w,
                h,
                level,
            });
        }

        Ok(Array3::from_shape_fn((h, w, 4), |(yy, xx, c)| {
            img.get_pixel((x + xx) as u32, (y + yy) as u32).0[c]
        }))
    }
}
