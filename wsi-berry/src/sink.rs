//! patch 与 manifest 的持久化输出.

use crate::tiling::SlidePatchManifest;
use crate::SinkError;
use image::RgbImage;
use ndarray::ArrayView3;
use std::fs;
use std::path::PathBuf;

/// patch 输出端.
///
/// 流水线通过该 trait 写出结果, 测试中可以用内存实现替换.
pub trait PatchSink {
    /// 写出一个接受的 patch 的像素 (`(P, P, 3)` RGB).
    fn put_patch(
        &mut self,
        slide: &str,
        tile_idx: usize,
        patch_idx: usize,
        label: &str,
        pixels: ArrayView3<u8>,
    ) -> Result<(), SinkError>;

    /// 写出 tile 覆盖率示意图.
    fn put_overlay(&mut self, slide: &str, overlay: &RgbImage) -> Result<(), SinkError>;

    /// 写出一张切片的完整 manifest.
    fn put_manifest(&mut self, slide: &str, manifest: &SlidePatchManifest)
        -> Result<(), SinkError>;
}

/// 文件系统输出端.
///
/// 目录布局 (与原始数据约定一致):
///
/// ```text
/// {root}/{label}/{slide}_{tile}_{patch}.png   -- patch 像素
/// {root}/overlay/{slide}.png                  -- tile 覆盖率示意图
/// {root}/meta_data/{slide}.json               -- manifest
/// ```
#[derive(Debug, Clone)]
pub struct FsPatchSink {
    root: PathBuf,
}

impl FsPatchSink {
    /// 以 `root` 为输出根目录创建输出端. 子目录按需懒创建.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl PatchSink for FsPatchSink {
    fn put_patch(
        &mut self,
        slide: &str,
        tile_idx: usize,
        patch_idx: usize,
        label: &str,
        pixels: ArrayView3<u8>,
    ) -> Result<(), SinkError> {
        let dir = self.root.join(label);
        fs::create_dir_all(&dir)?;

        let (h, w, _) = pixels.dim();
        let mut buf = RgbImage::new(w as u32, h as u32);
        for ((y, x, c), &pix) in pixels.indexed_iter() {
            buf.get_pixel_mut(x as u32, y as u32).0[c] = pix;
        }

        buf.save(dir.join(format!("{slide}_{tile_idx}_{patch_idx}.png")))?;
        Ok(())
    }

    fn put_overlay(&mut self, slide: &str, overlay: &RgbImage) -> Result<(), SinkError> {
        let dir = self.root.join("overlay");
        fs::create_dir_all(&dir)?;
        overlay.save(dir.join(format!("{slide}.png")))?;
        Ok(())
    }

    fn put_manifest(
        &mut self,
        slide: &str,
        manifest: &SlidePatchManifest,
    ) -> Result<(), SinkError> {
        let dir = self.root.join("meta_data");
        fs::create_dir_all(&dir)?;
        let file = fs::File::create(dir.join(format!("{slide}.json")))?;
        serde_json::to_writer(std::io::BufWriter::new(file), manifest)?;
        Ok(())
    }
}

/// 丢弃一切输出的空输出端. 用于只统计不落盘的试运行.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PatchSink for NullSink {
    #[inline]
    fn put_patch(
        &mut self,
        _: &str,
        _: usize,
        _: usize,
        _: &str,
        _: ArrayView3<u8>,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    #[inline]
    fn put_overlay(&mut self, _: &str, _: &RgbImage) -> Result<(), SinkError> {
        Ok(())
    }

    #[inline]
    fn put_manifest(&mut self, _: &str, _: &SlidePatchManifest) -> Result<(), SinkError> {
        Ok(())
    }
}

/// 把 RGBA 像素数组 (形如 `(h, w, 4)`) 转换为丢弃 alpha 的 RGB 数组.
pub fn rgba_to_rgb(rgba: ArrayView3<u8>) -> ndarray::Array3<u8> {
    let (h, w, c) = rgba.dim();
    assert_eq!(c, 4, "输入必须为 RGBA 四通道");
    ndarray::Array3::from_shape_fn((h, w, 3), |(y, x, ch)| rgba[[y, x, ch]])
}
