//! 流水线驱动.
//!
//! 把组织检测、网格筛选、坐标换算、标注栅格化、patch 细分与分类
//! 串联成单张切片的处理过程, 并在切片目录上批量运行. 核心过程是
//! 严格串行的: 每个 tile 处理完毕后才开始下一个.

use crate::annot::{self, PolygonSet};
use crate::config::PatchConfig;
use crate::sink::{rgba_to_rgb, PatchSink};
use crate::slide::{PyramidSlide, SlideReader};
use crate::tiling::{grid, patch, raster, scale, SlidePatchManifest, TileEntry};
use crate::{tissue, ConfigError, PipelineError};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// 一次批量运行的统计结果.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 成功处理的切片数.
    pub slides: usize,

    /// 因缺少标注被跳过的切片数.
    pub skipped: usize,

    /// 处理失败的切片数.
    pub failed: usize,

    /// 接受的 patch 总数.
    pub patches: usize,
}

/// 切片处理流水线. 配置与输出端在构建时注入, 运行期间只读配置.
pub struct SlidePipeline<S: PatchSink> {
    config: PatchConfig,
    sink: S,
}

impl<S: PatchSink> SlidePipeline<S> {
    /// 以给定配置与输出端构建流水线.
    #[inline]
    pub fn new(config: PatchConfig, sink: S) -> Self {
        Self { config, sink }
    }

    /// 当前配置.
    #[inline]
    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// 处理一张切片: 组织检测 → tile 筛选 → 逐 tile 细分并分类,
    /// 最后写出 manifest. 返回该切片的完整处理结果.
    pub fn process_slide(
        &mut self,
        reader: &dyn SlideReader,
        polygons: &PolygonSet,
        slide_name: &str,
    ) -> Result<SlidePatchManifest, PipelineError> {
        let (config, sink) = (&self.config, &mut self.sink);

        // 组织检测层级: 缺省使用最粗层级.
        let level = config
            .processing_level
            .unwrap_or_else(|| reader.level_count() - 1);
        if level >= reader.level_count() {
            return Err(ConfigError::Invalid(format!(
                "processing_level {level} 超出金字塔层级数 {}",
                reader.level_count()
            ))
            .into());
        }

        let (w, h) = reader.level_dimensions(level);
        let low_res = reader.read_region((0, 0), level, (w, h))?;
        let mask = tissue::detect_tissue(low_res.view());

        let tiles = grid::relevant_tiles(
            mask.view(),
            config.tile_size,
            config.tissue_coverage,
            level,
        );
        log::info!(
            "切片 {slide_name}: 层级 {level} ({w}x{h}), {} 个 tile 覆盖率达标",
            tiles.len()
        );
        if config.save_overlay {
            sink.put_overlay(slide_name, &grid::tile_overlay(mask.view(), &tiles))?;
        }

        let factor = scale::level_factor(reader.level_downsample(level));
        let tile_size0 = scale::to_level0(config.tile_size, factor);
        if config.patch_size > tile_size0 {
            return Err(ConfigError::Invalid(format!(
                "patch_size {} 超过 tile 的全分辨率边长 {tile_size0}",
                config.patch_size
            ))
            .into());
        }

        let mut manifest = SlidePatchManifest::default();
        let progress = ProgressBar::new(tiles.len() as u64);

        for (tile_idx, tile) in tiles.iter().enumerate() {
            let tile_x = scale::to_level0(tile.x, factor);
            let tile_y = scale::to_level0(tile.y, factor);

            let rgba = reader.read_region((tile_x, tile_y), 0, (tile_size0, tile_size0))?;
            let rgb = rgba_to_rgb(rgba.view());
            let annot_mask = raster::rasterize_polygons(polygons, (tile_x, tile_y), tile_size0);

            let save_patches = config.save_patches;
            let patches = patch::subdivide_tile(
                rgb.view(),
                annot_mask.view(),
                config.patch_size,
                config.overlap,
                &config.label_rules,
                slide_name,
                |patch_idx, record, pixels| {
                    if save_patches {
                        sink.put_patch(slide_name, tile_idx, patch_idx, &record.label, pixels)
                    } else {
                        Ok(())
                    }
                },
            )?;

            manifest.insert(
                tile_idx,
                TileEntry {
                    x_pos: tile_x,
                    y_pos: tile_y,
                    size: tile_size0,
                    patches,
                },
            );
            progress.inc(1);
        }
        progress.finish_and_clear();

        sink.put_manifest(slide_name, &manifest)?;
        Ok(manifest)
    }

    /// 批量处理切片目录.
    ///
    /// 切片与标注按去掉扩展名的文件名配对. 单张切片的失败只记录
    /// 日志并计入统计, 不影响其余切片.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let mut slides: Vec<PathBuf> = std::fs::read_dir(&self.config.slides_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        slides.sort();

        let mut summary = RunSummary::default();
        for slide_path in &slides {
            let Some(name) = slide_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let annot_path = self.config.annotation_dir.join(format!(
                "{name}.{}",
                self.config.annotation_format.extension()
            ));

            if !annot_path.is_file() && self.config.skip_unlabeled_slides {
                log::info!("切片 {name} 没有标注文件, 跳过");
                summary.skipped += 1;
                continue;
            }

            match self.process_one(slide_path, &annot_path, name) {
                Ok(manifest) => {
                    summary.slides += 1;
                    summary.patches += manifest.patch_count();
                    log::info!("切片 {name}: 接受 {} 个 patch", manifest.patch_count());
                }
                Err(err) => {
                    summary.failed += 1;
                    log::error!("切片 {name} 处理失败: {err}");
                }
            }
        }
        Ok(summary)
    }

    fn process_one(
        &mut self,
        slide_path: &Path,
        annot_path: &Path,
        name: &str,
    ) -> Result<SlidePatchManifest, PipelineError> {
        let polygons = annot::load_annotations(annot_path)?;
        let reader = PyramidSlide::open(slide_path)?;
        self.process_slide(&reader, &polygons, name)
    }
}
