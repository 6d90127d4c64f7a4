//! 常用项的一站式导入.

pub use crate::annot::{load_annotations, Polygon, PolygonSet};
pub use crate::config::{AnnotationFormat, PatchConfig};
pub use crate::pipeline::{RunSummary, SlidePipeline};
pub use crate::sink::{FsPatchSink, NullSink, PatchSink};
pub use crate::slide::{PyramidSlide, SlideReader};
pub use crate::tiling::grid::relevant_tiles;
pub use crate::tiling::patch::subdivide_tile;
pub use crate::tiling::raster::rasterize_polygons;
pub use crate::tiling::{
    CmpOp, LabelRule, LabelRuleSet, PatchRecord, SlidePatchManifest, TileDescriptor, TileEntry,
};
pub use crate::tissue::detect_tissue;
pub use crate::PipelineError;
