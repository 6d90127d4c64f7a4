//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 组织掩膜中, 背景 (玻片空白) 的像素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 组织掩膜中, 组织的像素值.
    pub const MASK_TISSUE: u8 = 0b_1111_1111;

    /// 标注掩膜中, 多边形内部的像素值.
    pub const MASK_ANNOTATED: u8 = 1;

    /// 像素是否是组织?
    #[inline]
    pub const fn is_tissue(p: u8) -> bool {
        matches!(p, MASK_TISSUE)
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }

    /// 像素是否非零 (组织或标注)?
    #[inline]
    pub const fn is_nonzero(p: u8) -> bool {
        !is_background(p)
    }
}

/// tile 覆盖率示意图中, 被接受 tile 边框的 RGB 颜色.
pub const OVERLAY_ACCEPTED_RGB: [u8; 3] = [0b_1111_1111, 0, 0];

/// [`crate::PyramidSlide`] 构建金字塔时, 最粗层级的最小边长.
/// 低于该值后不再继续降采样.
pub const PYRAMID_MIN_DIM: u32 = 256;
