//! 金字塔层级坐标换算.

/// 把层级降采样因子截断为整数倍率.
///
/// 非整数倍率 (某些扫描仪会产生 4.0000x 之外的 4.0017x 之类的值)
/// 被截断处理, 是已知的近似.
///
/// # 注意
///
/// `downsample` 必须满足 `downsample >= 1.0`, 否则程序 panic.
#[inline]
pub fn level_factor(downsample: f64) -> usize {
    assert!(
        downsample >= 1.0,
        "降采样因子必须 >= 1.0, 实际为 {downsample}"
    );
    downsample as usize
}

/// 将低分辨率层级下的坐标或尺寸换算到全分辨率 (level 0).
#[inline]
pub fn to_level0(value: usize, factor: usize) -> usize {
    debug_assert!(factor >= 1);
    value * factor
}

/// [`to_level0`] 的逆运算. 在因子整除时可精确还原, 否则向下取整.
#[inline]
pub fn from_level0(value: usize, factor: usize) -> usize {
    debug_assert!(factor >= 1);
    value / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_truncation() {
        assert_eq!(level_factor(1.0), 1);
        assert_eq!(level_factor(4.0), 4);
        // 非整数倍率截断.
        assert_eq!(level_factor(4.0017), 4);
        assert_eq!(level_factor(31.9999), 31);
    }

    #[test]
    #[should_panic]
    fn test_factor_below_one() {
        level_factor(0.5);
    }

    #[test]
    fn test_round_trip() {
        let factor = level_factor(16.0);
        for v in [0usize, 1, 17, 640, 12345] {
            let scaled = to_level0(v, factor);
            assert_eq!(from_level0(scaled, factor), v);
        }
    }
}
