//! 单通道图像滤波: 自动阈值, 高斯平滑, 边缘检测.

mod edges;
mod gaussian;
mod threshold;

pub use edges::{prewitt, roberts, scharr, sobel, sobel_h, sobel_v};
pub use gaussian::gaussian;
pub use threshold::{
    binarize, foreground, threshold_li, threshold_otsu, threshold_percentile,
};

/// 将越界的一维索引按 "最近边缘" 规则折回 `[0, n)`. 要求 `n > 0`.
#[inline]
pub(crate) fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

/// 有限值的最小值与最大值. 图像为空或没有有限值时返回 `None`.
pub(crate) fn finite_range<'a, I>(it: I) -> Option<(f32, f32)>
where
    I: IntoIterator<Item = &'a f32>,
{
    it.into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
