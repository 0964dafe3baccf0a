//! 自动阈值.

use super::finite_range;
use crate::Mask;
use ndarray::ArrayView2;

/// Li 最小交叉熵阈值.
///
/// 从均值出发迭代, 每轮以前景均值和背景均值更新阈值,
/// 直到两轮之差不超过 "相邻不同像素值间距的一半".
/// 非有限值 (NaN, inf) 不参与计算.
///
/// # 退化情况
///
/// - 常数图像: 返回该常数, 此时 [`binarize`] 得到全前景掩膜;
/// - 空图像或没有有限值: 返回 `0.0`.
pub fn threshold_li(image: ArrayView2<'_, f32>) -> f32 {
    let mut values: Vec<f64> = image
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| *v as f64)
        .collect();
    if values.is_empty() {
        log::warn!("li threshold of an image without finite value");
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let image_min = values[0];
    let image_max = values[values.len() - 1];
    if image_min == image_max {
        log::warn!("li threshold of a constant image ({image_min})");
        return image_min as f32;
    }

    let tolerance = values
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min)
        / 2.0;

    // 平移到非负区间, 保证对数有意义.
    values.iter_mut().for_each(|v| *v -= image_min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    let mut t_next = mean;
    let mut t_curr = -2.0 * tolerance;
    while (t_next - t_curr).abs() > tolerance {
        t_curr = t_next;
        // 已排序, 二分找到第一个大于阈值的位置.
        let split = values.partition_point(|v| *v <= t_curr);
        let (back, fore) = values.split_at(split);
        if back.is_empty() || fore.is_empty() {
            break;
        }
        let mean_back = back.iter().sum::<f64>() / back.len() as f64;
        let mean_fore = fore.iter().sum::<f64>() / fore.len() as f64;
        if mean_back == 0.0 {
            break;
        }
        t_next = (mean_back - mean_fore) / (mean_back.ln() - mean_fore.ln());
    }
    (t_next + image_min) as f32
}

/// Otsu 阈值. 使用 256 个等宽直方图桶, 返回类间方差最大处的桶中心.
///
/// 常数图像返回该常数; 空图像返回 `0.0`.
pub fn threshold_otsu(image: ArrayView2<'_, f32>) -> f32 {
    const BINS: usize = 256;

    let Some((lo, hi)) = finite_range(image.iter()) else {
        return 0.0;
    };
    if lo == hi {
        return lo;
    }
    let width = (hi as f64 - lo as f64) / BINS as f64;
    let mut hist = [0f64; BINS];
    for v in image.iter().filter(|v| v.is_finite()) {
        let bin = ((*v as f64 - lo as f64) / width) as usize;
        hist[bin.min(BINS - 1)] += 1.0;
    }
    let center = |i: usize| lo as f64 + (i as f64 + 0.5) * width;

    let total: f64 = hist.iter().sum();
    let total_sum: f64 = hist.iter().enumerate().map(|(i, c)| c * center(i)).sum();

    let (mut w1, mut sum1) = (0.0, 0.0);
    let (mut best, mut best_var) = (0usize, f64::NEG_INFINITY);
    for (i, c) in hist.iter().enumerate().take(BINS - 1) {
        w1 += c;
        sum1 += c * center(i);
        let w2 = total - w1;
        if w1 == 0.0 || w2 == 0.0 {
            continue;
        }
        let m1 = sum1 / w1;
        let m2 = (total_sum - sum1) / w2;
        let var = w1 * w2 * (m1 - m2).powi(2);
        if var > best_var {
            best_var = var;
            best = i;
        }
    }
    center(best) as f32
}

/// 以 `cutoff` 二值化: `value >= cutoff` 为前景. NaN 为背景.
#[inline]
pub fn binarize(image: ArrayView2<'_, f32>, cutoff: f32) -> Mask {
    image.mapv(|v| v >= cutoff)
}

/// 以 Li 自动阈值提取前景. 返回掩膜与所用阈值.
pub fn foreground(image: ArrayView2<'_, f32>) -> (Mask, f32) {
    let cutoff = threshold_li(image);
    let mask = binarize(image, cutoff);
    log::info!(
        "foreground: cutoff {cutoff}, {} of {} pixels",
        mask.iter().filter(|p| **p).count(),
        mask.len()
    );
    (mask, cutoff)
}

/// 百分位阈值: `value > min + percentile / 100 * (max - min)` 为前景.
///
/// `percentile` 会被截断到 `[0, 100]`. 空图像返回同形状的全背景掩膜.
pub fn threshold_percentile(image: ArrayView2<'_, f32>, percentile: i64) -> Mask {
    let Some((lo, hi)) = finite_range(image.iter()) else {
        return Mask::from_elem(image.dim(), false);
    };
    let p = percentile.clamp(0, 100) as f32 / 100.0;
    let cutoff = lo + p * (hi - lo);
    image.mapv(|v| v > cutoff)
}
