//! 局部极大值检测.

use crate::consts::{BACKGROUND, PEAK_EXCLUDE_BORDER, PEAK_FOOTPRINT};
use crate::morph::Connectivity;
use crate::{Area2d, Idx2d, Mask};
use itertools::iproduct;
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 局部极大值检测参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeakParams {
    /// 正方形比较窗口的边长, 必须为正奇数.
    pub footprint: usize,

    /// 距图像边缘小于该值的像素不会成为峰.
    pub exclude_border: usize,

    /// 峰值必须**严格大于**该值. 为 `None` 时使用图像最小值.
    pub threshold_abs: Option<f32>,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            footprint: PEAK_FOOTPRINT,
            exclude_border: PEAK_EXCLUDE_BORDER,
            threshold_abs: None,
        }
    }
}

/// 查找 `image` 的局部极大值.
///
/// 一个像素成为候选峰, 当且仅当:
///
/// 1. 它不在边缘排除带内, 且值严格大于阈值;
/// 2. 在以它为中心的 `footprint x footprint` 窗口内,
///    它不小于所有**同标签**像素的值 (未给出 `labels` 时视为同一标签);
/// 3. 给出 `labels` 时, 它的标签不是背景.
///
/// 相互 8-邻接、同标签且同值的候选峰构成平台, 每个平台只保留一个像素:
/// 离平台质心最近者, 距离相同时取行优先序靠前者.
///
/// 结果按行优先序排列, 与峰值大小无关.
///
/// # Panics
///
/// 如果 `params.footprint` 不是正奇数, 或 `labels` 与 `image` 形状不同.
pub fn peak_local_max(
    image: ArrayView2<'_, f32>,
    labels: Option<ArrayView2<'_, u32>>,
    params: &PeakParams,
) -> Vec<Idx2d> {
    assert!(
        params.footprint % 2 == 1,
        "footprint must be a positive odd number, got {}",
        params.footprint
    );
    let shape = image.dim();
    if let Some(l) = labels {
        assert_eq!(l.dim(), shape, "labels and image must have the same shape");
    }
    let label_at = |p: Idx2d| labels.map_or(1, |l| l[p]);

    let candidates = candidate_mask(image, &label_at, params);

    let mut ans: Vec<Idx2d> = plateaus(&candidates, |a, b| {
        label_at(a) == label_at(b) && image[a] == image[b]
    })
    .into_iter()
    .filter_map(|area| nearest_to_centroid(&area))
    .collect();

    ans.sort_unstable();
    log::debug!("{} peaks found", ans.len());
    ans
}

/// 将峰坐标表示为与图像同形状的掩膜. 越界坐标被忽略.
pub fn peak_mask(shape: Idx2d, peaks: &[Idx2d]) -> Mask {
    let mut mask = Mask::from_elem(shape, false);
    for p in peaks.iter().filter(|p| p.0 < shape.0 && p.1 < shape.1) {
        mask[*p] = true;
    }
    mask
}

fn candidate_mask<L>(image: ArrayView2<'_, f32>, label_at: &L, params: &PeakParams) -> Mask
where
    L: Fn(Idx2d) -> u32,
{
    let (h, w) = image.dim();
    let radius = params.footprint / 2;
    let eb = params.exclude_border;
    let threshold = params.threshold_abs.unwrap_or_else(|| {
        image
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f32::INFINITY, f32::min)
    });

    Array2::from_shape_fn((h, w), |pos| {
        let (r, c) = pos;
        if r < eb || c < eb || r + eb >= h || c + eb >= w {
            return false;
        }
        let (value, label) = (image[pos], label_at(pos));
        // NaN 比较总为 false, 自动排除.
        if !(value > threshold) || label == BACKGROUND {
            return false;
        }
        let rows = r.saturating_sub(radius)..(r + radius + 1).min(h);
        let cols = c.saturating_sub(radius)..(c + radius + 1).min(w);
        iproduct!(rows, cols)
            .filter(|q| label_at(*q) == label)
            .all(|q| !(image[q] > value))
    })
}

/// 候选峰中的平台: 相互 8-邻接且满足 `same` 的候选峰构成一个区域.
fn plateaus<F>(candidates: &Mask, same: F) -> Vec<Area2d>
where
    F: Fn(Idx2d, Idx2d) -> bool,
{
    let shape = candidates.dim();
    let mut visited = Mask::from_elem(shape, false);
    let mut bfs_q = VecDeque::new();
    let mut ans = Vec::new();

    for pos in iproduct!(0..shape.0, 0..shape.1) {
        if visited[pos] || !candidates[pos] {
            continue;
        }
        visited[pos] = true;
        bfs_q.push_back(pos);
        let mut area = Area2d::with_capacity(1);
        while let Some(cur) = bfs_q.pop_front() {
            area.push(cur);
            for neigh in Connectivity::Eight.neighbours(cur, shape) {
                if !visited[neigh] && candidates[neigh] && same(cur, neigh) {
                    visited[neigh] = true;
                    bfs_q.push_back(neigh);
                }
            }
        }
        ans.push(area);
    }
    ans
}

/// 离区域质心最近的像素. 距离相同时取行优先序靠前者.
fn nearest_to_centroid(area: &[Idx2d]) -> Option<Idx2d> {
    let n = area.len() as f64;
    let (sh, sw) = area
        .iter()
        .fold((0.0, 0.0), |(a, b), &(h, w)| (a + h as f64, b + w as f64));
    let (ch, cw) = (sh / n, sw / n);
    let dist = |&(h, w): &Idx2d| (h as f64 - ch).powi(2) + (w as f64 - cw).powi(2);
    area.iter().copied().min_by(|a, b| {
        dist(a)
            .total_cmp(&dist(b))
            .then_with(|| a.cmp(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Image;

    #[test]
    fn test_isolated_peaks() {
        let mut image = Image::zeros((20, 20));
        image[(5, 5)] = 3.0;
        image[(14, 12)] = 5.0;
        // 与 (5, 5) 同窗口但更小, 不是峰.
        image[(6, 7)] = 2.0;
        let peaks = peak_local_max(image.view(), None, &PeakParams::default());
        assert_eq!(peaks, vec![(5, 5), (14, 12)]);
        let mask = peak_mask(image.dim(), &peaks);
        assert_eq!(mask.iter().filter(|p| **p).count(), 2);
    }

    #[test]
    fn test_plateau_merged() {
        let mut image = Image::zeros((12, 12));
        for (h, w) in [(5, 5), (5, 6), (6, 5), (6, 6)] {
            image[(h, w)] = 1.0;
        }
        let peaks = peak_local_max(image.view(), None, &PeakParams::default());
        // 四个像素到质心等距, 取行优先序第一个.
        assert_eq!(peaks, vec![(5, 5)]);

        let mut line = Image::zeros((12, 12));
        for w in 3..8 {
            line[(6, w)] = 1.0;
        }
        assert_eq!(
            peak_local_max(line.view(), None, &PeakParams::default()),
            vec![(6, 5)]
        );
    }

    #[test]
    fn test_border_and_threshold() {
        let mut image = Image::zeros((10, 10));
        image[(0, 4)] = 9.0;
        image[(5, 5)] = 1.0;
        let peaks = peak_local_max(image.view(), None, &PeakParams::default());
        assert_eq!(peaks, vec![(5, 5)]);

        let no_border = PeakParams {
            exclude_border: 0,
            ..Default::default()
        };
        let peaks = peak_local_max(image.view(), None, &no_border);
        assert_eq!(peaks, vec![(0, 4), (5, 5)]);

        let high = PeakParams {
            exclude_border: 0,
            threshold_abs: Some(1.0),
            ..Default::default()
        };
        assert_eq!(peak_local_max(image.view(), None, &high), vec![(0, 4)]);

        // 常数图像没有严格大于最小值的像素.
        let flat = Image::from_elem((8, 8), 2.0);
        assert!(peak_local_max(flat.view(), None, &PeakParams::default()).is_empty());
    }

    #[test]
    fn test_labels_restrict_comparison() {
        // 两个相邻区域, 左侧值较小, 但只和同标签像素比较.
        let mut image = Image::zeros((9, 12));
        let mut labels = Array2::<u32>::zeros((9, 12));
        for (h, w) in iproduct!(1..8, 1..6) {
            labels[(h, w)] = 1;
            image[(h, w)] = 1.0;
        }
        for (h, w) in iproduct!(1..8, 6..11) {
            labels[(h, w)] = 2;
            image[(h, w)] = 2.0;
        }
        image[(4, 3)] = 1.5;
        image[(4, 8)] = 3.0;

        let without = peak_local_max(image.view(), None, &PeakParams::default());
        assert!(!without.contains(&(4, 3)));

        let with = peak_local_max(image.view(), Some(labels.view()), &PeakParams::default());
        assert_eq!(with, vec![(4, 3), (4, 8)]);
    }

    #[test]
    #[should_panic]
    fn test_even_footprint_panics() {
        let image = Image::zeros((5, 5));
        let params = PeakParams {
            footprint: 4,
            ..Default::default()
        };
        peak_local_max(image.view(), None, &params);
    }
}
