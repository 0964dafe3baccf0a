//! 精确欧氏距离变换.
//!
//! 实现基于 Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled Functions":
//! 先沿列、再沿行各做一次一维平方距离变换 (下包络抛物线), 最后开方.
//! 时间复杂度 `O(h * w)`.

use crate::{Idx2d, Mask};
use ndarray::{s, Array2, ArrayView2, Axis};

/// 代替正无穷的大数. 保证抛物线交点计算中不出现 `inf - inf`.
const FAR: f64 = 1e20;

/// 计算二值掩膜的欧氏距离变换.
///
/// 每个前景像素的值为其到最近背景像素中心的欧氏距离, 背景像素的值为 `0`.
///
/// # 注意
///
/// 如果掩膜中没有任何背景像素, 则视图像外围一圈为背景,
/// 即每个像素的值为它到图像外最近像素的距离.
pub fn distance_transform_edt(mask: ArrayView2<'_, bool>) -> Array2<f32> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return Array2::zeros((h, w));
    }
    if mask.iter().all(|p| *p) {
        log::warn!("distance transform of a mask without background, padding the border");
        let mut padded = Mask::from_elem((h + 2, w + 2), false);
        padded.slice_mut(s![1..=h, 1..=w]).fill(true);
        return distance_transform_edt(padded.view())
            .slice(s![1..=h, 1..=w])
            .to_owned();
    }

    let mut sq = mask.mapv(|fg| if fg { FAR } else { 0.0 });
    let mut buf = Workspace::new(h.max(w));

    for mut column in sq.axis_iter_mut(Axis(1)) {
        let f: Vec<f64> = column.iter().copied().collect();
        buf.transform(&f);
        column
            .iter_mut()
            .zip(buf.d.iter())
            .for_each(|(dst, src)| *dst = *src);
    }
    for mut row in sq.axis_iter_mut(Axis(0)) {
        let f: Vec<f64> = row.iter().copied().collect();
        buf.transform(&f);
        row.iter_mut()
            .zip(buf.d.iter())
            .for_each(|(dst, src)| *dst = *src);
    }

    sq.mapv(|d| d.sqrt() as f32)
}

/// 一维平方距离变换所需的缓冲区, 在行列之间复用.
struct Workspace {
    /// 输出.
    d: Vec<f64>,
    /// 下包络中抛物线的顶点位置.
    v: Vec<usize>,
    /// 相邻抛物线的分界点.
    z: Vec<f64>,
}

impl Workspace {
    fn new(n: usize) -> Self {
        Self {
            d: Vec::with_capacity(n),
            v: vec![0; n],
            z: vec![0.0; n + 1],
        }
    }

    /// 对 `f` 做一维平方距离变换, 结果写入 `self.d`.
    fn transform(&mut self, f: &[f64]) {
        let n = f.len();
        self.d.clear();
        if n == 0 {
            return;
        }
        let (v, z) = (&mut self.v, &mut self.z);
        let sq = |q: usize| (q * q) as f64;

        let mut k = 0usize;
        v[0] = 0;
        z[0] = f64::NEG_INFINITY;
        z[1] = f64::INFINITY;
        // `f` 有限, 因此 `s` 有限, 永远大于 `z[0]`, `k` 不会下溢.
        let intersect = |q: usize, p: usize| {
            ((f[q] + sq(q)) - (f[p] + sq(p))) / (2.0 * (q - p) as f64)
        };
        for q in 1..n {
            let mut s = intersect(q, v[k]);
            while s <= z[k] {
                k -= 1;
                s = intersect(q, v[k]);
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
        }

        let mut k = 0usize;
        for q in 0..n {
            while z[k + 1] < q as f64 {
                k += 1;
            }
            let p = v[k];
            self.d.push(sq(q.abs_diff(p)) + f[p]);
        }
    }
}

/// 距离图上的最大值位置 (行优先序第一个). 空图返回 `None`.
pub fn argmax(distance: ArrayView2<'_, f32>) -> Option<Idx2d> {
    distance
        .indexed_iter()
        .fold(None, |best: Option<(Idx2d, f32)>, (pos, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((pos, v)),
        })
        .map(|(pos, _)| pos)
}
