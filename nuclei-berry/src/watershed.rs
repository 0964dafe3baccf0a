//! 标记控制的分水岭分割.

use crate::consts::BACKGROUND;
use crate::morph::{label, Connectivity};
use crate::{BerryError, Idx2d, LabelMap, Mask};
use binary_heap_plus::BinaryHeap;
use itertools::iproduct;
use ndarray::ArrayView2;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;

/// 分水岭分割的结果.
#[derive(Clone, Debug, PartialEq)]
pub struct Segmented {
    /// 标签图. `0` 为背景.
    pub labels: LabelMap,

    /// 标签图中出现的不同非零标签个数.
    pub count: u32,

    /// 是否因为没有任何有效种子而返回了全背景.
    pub empty_seeds: bool,
}

impl Segmented {
    /// 全背景结果.
    fn empty(shape: Idx2d) -> Self {
        Self {
            labels: LabelMap::zeros(shape),
            count: 0,
            empty_seeds: true,
        }
    }

    /// 可恢复的异常情况. 目前只有空种子集.
    pub fn warning(&self) -> Option<BerryError> {
        self.empty_seeds.then_some(BerryError::EmptySeedSet)
    }
}

/// 由种子坐标生成标记图.
///
/// 越界坐标被丢弃. 相互 8-邻接的种子属于同一个标记,
/// 标记按行优先序依次编号为 `1, 2, ...`. 返回标记图与标记个数.
pub fn markers_from_points(shape: Idx2d, points: &[Idx2d]) -> (LabelMap, u32) {
    let mut seeds = Mask::from_elem(shape, false);
    for p in points {
        if p.0 < shape.0 && p.1 < shape.1 {
            seeds[*p] = true;
        } else {
            log::warn!("seed {p:?} outside image of shape {shape:?}, dropped");
        }
    }
    label(seeds.view(), Connectivity::Eight)
}

/// 从 `markers` 出发, 在 `elevation` 上按高程从低到高淹没.
///
/// - 每个像素被最先到达它的标记占据. 高程相同的像素按照入队顺序处理.
/// - 给出 `mask` 时, 淹没只在掩膜内进行, 掩膜外的标记被忽略, 掩膜外像素保持为 `0`;
///   与任何标记都不连通的掩膜内像素也保持为 `0`.
/// - 没有任何有效标记时, 返回全背景并置位 [`Segmented::empty_seeds`].
///
/// # Panics
///
/// 如果 `markers` 或 `mask` 与 `elevation` 形状不同.
pub fn watershed(
    elevation: ArrayView2<'_, f32>,
    markers: ArrayView2<'_, u32>,
    mask: Option<ArrayView2<'_, bool>>,
    connectivity: Connectivity,
) -> Segmented {
    let shape = elevation.dim();
    assert_eq!(markers.dim(), shape, "markers and elevation must have the same shape");
    if let Some(m) = mask {
        assert_eq!(m.dim(), shape, "mask and elevation must have the same shape");
    }
    let inside = |p: Idx2d| mask.map_or(true, |m| m[p]);

    let mut labels = LabelMap::zeros(shape);
    // 小顶堆: 高程低者先出, 同高程时先入队者先出.
    let mut heap = BinaryHeap::<(OrderedFloat<f32>, u64, Idx2d), _>::new_min();
    let mut age = 0u64;

    for pos in iproduct!(0..shape.0, 0..shape.1) {
        let m = markers[pos];
        if m == BACKGROUND || !inside(pos) {
            continue;
        }
        labels[pos] = m;
        heap.push((OrderedFloat(elevation[pos]), age, pos));
        age += 1;
    }
    if heap.is_empty() {
        log::warn!("watershed without any marker inside the mask, returning background");
        return Segmented::empty(shape);
    }

    while let Some((_, _, pos)) = heap.pop() {
        let current = labels[pos];
        for neigh in connectivity.neighbours(pos, shape) {
            if labels[neigh] != BACKGROUND || !inside(neigh) {
                continue;
            }
            labels[neigh] = current;
            heap.push((OrderedFloat(elevation[neigh]), age, neigh));
            age += 1;
        }
    }

    let count = labels
        .iter()
        .filter(|l| **l != BACKGROUND)
        .collect::<BTreeSet<_>>()
        .len() as u32;
    log::info!("watershed: {count} labels");
    Segmented {
        labels,
        count,
        empty_seeds: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distance_transform_edt;
    use crate::Image;

    fn disk(mask: &mut Mask, (ch, cw): Idx2d, r: usize) {
        for (h, w) in iproduct!(0..mask.dim().0, 0..mask.dim().1) {
            if h.abs_diff(ch).pow(2) + w.abs_diff(cw).pow(2) <= r * r {
                mask[(h, w)] = true;
            }
        }
    }

    fn negated_distance(mask: &Mask) -> Image {
        distance_transform_edt(mask.view()).mapv(|d| -d)
    }

    #[test]
    fn test_two_disjoint_blobs() {
        let mut mask = Mask::from_elem((40, 60), false);
        disk(&mut mask, (20, 15), 8);
        disk(&mut mask, (20, 45), 10);

        let (markers, n) = markers_from_points(mask.dim(), &[(20, 15), (20, 45)]);
        assert_eq!(n, 2);
        let seg = watershed(
            negated_distance(&mask).view(),
            markers.view(),
            Some(mask.view()),
            Connectivity::Four,
        );
        assert!(!seg.empty_seeds);
        assert!(seg.warning().is_none());
        assert_eq!(seg.count, 2);

        for (pos, l) in seg.labels.indexed_iter() {
            match *l {
                0 => assert!(!mask[pos]),
                1 => assert!(mask[pos] && pos.1 < 30),
                2 => assert!(mask[pos] && pos.1 >= 30),
                other => panic!("unexpected label {other}"),
            }
        }
    }

    #[test]
    fn test_touching_blobs_split() {
        let mut mask = Mask::from_elem((30, 50), false);
        disk(&mut mask, (15, 17), 9);
        disk(&mut mask, (15, 31), 9);

        let (markers, _) = markers_from_points(mask.dim(), &[(15, 17), (15, 31)]);
        let seg = watershed(
            negated_distance(&mask).view(),
            markers.view(),
            Some(mask.view()),
            Connectivity::Four,
        );
        assert_eq!(seg.count, 2);
        assert_eq!(seg.labels[(15, 12)], 1);
        assert_eq!(seg.labels[(15, 36)], 2);
        // 每个掩膜像素都被恰好一个标记占据.
        for (pos, l) in seg.labels.indexed_iter() {
            assert_eq!(*l != 0, mask[pos]);
        }
    }

    #[test]
    fn test_empty_markers() {
        let mask = Mask::from_elem((8, 8), true);
        let markers = LabelMap::zeros((8, 8));
        let elevation = Image::zeros((8, 8));
        let seg = watershed(
            elevation.view(),
            markers.view(),
            Some(mask.view()),
            Connectivity::Four,
        );
        assert!(seg.empty_seeds);
        assert!(matches!(seg.warning(), Some(BerryError::EmptySeedSet)));
        assert!(seg.labels.iter().all(|l| *l == 0));
    }

    #[test]
    fn test_markers_outside_mask_ignored() {
        let mut mask = Mask::from_elem((10, 10), false);
        disk(&mut mask, (5, 5), 3);
        let (markers, n) = markers_from_points((10, 10), &[(0, 0), (5, 5), (99, 2)]);
        assert_eq!(n, 2);
        let seg = watershed(
            Image::zeros((10, 10)).view(),
            markers.view(),
            Some(mask.view()),
            Connectivity::Four,
        );
        assert_eq!(seg.count, 1);
        assert_eq!(seg.labels[(0, 0)], 0);
        assert_eq!(seg.labels[(5, 5)], 2);
        assert!(seg.labels.iter().all(|l| *l == 0 || *l == 2));
    }

    #[test]
    fn test_adjacent_seeds_share_marker() {
        let (markers, n) = markers_from_points((6, 6), &[(2, 2), (3, 3), (2, 2)]);
        assert_eq!(n, 1);
        assert_eq!(markers[(2, 2)], 1);
        assert_eq!(markers[(3, 3)], 1);
    }
}
