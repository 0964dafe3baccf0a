use super::Connectivity;
use crate::{Area2d, Areas2d, Idx2d, LabelMap, Mask};
use itertools::iproduct;
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// 按照 `connectivity` 规则获取所有满足谓词 `pred` 的区域. 两个像素 `p1` 和 `p2`
/// 属于同一个区域, 当且仅当存在一条从 `p1` 到 `p2` 的相邻路径,
/// 且路径上的所有像素 (包括 `p1` 和 `p2`) 都满足谓词 `pred`.
///
/// 区域按照其行优先序第一个像素排序, 区域内部按 BFS 顺序排列.
pub(crate) fn areas_where<F>(shape: Idx2d, connectivity: Connectivity, pred: F) -> Areas2d
where
    F: Fn(Idx2d) -> bool,
{
    let mut ans = Areas2d::with_capacity(1);
    let mut visited = Array2::from_elem(shape, false);
    let mut bfs_q = VecDeque::with_capacity(16);

    for pos in iproduct!(0..shape.0, 0..shape.1) {
        if visited[pos] || !pred(pos) {
            continue;
        }
        visited[pos] = true;
        bfs_q.push_back(pos);

        let mut this_area = Area2d::with_capacity(1);
        while let Some(cur) = bfs_q.pop_front() {
            this_area.push(cur);
            for neigh in connectivity.neighbours(cur, shape) {
                if !visited[neigh] && pred(neigh) {
                    visited[neigh] = true;
                    bfs_q.push_back(neigh);
                }
            }
        }
        ans.push(this_area);
    }
    ans
}

/// 获得掩膜中所有前景连通区域.
#[inline]
pub fn regions(mask: ArrayView2<'_, bool>, connectivity: Connectivity) -> Areas2d {
    areas_where(mask.dim(), connectivity, |p| mask[p])
}

/// 连通分量标记.
///
/// 返回标签图与区域个数. 区域按照行优先序首次出现的顺序依次编号为 `1, 2, ...`,
/// 背景为 `0`.
pub fn label(mask: ArrayView2<'_, bool>, connectivity: Connectivity) -> (LabelMap, u32) {
    let areas = regions(mask, connectivity);
    let mut labels = LabelMap::zeros(mask.dim());
    for (id, area) in (1u32..).zip(areas.iter()) {
        for pos in area.iter() {
            labels[*pos] = id;
        }
    }
    (labels, areas.len() as u32)
}

/// 将 `labels` 中所有非零位置视为前景.
#[inline]
pub(crate) fn foreground_of(labels: ArrayView2<'_, u32>) -> Mask {
    labels.mapv(|l| l != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_label_connectivity() {
        // 两个像素只在对角线上相邻.
        let mask = array![
            [true, false, false],
            [false, true, false],
            [false, false, false],
        ];
        let (l4, n4) = label(mask.view(), Connectivity::Four);
        assert_eq!(n4, 2);
        assert_eq!(l4[(0, 0)], 1);
        assert_eq!(l4[(1, 1)], 2);

        let (l8, n8) = label(mask.view(), Connectivity::Eight);
        assert_eq!(n8, 1);
        assert_eq!(l8[(0, 0)], 1);
        assert_eq!(l8[(1, 1)], 1);
        assert_eq!(l8[(2, 2)], 0);
    }

    #[test]
    fn test_label_order_and_background() {
        let mask = array![
            [false, false, true, true],
            [true, false, false, false],
            [true, false, true, false],
        ];
        let (labels, n) = label(mask.view(), Connectivity::Eight);
        assert_eq!(n, 3);
        assert_eq!(
            labels,
            array![[0, 0, 1, 1], [2, 0, 0, 0], [2, 0, 3, 0]]
        );
        assert_eq!(foreground_of(labels.view()), mask);
    }

    #[test]
    fn test_empty_mask() {
        let mask = Mask::from_elem((4, 5), false);
        let (labels, n) = label(mask.view(), Connectivity::Four);
        assert_eq!(n, 0);
        assert!(labels.iter().all(|&l| l == 0));
        assert!(regions(mask.view(), Connectivity::Eight).is_empty());
    }
}
