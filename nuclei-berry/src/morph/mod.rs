//! 二值形态学操作: 连通分量标记与掩膜清理.

mod clean;
mod label;

pub use clean::{clean, remove_small_holes, remove_small_objects, CleanParams};
pub use label::{label, regions};

pub(crate) use label::{areas_where, foreground_of};

use crate::Idx2d;
use either::Either;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 二维像素邻接规则.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Connectivity {
    /// 上下左右 4-邻接.
    Four,

    /// 4-邻接再加上四个对角方向.
    Eight,
}

impl Connectivity {
    /// 获得 `pos` 在形状为 `(h, w)` 的图像内的所有邻居索引. 保证返回的索引都不越界.
    #[inline]
    pub(crate) fn neighbours(self, pos: Idx2d, (h, w): Idx2d) -> impl Iterator<Item = Idx2d> {
        let inside = move |p: &Idx2d| p.0 < h && p.1 < w;
        match self {
            Self::Four => Either::Left(neighbour4(pos).into_iter().filter(inside)),
            Self::Eight => Either::Right(neighbour8(pos).into_iter().filter(inside)),
        }
    }
}

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 判断一个索引是否位于形状为 `(h, w)` 的图像的边缘.
#[inline]
pub(crate) fn is_at_border((h, w): Idx2d, (h_len, w_len): Idx2d) -> bool {
    h == 0 || h.saturating_add(1) == h_len || w == 0 || w.saturating_add(1) == w_len
}

#[cfg(test)]
mod tests {
    use super::Connectivity;

    #[test]
    fn test_neighbours_clipped_at_corner() {
        let mut n4: Vec<_> = Connectivity::Four.neighbours((0, 0), (3, 3)).collect();
        n4.sort_unstable();
        assert_eq!(n4, vec![(0, 1), (1, 0)]);

        let mut n8: Vec<_> = Connectivity::Eight.neighbours((0, 0), (3, 3)).collect();
        n8.sort_unstable();
        assert_eq!(n8, vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_neighbours_interior() {
        assert_eq!(Connectivity::Four.neighbours((1, 1), (3, 3)).count(), 4);
        assert_eq!(Connectivity::Eight.neighbours((1, 1), (3, 3)).count(), 8);
        // 1x1 图像没有邻居.
        assert_eq!(Connectivity::Eight.neighbours((0, 0), (1, 1)).count(), 0);
    }
}
