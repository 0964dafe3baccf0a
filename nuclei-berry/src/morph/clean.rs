use super::{areas_where, is_at_border, Connectivity};
use crate::consts::{MIN_HOLE_SIZE, MIN_OBJECT_SIZE};
use crate::Mask;
use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 掩膜清理参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CleanParams {
    /// 面积严格小于该值的封闭孔洞会被填充为前景.
    pub min_hole_size: usize,

    /// 面积严格小于该值的前景区域会被移除.
    pub min_object_size: usize,

    /// 孔洞 (背景区域) 的邻接规则. 默认 4-邻接.
    pub hole_connectivity: Connectivity,

    /// 目标 (前景区域) 的邻接规则. 默认 8-邻接.
    pub object_connectivity: Connectivity,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            min_hole_size: MIN_HOLE_SIZE,
            min_object_size: MIN_OBJECT_SIZE,
            hole_connectivity: Connectivity::Four,
            object_connectivity: Connectivity::Eight,
        }
    }
}

impl CleanParams {
    /// 以默认邻接规则和给定门限构建参数.
    #[inline]
    pub fn with_sizes(min_hole_size: usize, min_object_size: usize) -> Self {
        Self {
            min_hole_size,
            min_object_size,
            ..Default::default()
        }
    }
}

/// 将掩膜中的小孔洞填充为前景.
///
/// 孔洞是被前景包围的背景连通区域, 即不接触图像边缘的背景区域.
/// 面积严格小于 `min_hole_size` 的孔洞会被填充.
pub fn remove_small_holes(
    mask: ArrayView2<'_, bool>,
    min_hole_size: usize,
    connectivity: Connectivity,
) -> Mask {
    let shape = mask.dim();
    let mut ans = mask.to_owned();
    for hole in areas_where(shape, connectivity, |p| !mask[p]) {
        if hole.len() < min_hole_size && hole.iter().all(|p| !is_at_border(*p, shape)) {
            hole.into_iter().for_each(|p| ans[p] = true);
        }
    }
    ans
}

/// 将掩膜中面积严格小于 `min_object_size` 的前景连通区域移除.
pub fn remove_small_objects(
    mask: ArrayView2<'_, bool>,
    min_object_size: usize,
    connectivity: Connectivity,
) -> Mask {
    let mut ans = mask.to_owned();
    for object in areas_where(mask.dim(), connectivity, |p| mask[p]) {
        if object.len() < min_object_size {
            object.into_iter().for_each(|p| ans[p] = false);
        }
    }
    ans
}

/// 依次填充小孔洞、移除小目标.
///
/// 对同一组参数, 该操作是幂等的: 填充只会合并前景区域, 移除只会合并背景区域,
/// 因此第一次清理后留下的孔洞和目标都不会再小于门限.
pub fn clean(mask: ArrayView2<'_, bool>, params: &CleanParams) -> Mask {
    let filled = remove_small_holes(mask, params.min_hole_size, params.hole_connectivity);
    let ans = remove_small_objects(
        filled.view(),
        params.min_object_size,
        params.object_connectivity,
    );
    log::debug!(
        "mask cleaned: {} -> {} foreground pixels",
        mask.iter().filter(|p| **p).count(),
        ans.iter().filter(|p| **p).count()
    );
    ans
}
