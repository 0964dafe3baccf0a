//! 可人工编辑的点集.

use crate::colormap::Rgba;
use crate::consts::{rgba::RED, POINT_SIZE};
use crate::Idx2d;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 二维点坐标 `[行, 列]`, 允许为小数.
pub type Point = [f32; 2];

/// 有序点集, 附带显示尺寸、颜色与当前选中的下标.
///
/// 坐标不强制位于图像内; 越界点在 [`PointSet::to_pixels`] 时被丢弃.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    coords: Vec<Point>,
    selected: BTreeSet<usize>,
    size: f32,
    face_color: Rgba,
}

impl Default for PointSet {
    fn default() -> Self {
        Self {
            coords: Vec::new(),
            selected: BTreeSet::new(),
            size: POINT_SIZE,
            face_color: RED,
        }
    }
}

impl PointSet {
    /// 空点集.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 由整数像素坐标构建点集.
    pub fn from_pixels(pixels: &[Idx2d]) -> Self {
        Self {
            coords: pixels.iter().map(|&(h, w)| [h as f32, w as f32]).collect(),
            ..Default::default()
        }
    }

    /// 设置显示尺寸.
    #[inline]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// 显示尺寸.
    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// 填充颜色.
    #[inline]
    pub fn face_color(&self) -> Rgba {
        self.face_color
    }

    /// 点的个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// 点集是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// 所有点坐标.
    #[inline]
    pub fn coords(&self) -> &[Point] {
        &self.coords
    }

    /// 在末尾添加一个点, 返回它的下标.
    pub fn add(&mut self, point: Point) -> usize {
        self.coords.push(point);
        self.coords.len() - 1
    }

    /// 删除给定下标的点, 越界下标被忽略. 其余点保持原有相对顺序, 选中状态被清空.
    ///
    /// 返回实际删除的个数.
    pub fn remove<I: IntoIterator<Item = usize>>(&mut self, indices: I) -> usize {
        let doomed: BTreeSet<usize> = indices
            .into_iter()
            .filter(|i| *i < self.coords.len())
            .collect();
        let mut index = 0;
        self.coords.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
        self.selected.clear();
        doomed.len()
    }

    /// 设置选中的点. 越界下标被忽略.
    pub fn select<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        let len = self.coords.len();
        self.selected = indices.into_iter().filter(|i| *i < len).collect();
    }

    /// 当前选中的下标.
    #[inline]
    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    /// 删除所有选中的点, 返回删除的个数.
    pub fn remove_selected(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selected);
        self.remove(selected)
    }

    /// 将坐标四舍五入为像素索引. 位于形状为 `shape` 的图像之外的点被丢弃并给出警告.
    pub fn to_pixels(&self, shape: Idx2d) -> Vec<Idx2d> {
        let (h, w) = (shape.0 as f32, shape.1 as f32);
        let mut dropped = 0usize;
        let ans = self
            .coords
            .iter()
            .filter_map(|&[r, c]| {
                let (r, c) = (r.round(), c.round());
                if r >= 0.0 && c >= 0.0 && r < h && c < w {
                    Some((r as usize, c as usize))
                } else {
                    dropped += 1;
                    None
                }
            })
            .collect();
        if dropped > 0 {
            log::warn!("{dropped} point(s) outside image of shape {shape:?} dropped");
        }
        ans
    }
}

#[cfg(feature = "serde")]
impl PointSet {
    /// 以 `bincode` 编码为字节快照, 用于在会话之间保存人工修正结果.
    pub fn to_bytes(&self) -> crate::BerryResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// 从 [`PointSet::to_bytes`] 的输出恢复点集.
    pub fn from_bytes(bytes: &[u8]) -> crate::BerryResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
