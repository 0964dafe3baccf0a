use crate::Image;
use ndarray::{ArrayView1, ArrayView3, Axis, Zip};

/// 沿 `axis` 做最大强度投影, 把三维数据压平为二维图像.
///
/// NaN 被忽略; 整条投影线都是 NaN 时结果为 NaN.
///
/// # Panics
///
/// 如果 `axis >= 3`.
pub fn max_projection(stack: ArrayView3<'_, f32>, axis: usize) -> Image {
    assert!(axis < 3, "axis {axis} out of range for 3-D data");
    let reduce = |lane: ArrayView1<'_, f32>| {
        lane.iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f32::max)
            .unwrap_or(f32::NAN)
    };
    let lanes = Zip::from(stack.lanes(Axis(axis)));

    #[cfg(feature = "rayon")]
    let ans = lanes.par_map_collect(reduce);
    #[cfg(not(feature = "rayon"))]
    let ans = lanes.map_collect(reduce);
    ans
}
