use super::clamp_index;
use crate::consts::GAUSSIAN_TRUNCATE;
use crate::Image;
use ndarray::{ArrayView2, ArrayViewMut1, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 并行地对 `across` 轴上的每一条数据做一维卷积.
        fn convolve_axis(image: &mut Image, across: Axis, k: &[f32]) {
            image
                .axis_iter_mut(across)
                .into_par_iter()
                .for_each_init(Vec::new, |scratch, lane| convolve_lane(lane, k, scratch));
        }
    } else {
        /// 对 `across` 轴上的每一条数据做一维卷积.
        fn convolve_axis(image: &mut Image, across: Axis, k: &[f32]) {
            let mut scratch = Vec::new();
            for lane in image.axis_iter_mut(across) {
                convolve_lane(lane, k, &mut scratch);
            }
        }
    }
}

/// 生成归一化的一维高斯核, 半径为 `round(truncate * sigma)`.
fn kernel(sigma: f32) -> Vec<f32> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut k: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / denom).exp()
        })
        .collect();
    let total: f32 = k.iter().sum();
    k.iter_mut().for_each(|v| *v /= total);
    k
}

/// 沿一维数据卷积, 越界取最近的边缘值.
fn convolve_lane(mut lane: ArrayViewMut1<'_, f32>, k: &[f32], scratch: &mut Vec<f32>) {
    let n = lane.len();
    if n == 0 {
        return;
    }
    let radius = (k.len() / 2) as isize;
    scratch.clear();
    scratch.extend(lane.iter().copied());
    for (i, dst) in lane.iter_mut().enumerate() {
        *dst = k
            .iter()
            .enumerate()
            .map(|(j, kv)| {
                let src = i as isize + j as isize - radius;
                kv * scratch[clamp_index(src, n)]
            })
            .sum();
    }
}

/// 可分离高斯平滑, 核截断于 4 倍标准差, 边界取最近的边缘值.
///
/// `sigma <= 0` 或非有限时原样返回输入的拷贝.
pub fn gaussian(image: ArrayView2<'_, f32>, sigma: f32) -> Image {
    let mut ans = image.to_owned();
    if !(sigma.is_finite() && sigma > 0.0) {
        return ans;
    }
    let k = kernel(sigma);
    // 先逐列 (沿 axis 0), 再逐行 (沿 axis 1).
    for across in [Axis(1), Axis(0)] {
        convolve_axis(&mut ans, across, &k);
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    #[test]
    fn test_kernel_normalized() {
        for sigma in [0.5, 1.0, 3.0, 10.0] {
            let k = kernel(sigma);
            assert_eq!(k.len() % 2, 1);
            assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            let r = k.len() / 2;
            assert_eq!(k[r - 1], k[r + 1]);
        }
    }

    #[test]
    fn test_constant_preserved() {
        let image = Image::from_elem((9, 13), 7.0);
        let smooth = gaussian(image.view(), 2.0);
        assert!(smooth.iter().all(|v| (v - 7.0).abs() < 1e-4));
    }

    #[test]
    fn test_impulse_spreads_symmetric() {
        let mut image = Image::zeros((21, 21));
        image[(10, 10)] = 1.0;
        let smooth = gaussian(image.view(), 1.5);
        let total: f32 = smooth.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(smooth[(10, 10)] < 1.0);
        assert!((smooth[(9, 10)] - smooth[(11, 10)]).abs() < 1e-6);
        assert!((smooth[(10, 9)] - smooth[(9, 10)]).abs() < 1e-6);
        assert!(smooth[(10, 10)] > smooth[(10, 12)]);
        // 中心仍然是最大值.
        let max = smooth.iter().copied().fold(f32::MIN, f32::max);
        assert_eq!(max, smooth[(10, 10)]);
    }

    #[test]
    fn test_non_positive_sigma() {
        let mut image = Image::zeros((5, 5));
        image.slice_mut(s![1..3, 1..3]).fill(2.0);
        assert_eq!(gaussian(image.view(), 0.0), image);
        assert_eq!(gaussian(image.view(), -1.0), image);
    }
}
