//! 边缘检测算子. 越界像素取最近的边缘值.
//!
//! `*_h` 响应水平边缘 (下减上), `*_v` 响应竖直边缘 (右减左).
//! 不带后缀的版本返回两者的均方根幅值.

use super::clamp_index;
use crate::Image;
use ndarray::{ArrayView2, Zip};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_H: Kernel3 = [
    [-0.25, -0.5, -0.25],
    [0.0, 0.0, 0.0],
    [0.25, 0.5, 0.25],
];
const PREWITT_H: Kernel3 = [
    [-1.0 / 3.0, -1.0 / 3.0, -1.0 / 3.0],
    [0.0, 0.0, 0.0],
    [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
];
const SCHARR_H: Kernel3 = [
    [-3.0 / 16.0, -10.0 / 16.0, -3.0 / 16.0],
    [0.0, 0.0, 0.0],
    [3.0 / 16.0, 10.0 / 16.0, 3.0 / 16.0],
];

/// 转置核, 由水平算子得到竖直算子.
const fn transpose(k: Kernel3) -> Kernel3 {
    [
        [k[0][0], k[1][0], k[2][0]],
        [k[0][1], k[1][1], k[2][1]],
        [k[0][2], k[1][2], k[2][2]],
    ]
}

/// 以 3x3 核做相关运算.
fn correlate3(image: ArrayView2<'_, f32>, k: &Kernel3) -> Image {
    let (h, w) = image.dim();
    Image::from_shape_fn((h, w), |(r, c)| {
        let mut acc = 0.0;
        for (dr, row) in k.iter().enumerate() {
            for (dc, kv) in row.iter().enumerate() {
                if *kv == 0.0 {
                    continue;
                }
                let rr = clamp_index(r as isize + dr as isize - 1, h);
                let cc = clamp_index(c as isize + dc as isize - 1, w);
                acc += kv * image[(rr, cc)];
            }
        }
        acc
    })
}

/// `sqrt((a^2 + b^2) / 2)`.
fn magnitude(a: &Image, b: &Image) -> Image {
    Zip::from(a)
        .and(b)
        .map_collect(|x, y| ((x * x + y * y) / 2.0).sqrt())
}

fn magnitude_of(image: ArrayView2<'_, f32>, kh: &Kernel3) -> Image {
    let gh = correlate3(image, kh);
    let gv = correlate3(image, &transpose(*kh));
    magnitude(&gh, &gv)
}

/// Sobel 水平边缘.
pub fn sobel_h(image: ArrayView2<'_, f32>) -> Image {
    correlate3(image, &SOBEL_H)
}

/// Sobel 竖直边缘.
pub fn sobel_v(image: ArrayView2<'_, f32>) -> Image {
    correlate3(image, &transpose(SOBEL_H))
}

/// Sobel 边缘幅值.
pub fn sobel(image: ArrayView2<'_, f32>) -> Image {
    magnitude_of(image, &SOBEL_H)
}

/// Prewitt 边缘幅值.
pub fn prewitt(image: ArrayView2<'_, f32>) -> Image {
    magnitude_of(image, &PREWITT_H)
}

/// Scharr 边缘幅值.
pub fn scharr(image: ArrayView2<'_, f32>) -> Image {
    magnitude_of(image, &SCHARR_H)
}

/// Roberts 交叉算子幅值, 使用 2x2 对角差分.
pub fn roberts(image: ArrayView2<'_, f32>) -> Image {
    let (h, w) = image.dim();
    Image::from_shape_fn((h, w), |(r, c)| {
        let (r1, c1) = ((r + 1).min(h - 1), (c + 1).min(w - 1));
        let pos = image[(r, c)] - image[(r1, c1)];
        let neg = image[(r, c1)] - image[(r1, c)];
        ((pos * pos + neg * neg) / 2.0).sqrt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 左半为 0, 右半为 1 的阶跃图像.
    fn vertical_step() -> Image {
        Image::from_shape_fn((6, 8), |(_, c)| if c >= 4 { 1.0 } else { 0.0 })
    }

    #[test]
    fn test_sobel_orientation() {
        let image = vertical_step();
        let gh = sobel_h(image.view());
        let gv = sobel_v(image.view());
        assert!(gh.iter().all(|v| v.abs() < 1e-6));
        assert!((gv[(2, 3)] - 1.0).abs() < 1e-6);
        assert!((gv[(2, 4)] - 1.0).abs() < 1e-6);
        assert_eq!(gv[(2, 0)], 0.0);

        let t = image.t().to_owned();
        let th = sobel_h(t.view());
        assert!((th[(3, 2)] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let flat = Image::from_elem((5, 5), 3.0);
        for f in [sobel, prewitt, scharr, roberts] {
            assert!(f(flat.view()).iter().all(|v| v.abs() < 1e-6));
        }
    }

    #[test]
    fn test_magnitudes_peak_on_step() {
        let image = vertical_step();
        for f in [sobel, prewitt, scharr, roberts] {
            let g = f(image.view());
            assert_eq!(g.dim(), image.dim());
            assert!(g[(2, 3)] > 0.0);
            assert!(g[(2, 0)].abs() < 1e-6);
            assert!(g[(2, 7)].abs() < 1e-6);
        }
    }
}
