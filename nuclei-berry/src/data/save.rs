//! 图像的持久化存储.

use crate::colormap::label_color;
use crate::filters::finite_range;
use crate::{BerryResult, Image, LabelMap, Mask, PersistError};
use image::{ImageBuffer, Luma, Rgb, RgbImage, RgbaImage};
use ndarray::ArrayView2;
use ndarray_npy::write_npy;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 图像会被映射为肉眼容易分辨的 8 位图像, 而不是按原样保存:
/// 标签图按编号着色, 掩膜映射为黑白, 灰度图按取值范围拉伸到 `[0, 255]`.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 扩展名为 `.npy` 时以 `ndarray-npy` 写入, 否则交给 `image` 编码,
/// 此时标签图写为 16 位灰度 (png/tiff 等支持 16 位的格式).
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError>;
}

#[inline]
fn is_npy(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("npy"))
}

macro_rules! impl_label_raw {
    ($($labels: ty),+) => {
        $(
            /// 标签编号必须不超过 `u16::MAX`, 否则只能保存为 `.npy`.
            impl ImgWriteRaw for $labels {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
                    let path = path.as_ref();
                    if is_npy(path) {
                        return Ok(write_npy(path, self)?);
                    }
                    let max = self.iter().copied().max().unwrap_or(0);
                    if max > u16::MAX as u32 {
                        return Err(PersistError::LabelOverflow(max));
                    }
                    let (height, width) = self.dim();
                    let mut buf = ImageBuffer::<Luma<u16>, _>::new(width as u32, height as u32);
                    for ((h, w), &label) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, Luma([label as u16]));
                    }
                    Ok(buf.save(path)?)
                }
            }

            /// 背景为黑色, 其余标签按编号着色.
            impl ImgWriteVis for $labels {
                fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
                    let (height, width) = self.dim();
                    let mut buf = RgbImage::new(width as u32, height as u32);
                    for ((h, w), &label) in self.indexed_iter() {
                        let [r, g, b, a] = label_color(label);
                        let px = [r * a, g * a, b * a].map(|v| (v * 255.0).round() as u8);
                        buf.put_pixel(w as u32, h as u32, Rgb(px));
                    }
                    Ok(buf.save(path)?)
                }
            }
        )+
    };
}

macro_rules! impl_mask {
    ($($mask: ty),+) => {
        $(
            /// `.npy` 保存布尔数组, 其它格式保存为 0/1 的 8 位灰度.
            impl ImgWriteRaw for $mask {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
                    let path = path.as_ref();
                    if is_npy(path) {
                        return Ok(write_npy(path, self)?);
                    }
                    Ok(gray8(self.view(), |&fg| u8::from(fg)).save(path)?)
                }
            }

            /// 前景为白色, 背景为黑色.
            impl ImgWriteVis for $mask {
                fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
                    Ok(gray8(self.view(), |&fg| if fg { 255 } else { 0 }).save(path)?)
                }
            }
        )+
    };
}

macro_rules! impl_image_vis {
    ($($image: ty),+) => {
        $(
            /// 按有限值的取值范围线性拉伸到 `[0, 255]`. 非有限值为黑色.
            impl ImgWriteVis for $image {
                fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
                    let (lo, hi) = finite_range(self.iter()).unwrap_or((0.0, 1.0));
                    let scale = if hi > lo { 255.0 / (hi - lo) } else { 0.0 };
                    let buf = gray8(self.view(), |&v| {
                        if v.is_finite() {
                            ((v - lo) * scale).round() as u8
                        } else {
                            0
                        }
                    });
                    Ok(buf.save(path)?)
                }
            }
        )+
    };
}

impl_label_raw!(LabelMap, ArrayView2<'_, u32>);
impl_mask!(Mask, ArrayView2<'_, bool>);
impl_image_vis!(Image, ArrayView2<'_, f32>);

fn gray8<T, F>(data: ArrayView2<'_, T>, f: F) -> image::GrayImage
where
    F: Fn(&T) -> u8,
{
    let (height, width) = data.dim();
    image::GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([f(&data[(y as usize, x as usize)])])
    })
}

/// 按原样保存标签图. 见 [`ImgWriteRaw`].
pub fn save_labels<P: AsRef<Path>>(labels: ArrayView2<'_, u32>, path: P) -> BerryResult<()> {
    labels.save_raw(path.as_ref())?;
    log::info!("labels saved to `{}`", path.as_ref().display());
    Ok(())
}

/// 以黑白图像保存掩膜.
pub fn save_mask<P: AsRef<Path>>(mask: ArrayView2<'_, bool>, path: P) -> BerryResult<()> {
    Ok(mask.save(path)?)
}

/// 以拉伸后的 8 位灰度保存浮点图像.
pub fn save_image<P: AsRef<Path>>(image: ArrayView2<'_, f32>, path: P) -> BerryResult<()> {
    Ok(image.save(path)?)
}

/// 保存渲染结果.
pub fn save_rgba<P: AsRef<Path>>(rendered: &RgbaImage, path: P) -> BerryResult<()> {
    rendered.save(path).map_err(PersistError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::open;
    use ndarray::array;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nuclei-berry-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.push(name);
        dir
    }

    fn sample_labels() -> LabelMap {
        array![[0, 1, 1], [2, 0, 3], [2, 2, 300]]
    }

    #[test]
    fn test_labels_png_round_trip() {
        let labels = sample_labels();
        let path = temp_file("labels.png");
        save_labels(labels.view(), &path).unwrap();
        let back = open(&path).unwrap().into_plane(0).mapv(|v| v as u32);
        assert_eq!(back, labels);
    }

    #[test]
    fn test_labels_npy_round_trip() {
        let mut labels = sample_labels();
        labels[(0, 0)] = 100_000;
        let path = temp_file("labels.npy");
        labels.save_raw(&path).unwrap();
        let back: LabelMap = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(back, labels);

        // 16 位图像放不下.
        let err = labels.save_raw(temp_file("overflow.png"));
        assert!(matches!(err, Err(PersistError::LabelOverflow(100_000))));
    }

    #[test]
    fn test_visual_outputs() {
        let mask = array![[true, false], [false, true]];
        let path = temp_file("mask.png");
        save_mask(mask.view(), &path).unwrap();
        let back = open(&path).unwrap().into_plane(0);
        assert_eq!(back, array![[255.0, 0.0], [0.0, 255.0]]);

        let image = array![[1.0f32, 2.0], [3.0, f32::NAN]];
        let path = temp_file("image.png");
        save_image(image.view(), &path).unwrap();
        let back = open(&path).unwrap().into_plane(0);
        assert_eq!(back, array![[0.0, 128.0], [255.0, 0.0]]);

        let path = temp_file("labels-vis.png");
        sample_labels().save(&path).unwrap();
        let rgb = image::open(&path).unwrap().into_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_ne!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0), rgb.get_pixel(2, 0));
    }
}
