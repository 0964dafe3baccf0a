//! 图像加载.
//!
//! 支持的格式 (按扩展名判断, 不区分大小写):
//!
//! - `.npy`: 二维或三维数组, 元素类型可以是常见的整数、浮点数或布尔值;
//! - `.nii` / `.nii.gz`: nifti 体数据, 轴顺序会被调整为 `[z, 高, 宽]`;
//! - `.tif` / `.tiff`: 逐页解码, 单页为二维图像, 多页为 `[页, 高, 宽]` 的三维数据.
//!   彩色页取前三个通道的均值;
//! - 其它: 交给 `image` 解码为单通道二维图像. 8/16 位灰度图保留原始数值,
//!   彩色图像先转换为 16 位灰度.

use super::max_projection;
use crate::{BerryError, BerryResult, DataLoadError, Image};
use image::DynamicImage;
use ndarray::{Array3, ArrayD, Axis, Ix2, Ix3};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use num::ToPrimitive;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};

/// 刚加载的原始数据.
#[derive(Debug, Clone, PartialEq)]
pub enum RawImage {
    /// 二维图像 `[高, 宽]`.
    Plane(Image),

    /// 三维数据, 通常为 `[z, 高, 宽]`.
    Stack(Array3<f32>),
}

impl RawImage {
    /// 数据形状.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Plane(p) => p.shape(),
            Self::Stack(s) => s.shape(),
        }
    }

    /// 压平为二维图像. 三维数据沿 `axis` 做最大强度投影, 二维数据原样返回.
    ///
    /// # Panics
    ///
    /// 如果数据是三维的且 `axis >= 3`.
    pub fn into_plane(self, axis: usize) -> Image {
        match self {
            Self::Plane(p) => p,
            Self::Stack(s) => {
                log::info!("max projection of {:?} along axis {axis}", s.dim());
                max_projection(s.view(), axis)
            }
        }
    }

    /// 三维数据沿第 0 轴的第 `z` 层. 二维数据只有第 0 层. 越界返回 `None`.
    pub fn plane_at(&self, z: usize) -> Option<Image> {
        match self {
            Self::Plane(p) => (z == 0).then(|| p.clone()),
            Self::Stack(s) => (z < s.len_of(Axis(0))).then(|| s.index_axis(Axis(0), z).to_owned()),
        }
    }

    fn from_dyn(data: ArrayD<f32>) -> Result<Self, DataLoadError> {
        if data.is_empty() {
            return Err(DataLoadError::Empty);
        }
        let ndim = data.ndim();
        match ndim {
            2 => data
                .into_dimensionality::<Ix2>()
                .map(Self::Plane)
                .map_err(|_| DataLoadError::UnsupportedDims(ndim)),
            3 => data
                .into_dimensionality::<Ix3>()
                .map(Self::Stack)
                .map_err(|_| DataLoadError::UnsupportedDims(ndim)),
            other => Err(DataLoadError::UnsupportedDims(other)),
        }
    }
}

/// 文件格式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Format {
    Npy,
    Nifti,
    Tiff,
    Raster,
}

impl Format {
    fn of(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".npy") {
            Self::Npy
        } else if lower.ends_with(".nii") || lower.ends_with(".nii.gz") {
            Self::Nifti
        } else if lower.ends_with(".tif") || lower.ends_with(".tiff") {
            Self::Tiff
        } else {
            Self::Raster
        }
    }
}

/// 打开图像文件. 任何失败都会带上文件路径.
pub fn open<P: AsRef<Path>>(path: P) -> BerryResult<RawImage> {
    let path = path.as_ref();
    let wrap = |cause: DataLoadError| BerryError::DataLoad {
        source_name: path.display().to_string(),
        cause,
    };
    let name = path.to_string_lossy();
    let data = match Format::of(&name) {
        Format::Nifti => read_nifti(path),
        _ => std::fs::read(path)
            .map_err(DataLoadError::from)
            .and_then(|bytes| decode_bytes(&name, &bytes)),
    }
    .map_err(wrap)?;
    let raw = RawImage::from_dyn(data).map_err(wrap)?;
    log::info!("loaded `{}` with shape {:?}", path.display(), raw.shape());
    Ok(raw)
}

/// 通过 HTTP(S) 获取图像. 格式按 URL 结尾判断, nifti 不支持远程加载.
#[cfg(feature = "remote")]
pub fn fetch(url: &str) -> BerryResult<RawImage> {
    let wrap = |cause: DataLoadError| BerryError::DataLoad {
        source_name: url.to_owned(),
        cause,
    };
    let bytes = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| wrap(DataLoadError::Remote(e)))?;
    log::info!("fetched {} bytes from `{url}`", bytes.len());

    let data = decode_bytes(url, &bytes).map_err(wrap)?;
    RawImage::from_dyn(data).map_err(wrap)
}

/// 按 `name` 的扩展名解码内存中的图像数据. nifti 只能从文件读取.
pub(crate) fn decode_bytes(name: &str, bytes: &[u8]) -> Result<ArrayD<f32>, DataLoadError> {
    match Format::of(name) {
        Format::Npy => read_npy_any(bytes),
        Format::Tiff => read_tiff(bytes),
        Format::Raster => image::load_from_memory(bytes)
            .map_err(DataLoadError::from)
            .map(raster_to_array),
        Format::Nifti => Err(DataLoadError::UnsupportedSource(name.to_owned())),
    }
}

fn cast<T: ToPrimitive + Clone>(data: ArrayD<T>) -> ArrayD<f32> {
    data.mapv(|v| v.to_f32().unwrap_or(f32::NAN))
}

/// 依次尝试常见元素类型解析 `.npy` 数据.
fn read_npy_any(bytes: &[u8]) -> Result<ArrayD<f32>, DataLoadError> {
    macro_rules! try_read {
        ($($t: ty),+) => {
            $(
                match ArrayD::<$t>::read_npy(bytes) {
                    Ok(data) => return Ok(cast(data)),
                    Err(ReadNpyError::WrongDescriptor(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            )+
        };
    }
    try_read!(f32, f64, u8, u16, u32, u64, i8, i16, i32, i64);

    let data = ArrayD::<bool>::read_npy(bytes)?;
    Ok(data.mapv(|v| if v { 1.0 } else { 0.0 }))
}

/// 逐页解码 TIFF. 所有页的尺寸必须相同.
fn read_tiff(bytes: &[u8]) -> Result<ArrayD<f32>, DataLoadError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let mut pages: Vec<f32> = Vec::new();
    let mut n_pages = 0;
    let mut page_shape = None;
    loop {
        let (w, h) = decoder.dimensions()?;
        let shape = (h as usize, w as usize);
        match page_shape {
            None => page_shape = Some(shape),
            Some(first) if first != shape => {
                return Err(DataLoadError::PageShape {
                    expected: first,
                    found: shape,
                })
            }
            Some(_) => {}
        }
        let samples = tiff_samples(decoder.read_image()?)?;
        pages.extend(to_gray(samples, shape.0 * shape.1)?);
        n_pages += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    log::debug!("decoded {n_pages} tiff page(s)");

    let (h, w) = page_shape.unwrap_or((0, 0));
    let dims = if n_pages == 1 {
        vec![h, w]
    } else {
        vec![n_pages, h, w]
    };
    ArrayD::from_shape_vec(dims, pages).map_err(|_| DataLoadError::UnsupportedPixel)
}

fn tiff_samples(page: DecodingResult) -> Result<Vec<f32>, DataLoadError> {
    macro_rules! samples {
        ($($v: ident),+) => {
            match page {
                $(DecodingResult::$v(buf) => Ok(buf.into_iter().map(|x| x as f32).collect()),)+
                #[allow(unreachable_patterns)]
                _ => Err(DataLoadError::UnsupportedPixel),
            }
        };
    }
    samples!(U8, U16, U32, U64, I8, I16, I32, I64, F32, F64)
}

/// 交错存储的多通道像素压成单通道: 取前三个通道 (没有 alpha) 的均值.
fn to_gray(samples: Vec<f32>, n_pixels: usize) -> Result<Vec<f32>, DataLoadError> {
    if n_pixels == 0 {
        return Err(DataLoadError::Empty);
    }
    if samples.len() % n_pixels != 0 {
        return Err(DataLoadError::UnsupportedPixel);
    }
    let channels = samples.len() / n_pixels;
    if channels == 1 {
        return Ok(samples);
    }
    // 灰度 + alpha 只取灰度, RGB(A) 取三通道均值.
    let used = if channels >= 3 { 3 } else { 1 };
    Ok(samples
        .chunks_exact(channels)
        .map(|px| px[..used].iter().sum::<f32>() / used as f32)
        .collect())
}

fn read_nifti(path: &Path) -> Result<ArrayD<f32>, DataLoadError> {
    let obj = ReaderOptions::new().read_file(path)?;
    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = obj.into_volume().into_ndarray::<f32>()?.reversed_axes();
    Ok(data.as_standard_layout().into_owned())
}

fn raster_to_array(img: DynamicImage) -> ArrayD<f32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let pixels: Vec<f32> = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        other => other
            .into_luma16()
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect(),
    };
    // `image` 的缓冲区按行存储, 长度恰为 `h * w`.
    ArrayD::from_shape_vec(vec![h, w], pixels)
        .unwrap_or_else(|_| ArrayD::zeros(vec![0, 0]))
}
