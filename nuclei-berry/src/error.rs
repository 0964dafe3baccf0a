//! 运行时错误.

use crate::colormap::ColormapError;
use crate::session::{KeyParseError, LayerKind};
use crate::Idx2d;
use std::fmt::{Display, Formatter};

/// 本 crate 的通用返回类型.
pub type BerryResult<T> = Result<T, BerryError>;

/// 工作流运行时错误.
#[derive(Debug)]
pub enum BerryError {
    /// 源图像不可读或格式错误. 致命错误, 此时尚未创建任何图层.
    DataLoad {
        /// 数据源 (路径或 URL).
        source_name: String,
        /// 底层错误.
        cause: DataLoadError,
    },

    /// 派生数组与会话的空间形状不一致. 在赋值之前检出, 不会截断或填充.
    ShapeMismatch {
        /// 会话期望的形状 (高, 宽).
        expected: Idx2d,
        /// 实际给出的形状 (高, 宽).
        found: Idx2d,
    },

    /// 分水岭没有任何有效标记. 可恢复: 分割结果为全背景.
    EmptySeedSet,

    /// 会话中不存在该名称的图层.
    UnknownLayer(String),

    /// 图层类型与操作不符.
    LayerKind {
        /// 图层名.
        name: String,
        /// 操作要求的类型.
        expected: LayerKind,
        /// 图层的实际类型.
        found: LayerKind,
    },

    /// 不透明度不在 `[0, 1]` 范围内.
    InvalidOpacity(f32),

    /// 色图定义非法.
    Colormap(ColormapError),

    /// 命令名为空.
    EmptyCommandName,

    /// 命令表中不存在该命令.
    UnknownCommand(String),

    /// 同名命令已注册.
    DuplicateCommand(String),

    /// 快捷键已绑定到其它命令. 参数依次为快捷键和已占用它的命令.
    KeyAlreadyBound(String, String),

    /// 快捷键字符串无法解析.
    KeyParse(KeyParseError),

    /// 持久化存储失败.
    Persist(PersistError),

    /// 点集快照编解码失败.
    #[cfg(feature = "serde")]
    Codec(bincode::Error),
}

/// 数据加载的底层错误.
#[derive(Debug)]
pub enum DataLoadError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 栅格图像解码错误.
    Image(image::ImageError),

    /// nifti 文件解析错误.
    Nifti(nifti::NiftiError),

    /// `.npy` 文件解析错误.
    Npy(ndarray_npy::ReadNpyError),

    /// TIFF 解码错误.
    Tiff(tiff::TiffError),

    /// 多页 TIFF 的各页尺寸不一致.
    PageShape {
        /// 第一页的形状 (高, 宽).
        expected: Idx2d,
        /// 不一致页的形状 (高, 宽).
        found: Idx2d,
    },

    /// 像素的采样类型或通道布局无法识别.
    UnsupportedPixel,

    /// 该数据源不支持此格式. 参数为数据源名称.
    UnsupportedSource(String),

    /// 只支持二维和三维数据. 参数为实际维数.
    UnsupportedDims(usize),

    /// 数据中没有任何像素.
    Empty,

    /// 远程获取失败.
    #[cfg(feature = "remote")]
    Remote(reqwest::Error),
}

/// 持久化存储的底层错误.
#[derive(Debug)]
pub enum PersistError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 栅格图像编码错误.
    Image(image::ImageError),

    /// `.npy` 写入错误.
    Npy(ndarray_npy::WriteNpyError),

    /// 标签编号超出 16 位图像的表示范围. 参数为最大标签值.
    LabelOverflow(u32),
}

impl Display for BerryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataLoad { source_name, cause } => {
                write!(f, "cannot load image from `{source_name}`: {cause}")
            }
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "shape mismatch: session expects {expected:?}, got {found:?}"
            ),
            Self::EmptySeedSet => f.write_str("watershed invoked without any marker"),
            Self::UnknownLayer(name) => write!(f, "no layer named `{name}`"),
            Self::LayerKind {
                name,
                expected,
                found,
            } => write!(f, "layer `{name}` is {found:?}, expected {expected:?}"),
            Self::InvalidOpacity(v) => write!(f, "opacity {v} is outside [0, 1]"),
            Self::Colormap(e) => write!(f, "invalid colormap: {e}"),
            Self::EmptyCommandName => f.write_str("command name must not be empty"),
            Self::UnknownCommand(name) => write!(f, "no command named `{name}`"),
            Self::DuplicateCommand(name) => write!(f, "command `{name}` is already registered"),
            Self::KeyAlreadyBound(key, name) => {
                write!(f, "key `{key}` is already bound to `{name}`")
            }
            Self::KeyParse(e) => write!(f, "invalid key combination: {e}"),
            Self::Persist(e) => write!(f, "cannot persist data: {e}"),
            #[cfg(feature = "serde")]
            Self::Codec(e) => write!(f, "snapshot codec error: {e}"),
        }
    }
}

impl std::error::Error for BerryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataLoad { cause, .. } => Some(cause),
            Self::Colormap(e) => Some(e),
            Self::KeyParse(e) => Some(e),
            Self::Persist(e) => Some(e),
            #[cfg(feature = "serde")]
            Self::Codec(e) => Some(&**e),
            _ => None,
        }
    }
}

impl Display for DataLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Image(e) => write!(f, "{e}"),
            Self::Nifti(e) => write!(f, "{e}"),
            Self::Npy(e) => write!(f, "{e}"),
            Self::Tiff(e) => write!(f, "{e}"),
            Self::PageShape { expected, found } => {
                write!(f, "tiff page of shape {found:?} in a stack of {expected:?}")
            }
            Self::UnsupportedPixel => f.write_str("unsupported pixel layout"),
            Self::UnsupportedSource(name) => write!(f, "`{name}` can only be read from a file"),
            Self::UnsupportedDims(n) => write!(f, "expected 2-D or 3-D data, got {n}-D"),
            Self::Empty => f.write_str("data contains no pixel"),
            #[cfg(feature = "remote")]
            Self::Remote(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DataLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Nifti(e) => Some(e),
            Self::Npy(e) => Some(e),
            Self::Tiff(e) => Some(e),
            #[cfg(feature = "remote")]
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Image(e) => write!(f, "{e}"),
            Self::Npy(e) => write!(f, "{e}"),
            Self::LabelOverflow(max) => {
                write!(f, "label {max} does not fit into a 16-bit image, use `.npy`")
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Npy(e) => Some(e),
            Self::LabelOverflow(_) => None,
        }
    }
}

impl From<ColormapError> for BerryError {
    #[inline]
    fn from(value: ColormapError) -> Self {
        Self::Colormap(value)
    }
}

impl From<KeyParseError> for BerryError {
    #[inline]
    fn from(value: KeyParseError) -> Self {
        Self::KeyParse(value)
    }
}

impl From<PersistError> for BerryError {
    #[inline]
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

impl From<image::ImageError> for PersistError {
    #[inline]
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<ndarray_npy::WriteNpyError> for PersistError {
    #[inline]
    fn from(value: ndarray_npy::WriteNpyError) -> Self {
        Self::Npy(value)
    }
}

impl From<std::io::Error> for PersistError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<image::ImageError> for DataLoadError {
    #[inline]
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<nifti::NiftiError> for DataLoadError {
    #[inline]
    fn from(value: nifti::NiftiError) -> Self {
        Self::Nifti(value)
    }
}

impl From<ndarray_npy::ReadNpyError> for DataLoadError {
    #[inline]
    fn from(value: ndarray_npy::ReadNpyError) -> Self {
        Self::Npy(value)
    }
}

impl From<tiff::TiffError> for DataLoadError {
    #[inline]
    fn from(value: tiff::TiffError) -> Self {
        Self::Tiff(value)
    }
}

impl From<std::io::Error> for DataLoadError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "serde")]
impl From<bincode::Error> for BerryError {
    #[inline]
    fn from(value: bincode::Error) -> Self {
        Self::Codec(value)
    }
}
