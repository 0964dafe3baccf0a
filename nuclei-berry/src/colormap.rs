//! 色图: 将归一化数值映射为 RGBA 颜色.
//!
//! 色图由有序的颜色控制点 (每个分量位于 `[0, 1]`) 和插值方式组成,
//! 构建之后不可变. 映射是纯函数.

use crate::consts::rgba::{BLACK, TRANSPARENT, WHITE};
use crate::consts::BACKGROUND;
use crate::filters::finite_range;
use image::{Rgba as RgbaPixel, RgbaImage};
use ndarray::ArrayView2;
use once_cell::sync::Lazy;
use palette::{FromColor, Hsl, Srgb};
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGBA 颜色, 各分量位于 `[0, 1]`.
pub type Rgba = [f32; 4];

/// 控制点之间的插值方式.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Interpolation {
    /// 在相邻两个控制点之间线性插值. 至少需要 2 个控制点.
    #[default]
    Linear,

    /// 阶梯映射: 将 `[0, 1]` 等分为与控制点个数相同的区间, 每个区间取对应控制点的颜色.
    Zero,
}

/// 色图定义. 字段与交互式查看器中的色图字典一一对应.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ColormapDef {
    /// 控制点颜色, 第一个对应对比度下限, 最后一个对应上限.
    pub colors: Vec<Rgba>,

    /// 显示名称.
    pub name: String,

    /// 插值方式.
    #[cfg_attr(feature = "serde", serde(default))]
    pub interpolation: Interpolation,
}

/// 色图定义不合法.
#[derive(Clone, Debug, PartialEq)]
pub enum ColormapError {
    /// 控制点过少.
    TooFewColors {
        /// 插值方式要求的最少个数.
        required: usize,
        /// 实际个数.
        found: usize,
    },

    /// 第 `index` 个控制点存在不在 `[0, 1]` 中的分量.
    ComponentOutOfRange {
        /// 控制点下标.
        index: usize,
        /// 该控制点.
        color: Rgba,
    },

    /// 对比度范围必须满足 `min < max` 且两者都有限.
    InvalidContrastLimits(f32, f32),
}

impl Display for ColormapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewColors { required, found } => {
                write!(f, "at least {required} colors required, found {found}")
            }
            Self::ComponentOutOfRange { index, color } => {
                write!(f, "color #{index} {color:?} has a component outside [0, 1]")
            }
            Self::InvalidContrastLimits(lo, hi) => {
                write!(f, "contrast limits ({lo}, {hi}) must be finite with min < max")
            }
        }
    }
}

impl std::error::Error for ColormapError {}

/// 经过校验的色图.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    name: String,
    colors: Vec<Rgba>,
    interpolation: Interpolation,
}

impl Colormap {
    /// 校验并构建色图.
    pub fn new(
        name: impl Into<String>,
        colors: Vec<Rgba>,
        interpolation: Interpolation,
    ) -> Result<Self, ColormapError> {
        let required = match interpolation {
            Interpolation::Linear => 2,
            Interpolation::Zero => 1,
        };
        if colors.len() < required {
            return Err(ColormapError::TooFewColors {
                required,
                found: colors.len(),
            });
        }
        if let Some((index, color)) = colors
            .iter()
            .enumerate()
            .find(|(_, c)| c.iter().any(|v| !(0.0..=1.0).contains(v)))
        {
            return Err(ColormapError::ComponentOutOfRange {
                index,
                color: *color,
            });
        }
        Ok(Self {
            name: name.into(),
            colors,
            interpolation,
        })
    }

    /// 从黑色到 `color` 的线性色图.
    fn ramp(name: &str, color: Rgba) -> Self {
        Self {
            name: name.to_owned(),
            colors: vec![BLACK, color],
            interpolation: Interpolation::Linear,
        }
    }

    /// 显示名称.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 控制点.
    #[inline]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// 插值方式.
    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// 将归一化值 `t` 映射为颜色. `t` 被截断到 `[0, 1]`, NaN 视为 `0`.
    pub fn map(&self, t: f32) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let n = self.colors.len();
        match self.interpolation {
            Interpolation::Linear => {
                let pos = t * (n - 1) as f32;
                let i = (pos.floor() as usize).min(n - 2);
                let frac = pos - i as f32;
                let (a, b) = (self.colors[i], self.colors[i + 1]);
                std::array::from_fn(|c| a[c] + (b[c] - a[c]) * frac)
            }
            Interpolation::Zero => {
                let i = ((t * n as f32) as usize).min(n - 1);
                self.colors[i]
            }
        }
    }
}

impl TryFrom<ColormapDef> for Colormap {
    type Error = ColormapError;

    fn try_from(value: ColormapDef) -> Result<Self, Self::Error> {
        Self::new(value.name, value.colors, value.interpolation)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Colormap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let def = ColormapDef::deserialize(deserializer)?;
        Self::try_from(def).map_err(serde::de::Error::custom)
    }
}

/// 对比度范围: 映射到色图两端的数据值.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContrastLimits {
    min: f32,
    max: f32,
}

impl ContrastLimits {
    /// 要求 `min < max` 且两者有限.
    pub fn new(min: f32, max: f32) -> Result<Self, ColormapError> {
        if min.is_finite() && max.is_finite() && min < max {
            Ok(Self { min, max })
        } else {
            Err(ColormapError::InvalidContrastLimits(min, max))
        }
    }

    /// 数据的取值范围. 常数数据取 `(v, v + 1)`, 空数据取 `(0, 1)`.
    ///
    /// `|v|` 较大时 `v + 1` 与 `v` 无法区分, 此时上限改为 `v + |v| * EPSILON`.
    pub fn from_data(data: ArrayView2<'_, f32>) -> Self {
        match finite_range(data.iter()) {
            Some((lo, hi)) if lo < hi => Self { min: lo, max: hi },
            Some((lo, _)) => Self {
                min: lo,
                max: lo + (lo.abs() * f32::EPSILON).max(1.0),
            },
            None => Self { min: 0.0, max: 1.0 },
        }
    }

    /// 下限.
    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    /// 上限.
    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// 将数据值线性归一化. 结果可能超出 `[0, 1]`, 由 [`Colormap::map`] 截断.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.min) / (self.max - self.min)
    }
}

impl Default for ContrastLimits {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// 在 `start` 与 `stop` 之间等距生成 `num` 个颜色, 包含两端.
pub fn linspace(start: Rgba, stop: Rgba, num: usize) -> Vec<Rgba> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..num)
            .map(|i| {
                let t = i as f32 / (num - 1) as f32;
                std::array::from_fn(|c| start[c] + (stop[c] - start[c]) * t)
            })
            .collect(),
    }
}

static BUILTIN: Lazy<Vec<Colormap>> = Lazy::new(|| {
    vec![
        Colormap::ramp("gray", WHITE),
        Colormap::ramp("blue", [0.0, 0.0, 1.0, 1.0]),
        Colormap::ramp("green", [0.0, 1.0, 0.0, 1.0]),
        Colormap::ramp("red", [1.0, 0.0, 0.0, 1.0]),
        Colormap::ramp("magenta", [1.0, 0.0, 1.0, 1.0]),
        Colormap::ramp("cyan", [0.0, 1.0, 1.0, 1.0]),
        Colormap::ramp("yellow", [1.0, 1.0, 0.0, 1.0]),
    ]
});

/// 按名称获取内置色图: `gray`, `blue`, `green`, `red`, `magenta`, `cyan`, `yellow`.
pub fn builtin(name: &str) -> Option<&'static Colormap> {
    BUILTIN.iter().find(|c| c.name == name)
}

/// 内置灰度色图.
pub fn gray() -> &'static Colormap {
    &BUILTIN[0]
}

/// 标签图的显示颜色. 背景透明, 其它标签按黄金分割角步进色相, 相邻编号颜色差异明显.
pub fn label_color(label: u32) -> Rgba {
    if label == BACKGROUND {
        return TRANSPARENT;
    }
    const GOLDEN: f64 = 0.618_033_988_749_895;
    let hue = (label as f64 * GOLDEN).fract() * 360.0;
    let rgb: Srgb<f32> = Srgb::from_color(Hsl::new(hue as f32, 0.9, 0.5));
    [rgb.red, rgb.green, rgb.blue, 1.0]
}

/// 将 `[0, 1]` 颜色分量量化为 8 位.
#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 用色图渲染单通道图像. `opacity` 会乘到每个像素的 alpha 上.
pub fn apply(
    image: ArrayView2<'_, f32>,
    colormap: &Colormap,
    limits: ContrastLimits,
    opacity: f32,
) -> RgbaImage {
    let (h, w) = image.dim();
    RgbaImage::from_fn(w as u32, h as u32, |x, y| {
        let [r, g, b, a] = colormap.map(limits.normalize(image[(y as usize, x as usize)]));
        RgbaPixel([to_u8(r), to_u8(g), to_u8(b), to_u8(a * opacity)])
    })
}
