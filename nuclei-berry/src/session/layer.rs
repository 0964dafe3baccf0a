use super::PointSet;
use crate::colormap::{self, Colormap, ContrastLimits};
use crate::{BerryError, BerryResult, Idx2d, Image, LabelMap};

/// 图层类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LayerKind {
    /// 单通道图像.
    Image,

    /// 标签图 (包括二值掩膜).
    Labels,

    /// 点集.
    Points,
}

impl LayerKind {
    /// 未指定名称时使用的默认图层名.
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Labels => "labels",
            Self::Points => "points",
        }
    }
}

/// 图层数据. 每个图层独占一份数据, 图层之间不共享.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerData {
    /// 单通道图像.
    Image(Image),

    /// 标签图.
    Labels(LabelMap),

    /// 点集.
    Points(PointSet),
}

impl LayerData {
    /// 数据对应的图层类型.
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Image(_) => LayerKind::Image,
            Self::Labels(_) => LayerKind::Labels,
            Self::Points(_) => LayerKind::Points,
        }
    }

    /// 栅格数据的形状. 点集没有形状.
    pub fn shape(&self) -> Option<Idx2d> {
        match self {
            Self::Image(d) => Some(d.dim()),
            Self::Labels(d) => Some(d.dim()),
            Self::Points(_) => None,
        }
    }
}

/// 会话中的一个具名图层: 数据与显示属性.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    name: String,
    data: LayerData,
    opacity: f32,
    visible: bool,
    colormap: Option<Colormap>,
    contrast_limits: Option<ContrastLimits>,
}

impl Layer {
    /// 以默认显示属性创建图层. 图像图层默认使用灰度色图, 对比度范围为数据的取值范围.
    pub(crate) fn new(name: String, data: LayerData) -> Self {
        let (colormap, contrast_limits) = match &data {
            LayerData::Image(d) => (
                Some(colormap::gray().clone()),
                Some(ContrastLimits::from_data(d.view())),
            ),
            _ => (None, None),
        };
        Self {
            name,
            data,
            opacity: 1.0,
            visible: true,
            colormap,
            contrast_limits,
        }
    }

    /// 图层名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 图层类型.
    #[inline]
    pub fn kind(&self) -> LayerKind {
        self.data.kind()
    }

    /// 图层数据.
    #[inline]
    pub fn data(&self) -> &LayerData {
        &self.data
    }

    /// 替换数据. 调用方负责形状检查.
    #[inline]
    pub(crate) fn set_data(&mut self, data: LayerData) {
        self.data = data;
    }

    /// 不透明度, 位于 `[0, 1]`.
    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// 设置不透明度. 超出 `[0, 1]` 时返回错误且不做修改.
    pub fn set_opacity(&mut self, opacity: f32) -> BerryResult<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(BerryError::InvalidOpacity(opacity));
        }
        self.opacity = opacity;
        Ok(())
    }

    /// 是否可见.
    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// 设置可见性.
    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// 色图. 只有图像图层有色图.
    #[inline]
    pub fn colormap(&self) -> Option<&Colormap> {
        self.colormap.as_ref()
    }

    /// 对比度范围. 只有图像图层有对比度范围.
    #[inline]
    pub fn contrast_limits(&self) -> Option<ContrastLimits> {
        self.contrast_limits
    }

    fn expect_image(&self) -> BerryResult<()> {
        match self.kind() {
            LayerKind::Image => Ok(()),
            found => Err(BerryError::LayerKind {
                name: self.name.clone(),
                expected: LayerKind::Image,
                found,
            }),
        }
    }

    /// 设置色图. 只适用于图像图层.
    pub fn set_colormap(&mut self, colormap: Colormap) -> BerryResult<()> {
        self.expect_image()?;
        self.colormap = Some(colormap);
        Ok(())
    }

    /// 设置对比度范围. 只适用于图像图层.
    pub fn set_contrast_limits(&mut self, limits: ContrastLimits) -> BerryResult<()> {
        self.expect_image()?;
        self.contrast_limits = Some(limits);
        Ok(())
    }

    /// 点集图层的可变引用, 用于人工增删点.
    pub fn points_mut(&mut self) -> BerryResult<&mut PointSet> {
        match &mut self.data {
            LayerData::Points(p) => Ok(p),
            other => Err(BerryError::LayerKind {
                name: self.name.clone(),
                expected: LayerKind::Points,
                found: other.kind(),
            }),
        }
    }
}
