//! 会话: 具名、有序的图层集合, 以及绑定在会话上的命令和控件.
//!
//! 会话由调用方显式持有并传递给命令和控件, 不存在全局的 "当前会话".
//! 所有写入都是按值替换: 图层拥有自己的数据拷贝, 彼此之间不共享.

mod command;
mod layer;
mod points;
mod widget;

pub use command::{CommandFn, CommandRegistry, KeyCombo, KeyParseError};
pub use layer::{Layer, LayerData, LayerKind};
pub use points::{Point, PointSet};
pub use widget::{IntSlider, ThresholdWidget};

use crate::colormap::{label_color, Colormap, ContrastLimits, Rgba};
use crate::morph::foreground_of;
use crate::{BerryError, BerryResult, Idx2d, Image, LabelMap, Mask};
use image::RgbaImage;
use ndarray::ArrayView2;

/// 标签图层的默认不透明度.
const LABELS_OPACITY: f32 = 0.7;

/// 图层集合. 所有栅格图层 (图像、标签) 共享同一空间形状.
#[derive(Clone, Debug, Default)]
pub struct Session {
    layers: Vec<Layer>,
    shape: Option<Idx2d>,
}

impl Session {
    /// 空会话.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 图层个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// 是否没有任何图层.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 会话的空间形状 (高, 宽). 尚无栅格图层时为 `None`.
    #[inline]
    pub fn shape(&self) -> Option<Idx2d> {
        self.shape
    }

    /// 按添加顺序排列的图层名.
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::name).collect()
    }

    /// 按添加顺序迭代图层.
    pub fn layers(&self) -> impl ExactSizeIterator<Item = &Layer> {
        self.layers.iter()
    }

    fn position(&self, name: &str) -> BerryResult<usize> {
        self.layers
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| BerryError::UnknownLayer(name.to_owned()))
    }

    /// 按名称获取图层.
    pub fn layer(&self, name: &str) -> BerryResult<&Layer> {
        self.position(name).map(|i| &self.layers[i])
    }

    /// 按名称获取可变图层, 可修改显示属性或编辑点集. 栅格数据只能通过 `replace_*` 替换.
    pub fn layer_mut(&mut self, name: &str) -> BerryResult<&mut Layer> {
        let i = self.position(name)?;
        Ok(&mut self.layers[i])
    }

    /// 为 `base` 生成不冲突的图层名: 未被占用时原样返回,
    /// 否则追加 ` [n]`, `n` 取最小的可用正整数.
    fn unique_name(&self, base: &str) -> String {
        let taken = |n: &str| self.layers.iter().any(|l| l.name() == n);
        if !taken(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base} [{n}]"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    fn check_shape(&self, found: Option<Idx2d>) -> BerryResult<()> {
        match (self.shape, found) {
            (Some(expected), Some(found)) if expected != found => {
                Err(BerryError::ShapeMismatch { expected, found })
            }
            _ => Ok(()),
        }
    }

    fn add(&mut self, data: LayerData, name: Option<&str>) -> BerryResult<String> {
        let found = data.shape();
        self.check_shape(found)?;
        let name = self.unique_name(name.unwrap_or_else(|| data.kind().default_name()));
        let mut layer = Layer::new(name.clone(), data);
        if layer.kind() == LayerKind::Labels {
            layer.set_opacity(LABELS_OPACITY)?;
        }
        if self.shape.is_none() {
            self.shape = found;
        }
        log::debug!("layer `{name}` ({:?}) added", layer.kind());
        self.layers.push(layer);
        Ok(name)
    }

    /// 添加图像图层, 返回实际使用的图层名.
    pub fn add_image(&mut self, data: Image, name: Option<&str>) -> BerryResult<String> {
        self.add(LayerData::Image(data), name)
    }

    /// 添加标签图层, 返回实际使用的图层名.
    pub fn add_labels(&mut self, data: LabelMap, name: Option<&str>) -> BerryResult<String> {
        self.add(LayerData::Labels(data), name)
    }

    /// 以 0/1 标签图层的形式添加二值掩膜.
    pub fn add_mask(&mut self, mask: ArrayView2<'_, bool>, name: Option<&str>) -> BerryResult<String> {
        self.add_labels(mask.mapv(u32::from), name)
    }

    /// 添加点集图层, 返回实际使用的图层名. 点集不参与形状检查.
    pub fn add_points(&mut self, points: PointSet, name: Option<&str>) -> BerryResult<String> {
        self.add(LayerData::Points(points), name)
    }

    /// 删除图层.
    pub fn remove(&mut self, name: &str) -> BerryResult<Layer> {
        let i = self.position(name)?;
        let removed = self.layers.remove(i);
        self.refresh_shape();
        Ok(removed)
    }

    /// 只保留前 `keep` 个图层, 返回删除的个数.
    pub fn truncate(&mut self, keep: usize) -> usize {
        let before = self.layers.len();
        self.layers.truncate(keep);
        self.refresh_shape();
        before - self.layers.len()
    }

    fn refresh_shape(&mut self) {
        if self.layers.iter().all(|l| l.data().shape().is_none()) {
            self.shape = None;
        }
    }

    /// 替换图层数据. 类型必须一致, 栅格数据的形状必须与会话一致, 检查失败时不做任何修改.
    fn replace(&mut self, name: &str, data: LayerData) -> BerryResult<()> {
        let i = self.position(name)?;
        let expected = self.layers[i].kind();
        if expected != data.kind() {
            return Err(BerryError::LayerKind {
                name: name.to_owned(),
                expected,
                found: data.kind(),
            });
        }
        self.check_shape(data.shape())?;
        self.layers[i].set_data(data);
        Ok(())
    }

    /// 替换图像图层的数据. 对比度范围保持不变.
    pub fn replace_image(&mut self, name: &str, data: Image) -> BerryResult<()> {
        self.replace(name, LayerData::Image(data))
    }

    /// 替换标签图层的数据.
    pub fn replace_labels(&mut self, name: &str, data: LabelMap) -> BerryResult<()> {
        self.replace(name, LayerData::Labels(data))
    }

    /// 以 0/1 标签替换标签图层的数据.
    pub fn replace_mask(&mut self, name: &str, mask: ArrayView2<'_, bool>) -> BerryResult<()> {
        self.replace_labels(name, mask.mapv(u32::from))
    }

    /// 替换点集图层的数据.
    pub fn replace_points(&mut self, name: &str, points: PointSet) -> BerryResult<()> {
        self.replace(name, LayerData::Points(points))
    }

    /// 存在同名图层时替换其数据, 否则以该名称新建标签图层.
    pub fn upsert_labels(&mut self, name: &str, data: LabelMap) -> BerryResult<()> {
        if self.position(name).is_ok() {
            self.replace_labels(name, data)
        } else {
            self.add_labels(data, Some(name)).map(|_| ())
        }
    }

    /// 以 0/1 标签写入掩膜, 语义同 [`Session::upsert_labels`].
    pub fn upsert_mask(&mut self, name: &str, mask: ArrayView2<'_, bool>) -> BerryResult<()> {
        self.upsert_labels(name, mask.mapv(u32::from))
    }

    fn kind_error(layer: &Layer, expected: LayerKind) -> BerryError {
        BerryError::LayerKind {
            name: layer.name().to_owned(),
            expected,
            found: layer.kind(),
        }
    }

    /// 图像图层的数据.
    pub fn image(&self, name: &str) -> BerryResult<&Image> {
        let layer = self.layer(name)?;
        match layer.data() {
            LayerData::Image(d) => Ok(d),
            _ => Err(Self::kind_error(layer, LayerKind::Image)),
        }
    }

    /// 标签图层的数据.
    pub fn labels(&self, name: &str) -> BerryResult<&LabelMap> {
        let layer = self.layer(name)?;
        match layer.data() {
            LayerData::Labels(d) => Ok(d),
            _ => Err(Self::kind_error(layer, LayerKind::Labels)),
        }
    }

    /// 将标签图层的非零像素作为前景掩膜读出.
    pub fn mask(&self, name: &str) -> BerryResult<Mask> {
        self.labels(name).map(|l| foreground_of(l.view()))
    }

    /// 点集图层的数据.
    pub fn points(&self, name: &str) -> BerryResult<&PointSet> {
        let layer = self.layer(name)?;
        match layer.data() {
            LayerData::Points(p) => Ok(p),
            _ => Err(Self::kind_error(layer, LayerKind::Points)),
        }
    }

    /// 点集图层的可变数据, 用于人工增删点.
    pub fn points_mut(&mut self, name: &str) -> BerryResult<&mut PointSet> {
        self.layer_mut(name)?.points_mut()
    }

    /// 设置图像图层的色图.
    pub fn set_colormap(&mut self, name: &str, colormap: Colormap) -> BerryResult<()> {
        self.layer_mut(name)?.set_colormap(colormap)
    }

    /// 设置图像图层的对比度范围.
    pub fn set_contrast_limits(&mut self, name: &str, limits: ContrastLimits) -> BerryResult<()> {
        self.layer_mut(name)?.set_contrast_limits(limits)
    }

    /// 设置图层不透明度, 必须位于 `[0, 1]`.
    pub fn set_opacity(&mut self, name: &str, opacity: f32) -> BerryResult<()> {
        self.layer_mut(name)?.set_opacity(opacity)
    }

    /// 按图层顺序将所有可见图层半透明叠加到黑色背景上.
    ///
    /// 图像图层经色图和对比度范围映射, 标签图层按编号着色, 点集绘制为实心圆.
    /// 尚无栅格图层时返回 `None`.
    pub fn render(&self) -> Option<RgbaImage> {
        let (h, w) = self.shape?;
        let mut canvas = vec![[0f32; 3]; h * w];
        let blend = |dst: &mut [f32; 3], src: Rgba, opacity: f32| {
            let a = src[3] * opacity;
            for c in 0..3 {
                dst[c] = src[c] * a + dst[c] * (1.0 - a);
            }
        };

        for layer in self.layers.iter().filter(|l| l.visible()) {
            let opacity = layer.opacity();
            match layer.data() {
                LayerData::Image(d) => {
                    let cmap = layer.colormap().unwrap_or_else(|| crate::colormap::gray());
                    let limits = layer.contrast_limits().unwrap_or_default();
                    for ((r, c), v) in d.indexed_iter() {
                        blend(&mut canvas[r * w + c], cmap.map(limits.normalize(*v)), opacity);
                    }
                }
                LayerData::Labels(d) => {
                    for ((r, c), l) in d.indexed_iter() {
                        blend(&mut canvas[r * w + c], label_color(*l), opacity);
                    }
                }
                LayerData::Points(p) => {
                    let radius = p.size() / 2.0;
                    for &[pr, pc] in p.coords() {
                        let rows = (pr - radius).floor().max(0.0) as usize
                            ..((pr + radius).ceil() + 1.0).clamp(0.0, h as f32) as usize;
                        for r in rows {
                            let cols = (pc - radius).floor().max(0.0) as usize
                                ..((pc + radius).ceil() + 1.0).clamp(0.0, w as f32) as usize;
                            for c in cols {
                                let (dr, dc) = (r as f32 - pr, c as f32 - pc);
                                if dr * dr + dc * dc <= radius * radius {
                                    blend(&mut canvas[r * w + c], p.face_color(), opacity);
                                }
                            }
                        }
                    }
                }
            }
        }

        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Some(RgbaImage::from_fn(w as u32, h as u32, |x, y| {
            let [r, g, b] = canvas[y as usize * w + x as usize];
            image::Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::{ColormapDef, Interpolation};
    use ndarray::array;

    #[test]
    fn test_names_and_duplicates() {
        let mut s = Session::new();
        assert_eq!(s.add_image(Image::zeros((4, 5)), None).unwrap(), "image");
        assert_eq!(s.add_image(Image::zeros((4, 5)), None).unwrap(), "image [1]");
        assert_eq!(s.add_labels(LabelMap::zeros((4, 5)), None).unwrap(), "labels");
        assert_eq!(s.add_points(PointSet::new(), Some("peaks")).unwrap(), "peaks");
        assert_eq!(s.add_image(Image::zeros((4, 5)), None).unwrap(), "image [2]");
        s.remove("image [1]").unwrap();
        assert_eq!(s.add_image(Image::zeros((4, 5)), None).unwrap(), "image [1]");
        assert_eq!(s.names(), vec!["image", "labels", "peaks", "image [2]", "image [1]"]);
        assert_eq!(s.shape(), Some((4, 5)));
    }

    #[test]
    fn test_shape_mismatch_detected_before_assignment() {
        let mut s = Session::new();
        s.add_image(Image::zeros((4, 5)), Some("nuclei_mip")).unwrap();
        s.add_labels(LabelMap::zeros((4, 5)), Some("foreground")).unwrap();

        let err = s.replace_labels("foreground", LabelMap::zeros((5, 4)));
        assert!(matches!(
            err,
            Err(BerryError::ShapeMismatch {
                expected: (4, 5),
                found: (5, 4)
            })
        ));
        // 原数据保持不变.
        assert_eq!(s.labels("foreground").unwrap().dim(), (4, 5));

        assert!(matches!(
            s.add_image(Image::zeros((1, 1)), None),
            Err(BerryError::ShapeMismatch { .. })
        ));
        assert_eq!(s.len(), 2);

        // 点集没有形状, 不受限制.
        s.add_points(PointSet::from_pixels(&[(100, 100)]), None).unwrap();
    }

    #[test]
    fn test_replace_checks_kind() {
        let mut s = Session::new();
        s.add_image(Image::zeros((2, 2)), Some("distance")).unwrap();
        assert!(matches!(
            s.replace_labels("distance", LabelMap::zeros((2, 2))),
            Err(BerryError::LayerKind { .. })
        ));
        s.replace_image("distance", Image::ones((2, 2))).unwrap();
        assert_eq!(s.image("distance").unwrap()[(1, 1)], 1.0);
        assert!(matches!(s.labels("distance"), Err(BerryError::LayerKind { .. })));
        assert!(matches!(s.image("nothing"), Err(BerryError::UnknownLayer(_))));
    }

    #[test]
    fn test_layers_are_independent_copies() {
        let mut s = Session::new();
        let mask = array![[true, false], [false, true]];
        s.add_mask(mask.view(), Some("foreground")).unwrap();
        s.upsert_mask("copy", mask.view()).unwrap();
        s.replace_mask("foreground", array![[false, false], [false, false]].view())
            .unwrap();
        assert_eq!(s.mask("copy").unwrap(), mask);
        assert!(s.mask("foreground").unwrap().iter().all(|p| !*p));
    }

    #[test]
    fn test_truncate_resets_shape() {
        let mut s = Session::new();
        s.add_image(Image::zeros((3, 3)), None).unwrap();
        s.add_points(PointSet::new(), None).unwrap();
        s.add_image(Image::zeros((3, 3)), None).unwrap();
        assert_eq!(s.truncate(1), 2);
        assert_eq!(s.names(), vec!["image"]);
        assert_eq!(s.truncate(0), 1);
        assert!(s.is_empty());
        assert_eq!(s.shape(), None);
        s.add_image(Image::zeros((7, 2)), None).unwrap();
        assert_eq!(s.shape(), Some((7, 2)));
    }

    #[test]
    fn test_display_properties() {
        let mut s = Session::new();
        s.add_image(array![[0.0, 0.05], [0.1, 0.4]], Some("nuclei")).unwrap();
        let layer = s.layer("nuclei").unwrap();
        assert_eq!(layer.opacity(), 1.0);
        assert!(layer.visible());
        assert_eq!(layer.colormap().unwrap().name(), "gray");
        assert_eq!(layer.contrast_limits().unwrap().max(), 0.4);

        let cmap = Colormap::try_from(ColormapDef {
            colors: vec![[1.0, 1.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]],
            name: "white_to_green".to_owned(),
            interpolation: Interpolation::Linear,
        })
        .unwrap();
        s.set_colormap("nuclei", cmap).unwrap();
        s.set_contrast_limits("nuclei", ContrastLimits::new(0.02, 0.1).unwrap())
            .unwrap();
        s.set_opacity("nuclei", 0.7).unwrap();
        assert!(matches!(
            s.set_opacity("nuclei", 1.5),
            Err(BerryError::InvalidOpacity(_))
        ));
        let layer = s.layer("nuclei").unwrap();
        assert_eq!(layer.opacity(), 0.7);
        assert_eq!(layer.colormap().unwrap().name(), "white_to_green");

        s.add_labels(LabelMap::zeros((2, 2)), None).unwrap();
        assert_eq!(s.layer("labels").unwrap().opacity(), 0.7);
        assert!(matches!(
            s.set_colormap("labels", crate::colormap::gray().clone()),
            Err(BerryError::LayerKind { .. })
        ));
    }

    #[test]
    fn test_points_editing_through_session() {
        let mut s = Session::new();
        s.add_points(PointSet::from_pixels(&[(1, 1), (2, 2), (3, 3)]), Some("peaks"))
            .unwrap();
        let peaks = s.points_mut("peaks").unwrap();
        peaks.select([1]);
        peaks.remove_selected();
        peaks.add([7.0, 7.0]);
        assert_eq!(s.points("peaks").unwrap().len(), 3);
    }

    #[test]
    fn test_render() {
        let mut s = Session::new();
        assert!(s.render().is_none());
        s.add_image(array![[0.0, 1.0], [0.5, 1.0]], Some("img")).unwrap();
        let rendered = s.render().unwrap();
        assert_eq!(rendered.dimensions(), (2, 2));
        assert_eq!(rendered.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(rendered.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(rendered.get_pixel(0, 1).0, [128, 128, 128, 255]);

        // 隐藏图层不参与渲染.
        s.layer_mut("img").unwrap().set_visible(false);
        assert_eq!(s.render().unwrap().get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_render_labels_and_points() {
        let mut s = Session::new();
        s.add_image(Image::from_elem((4, 4), 0.5), Some("img")).unwrap();
        s.set_contrast_limits("img", ContrastLimits::new(0.0, 1.0).unwrap())
            .unwrap();
        let mut labels = LabelMap::zeros((4, 4));
        labels[(1, 1)] = 2;
        s.add_labels(labels, None).unwrap();

        let under = crate::colormap::gray().map(0.5);
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let gray = [to_u8(under[0]), to_u8(under[1]), to_u8(under[2]), 255];

        let rendered = s.render().unwrap();
        // 背景标签完全透明.
        assert_eq!(rendered.get_pixel(0, 0).0, gray);
        let color = label_color(2);
        let a = color[3] * LABELS_OPACITY;
        let expected: Vec<u8> = (0..3)
            .map(|c| to_u8(color[c] * a + under[c] * (1.0 - a)))
            .chain([255])
            .collect();
        assert_eq!(rendered.get_pixel(1, 1).0.to_vec(), expected);

        // 半径为 1 的圆盘; 第二个点部分越界, 第三个点完全在画布外.
        let mut points = PointSet::new().with_size(2.0);
        points.add([3.0, 3.0]);
        points.add([-0.5, 1.0]);
        points.add([100.0, -50.0]);
        s.add_points(points, None).unwrap();
        let rendered = s.render().unwrap();
        let red = [255, 0, 0, 255];
        for (r, c) in [(3, 3), (2, 3), (3, 2), (0, 1)] {
            assert_eq!(rendered.get_pixel(c, r).0, red, "({r}, {c})");
        }
        for (r, c) in [(2, 2), (0, 0), (1, 0), (0, 2)] {
            assert_eq!(rendered.get_pixel(c, r).0, gray, "({r}, {c})");
        }
        assert_eq!(rendered.get_pixel(1, 1).0.to_vec(), expected);
    }
}
