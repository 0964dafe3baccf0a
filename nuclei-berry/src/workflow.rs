//! 两阶段细胞核分割工作流.
//!
//! 1. [`Pipeline::propose_seeds`]: 阈值 -> 掩膜清理 -> 距离变换 -> 高斯平滑 -> 局部极大值,
//!    得到候选种子 ([`Proposal`]);
//! 2. 人工在点集上增删种子;
//! 3. [`Proposal::finalize_seeds`]: 以修正后的种子为标记, 在平滑距离图取负后的地形上做分水岭.
//!
//! 此外提供绑定在会话上的版本, 以及供快捷键调用的两个命令.

use crate::consts::{keys, layer, SMOOTH_SIGMA};
use crate::distance::distance_transform_edt;
use crate::filters::{foreground, gaussian};
use crate::morph::{clean, label, CleanParams, Connectivity};
use crate::peaks::{peak_local_max, PeakParams};
use crate::session::{CommandRegistry, PointSet, Session};
use crate::watershed::{markers_from_points, watershed, Segmented};
use crate::{BerryResult, Image, Mask};
use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 工作流参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorkflowParams {
    /// 掩膜清理参数.
    pub clean: CleanParams,

    /// 距离图高斯平滑的标准差.
    pub sigma: f32,

    /// 种子 (局部极大值) 检测参数.
    pub peaks: PeakParams,

    /// 分水岭淹没的邻接规则.
    pub watershed_connectivity: Connectivity,
}

impl Default for WorkflowParams {
    fn default() -> Self {
        Self {
            clean: CleanParams::default(),
            sigma: SMOOTH_SIGMA,
            peaks: PeakParams::default(),
            watershed_connectivity: Connectivity::Four,
        }
    }
}

/// 种子提议阶段的全部中间结果.
#[derive(Clone, Debug)]
pub struct Proposal {
    foreground: Mask,
    distance: Image,
    smoothed: Image,
    seeds: PointSet,
    connectivity: Connectivity,
}

impl Proposal {
    /// 前景掩膜 (已清理).
    #[inline]
    pub fn foreground(&self) -> &Mask {
        &self.foreground
    }

    /// 平滑前的距离图.
    #[inline]
    pub fn distance(&self) -> &Image {
        &self.distance
    }

    /// 平滑后的距离图.
    #[inline]
    pub fn smoothed(&self) -> &Image {
        &self.smoothed
    }

    /// 候选种子.
    #[inline]
    pub fn seeds(&self) -> &PointSet {
        &self.seeds
    }

    /// 以 `seeds` 为标记完成分割.
    ///
    /// 种子先四舍五入到像素 (越界者丢弃), 相互 8-邻接的种子合并为同一个标记;
    /// 分水岭只在前景掩膜内进行. 没有任何有效种子时返回全背景,
    /// 并通过 [`Segmented::warning`] 报告.
    pub fn finalize_seeds(&self, seeds: &PointSet) -> Segmented {
        let shape = self.foreground.dim();
        let (markers, n) = markers_from_points(shape, &seeds.to_pixels(shape));
        let elevation = self.smoothed.mapv(|v| -v);
        let ans = watershed(
            elevation.view(),
            markers.view(),
            Some(self.foreground.view()),
            self.connectivity,
        );
        log::info!(
            "segmentation: {} seed(s), {n} marker(s), {} nucleus/nuclei",
            seeds.len(),
            ans.count
        );
        ans
    }

    /// 读取会话中名为 `points` 的点集图层作为种子完成分割,
    /// 并把结果写入 `nuclei_segmentation` 标签图层.
    pub fn finalize_into(&self, session: &mut Session, points: &str) -> BerryResult<Segmented> {
        let ans = self.finalize_seeds(session.points(points)?);
        session.upsert_labels(layer::NUCLEI_SEGMENTATION, ans.labels.clone())?;
        Ok(ans)
    }
}

/// 按给定参数运行的分割流水线.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    params: WorkflowParams,
}

impl Pipeline {
    /// 以给定参数创建流水线.
    #[inline]
    pub fn new(params: WorkflowParams) -> Self {
        Self { params }
    }

    /// 流水线参数.
    #[inline]
    pub fn params(&self) -> &WorkflowParams {
        &self.params
    }

    /// 第一阶段: 从原始图像提议种子.
    pub fn propose_seeds(&self, image: ArrayView2<'_, f32>) -> Proposal {
        let (mask, _) = foreground(image);
        self.propose_from_mask(mask.view())
    }

    /// 从未清理的前景掩膜提议种子.
    pub fn propose_from_mask(&self, mask: ArrayView2<'_, bool>) -> Proposal {
        self.seeds_from_foreground(clean(mask, &self.params.clean))
    }

    /// 从已清理的前景掩膜提议种子. 每个前景连通分量内独立寻找局部极大值.
    pub fn seeds_from_foreground(&self, foreground: Mask) -> Proposal {
        let distance = distance_transform_edt(foreground.view());
        let smoothed = gaussian(distance.view(), self.params.sigma);
        let (components, n) = label(foreground.view(), Connectivity::Eight);
        let peaks = peak_local_max(smoothed.view(), Some(components.view()), &self.params.peaks);
        log::info!("seeds: {} peak(s) in {n} component(s)", peaks.len());

        Proposal {
            foreground,
            distance,
            smoothed,
            seeds: PointSet::from_pixels(&peaks),
            connectivity: self.params.watershed_connectivity,
        }
    }

    /// 对会话中的 `source` 图像图层提议种子, 并写入中间结果图层:
    /// `foreground` 标签图层, `distance` 图像图层 (内容为平滑后的距离图), `peaks` 点集图层.
    ///
    /// 返回提议结果与点集图层的实际名称.
    pub fn propose_into(
        &self,
        session: &mut Session,
        source: &str,
    ) -> BerryResult<(Proposal, String)> {
        let proposal = self.propose_seeds(session.image(source)?.view());

        session.add_mask(proposal.foreground.view(), Some(layer::FOREGROUND))?;
        let distance = session.add_image(proposal.distance.clone(), Some(layer::DISTANCE))?;
        session.replace_image(&distance, proposal.smoothed.clone())?;
        let points = session.add_points(proposal.seeds.clone(), Some(layer::PEAKS))?;
        Ok((proposal, points))
    }
}

/// 命令: 原地清理 `threshold result` 图层.
pub fn process_foreground(session: &mut Session, params: &CleanParams) -> BerryResult<()> {
    let mask = session.mask(layer::THRESHOLD_RESULT)?;
    let cleaned = clean(mask.view(), params);
    session.replace_mask(layer::THRESHOLD_RESULT, cleaned.view())
}

/// 命令: 以 `threshold result` 图层为前景完成分割 (不再清理), 使用全部候选种子,
/// 结果写入 `nuclei segmentation` 标签图层.
pub fn complete_segmentation(session: &mut Session, pipeline: &Pipeline) -> BerryResult<()> {
    let mask = session.mask(layer::THRESHOLD_RESULT)?;
    let proposal = pipeline.seeds_from_foreground(mask);
    let segmented = proposal.finalize_seeds(proposal.seeds());
    if let Some(w) = segmented.warning() {
        log::warn!("{w}");
    }
    session.upsert_labels(layer::LIVE_SEGMENTATION, segmented.labels)
}

/// 注册 `process_foreground` 与 `complete_segmentation` 两个命令,
/// 并分别绑定到 `Shift-P` 与 `Shift-S`.
pub fn default_registry(params: WorkflowParams) -> BerryResult<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    let pipeline = Pipeline::new(params);
    registry.register("process_foreground", move |s| {
        process_foreground(s, &params.clean)
    })?;
    registry.register("complete_segmentation", move |s| {
        complete_segmentation(s, &pipeline)
    })?;
    registry.bind_key(keys::PROCESS_FOREGROUND, "process_foreground")?;
    registry.bind_key(keys::COMPLETE_SEGMENTATION, "complete_segmentation")?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ThresholdWidget;
    use crate::{BerryError, LabelMap};
    use ndarray::s;

    /// 两个互不接触的 20x20 正方形 "细胞核".
    fn two_squares() -> Image {
        let mut image = Image::zeros((40, 60));
        image.slice_mut(s![10..30, 5..25]).fill(1.0);
        image.slice_mut(s![10..30, 35..55]).fill(1.0);
        image
    }

    fn small_params() -> WorkflowParams {
        WorkflowParams {
            clean: CleanParams::with_sizes(1, 1),
            sigma: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_squares_end_to_end() {
        // 重复初始化会失败, 忽略即可.
        let _ = simple_logger::init_with_level(log::Level::Debug);
        let image = two_squares();
        let pipeline = Pipeline::new(small_params());
        let proposal = pipeline.propose_seeds(image.view());
        assert_eq!(proposal.foreground(), &image.mapv(|v| v > 0.5));
        assert_eq!(proposal.seeds().len(), 2);

        let seg = proposal.finalize_seeds(proposal.seeds());
        assert_eq!(seg.count, 2);
        assert!(seg.warning().is_none());
        let (a, b) = (seg.labels[(20, 15)], seg.labels[(20, 45)]);
        assert!(a != 0 && b != 0 && a != b);
        // 每个正方形恰好被一个标签覆盖, 背景保持为 0.
        assert!(seg.labels.slice(s![10..30, 5..25]).iter().all(|l| *l == a));
        assert!(seg.labels.slice(s![10..30, 35..55]).iter().all(|l| *l == b));
        assert_eq!(seg.labels.iter().filter(|l| **l == 0).count(), 40 * 60 - 800);
    }

    #[test]
    fn test_manual_correction() {
        let pipeline = Pipeline::new(small_params());
        let proposal = pipeline.propose_seeds(two_squares().view());

        // 删除一个种子: 对应的正方形没有标记, 保持为背景.
        let mut seeds = proposal.seeds().clone();
        seeds.remove([1]);
        let seg = proposal.finalize_seeds(&seeds);
        assert_eq!(seg.count, 1);
        assert_eq!(seg.labels.iter().filter(|l| **l != 0).count(), 400);

        // 在同一个正方形里再加两个相距较远的种子: 该正方形被分成多块.
        let mut seeds = proposal.seeds().clone();
        seeds.add([11.0, 6.0]);
        seeds.add([28.0, 23.0]);
        let seg = proposal.finalize_seeds(&seeds);
        assert_eq!(seg.count, 4);

        // 越界或位于背景上的种子被忽略.
        let mut seeds = PointSet::new();
        seeds.add([-5.0, 3.0]);
        seeds.add([2.0, 2.0]);
        let seg = proposal.finalize_seeds(&seeds);
        assert_eq!(seg.count, 0);
        assert!(matches!(seg.warning(), Some(BerryError::EmptySeedSet)));
        assert!(seg.labels.iter().all(|l| *l == 0));
    }

    #[test]
    fn test_session_bound_workflow() {
        let mut session = Session::new();
        session
            .add_image(two_squares(), Some(layer::NUCLEI_MIP))
            .unwrap();
        let pipeline = Pipeline::new(small_params());
        let (proposal, points) = pipeline
            .propose_into(&mut session, layer::NUCLEI_MIP)
            .unwrap();
        assert_eq!(
            session.names(),
            vec!["nuclei_mip", "foreground", "distance", "peaks"]
        );
        assert_eq!(session.image(layer::DISTANCE).unwrap(), proposal.smoothed());
        assert_eq!(&session.mask(layer::FOREGROUND).unwrap(), proposal.foreground());

        session.points_mut(&points).unwrap().select([0]);
        session.points_mut(&points).unwrap().remove_selected();
        let seg = proposal.finalize_into(&mut session, &points).unwrap();
        assert_eq!(seg.count, 1);
        assert_eq!(session.labels(layer::NUCLEI_SEGMENTATION).unwrap(), &seg.labels);

        assert!(matches!(
            proposal.finalize_into(&mut session, layer::NUCLEI_MIP),
            Err(BerryError::LayerKind { .. })
        ));
    }

    #[test]
    fn test_key_bound_commands() {
        let mut session = Session::new();
        session
            .add_image(two_squares(), Some(layer::NUCLEI_MIP))
            .unwrap();
        let registry = default_registry(small_params()).unwrap();

        // 尚无 `threshold result` 图层.
        assert!(matches!(
            registry.press("Shift-P", &mut session),
            Err(BerryError::UnknownLayer(_))
        ));

        let mut widget = ThresholdWidget::new(layer::NUCLEI_MIP);
        assert!(widget.set_percentile(12, &mut session).unwrap());
        assert!(registry.press("Shift-P", &mut session).unwrap());

        session
            .add_labels(LabelMap::zeros((40, 60)), Some(layer::LIVE_SEGMENTATION))
            .unwrap();
        assert!(registry.press("shift-s", &mut session).unwrap());
        let labels = session.labels(layer::LIVE_SEGMENTATION).unwrap();
        assert_ne!(labels[(20, 15)], 0);
        assert_ne!(labels[(20, 45)], 0);
        assert_ne!(labels[(20, 15)], labels[(20, 45)]);
        assert_eq!(
            session.names(),
            vec!["nuclei_mip", "threshold result", "nuclei segmentation"]
        );
    }

    #[test]
    fn test_default_params() {
        let params = WorkflowParams::default();
        assert_eq!(params.sigma, 10.0);
        assert_eq!(params.peaks.footprint, 7);
        assert_eq!(params.clean.min_hole_size, 60);
        assert_eq!(params.clean.min_object_size, 50);
    }
}
