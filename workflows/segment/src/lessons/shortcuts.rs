//! 示例二: 百分位阈值控件与快捷键命令.

use super::{load_into, Inputs, Profile};
use nuclei_berry::consts::keys;
use nuclei_berry::prelude::*;
use std::collections::BTreeSet;

/// 模拟拖动滑块到的百分位.
const PERCENTILE: i64 = 12;

pub fn run(inputs: &Inputs) -> BerryResult<Profile> {
    let mut profile = Profile::new();
    let mut session = Session::new();
    let mip = load_into(&mut session, inputs, &mut profile)?;
    let shape = session.image(&mip)?.dim();

    let registry = default_registry(WorkflowParams::default())?;
    let mut widget = ThresholdWidget::new(&mip);
    widget.call(&mut session)?;
    widget.set_percentile(PERCENTILE, &mut session)?;
    profile.stage("threshold");

    registry.press(keys::PROCESS_FOREGROUND, &mut session)?;
    profile.stage("process_foreground");

    session.add_labels(LabelMap::zeros(shape), Some(layer_names::LIVE_SEGMENTATION))?;
    registry.press(keys::COMPLETE_SEGMENTATION, &mut session)?;
    profile.stage("complete_segmentation");

    let labels = session.labels(layer_names::LIVE_SEGMENTATION)?;
    let distinct: BTreeSet<u32> = labels.iter().copied().filter(|l| *l != 0).collect();
    profile.count_nuclei(distinct.len() as u32);

    let foreground = inputs.out.join("threshold_result.png");
    session.mask(layer_names::THRESHOLD_RESULT)?.save(&foreground)?;
    profile.wrote(foreground);
    let raw = inputs.out.join("nuclei_segmentation_shortcuts.tif");
    save_labels(labels.view(), &raw)?;
    profile.wrote(raw);
    profile.stage("save");

    Ok(profile.finish(session.len()))
}
