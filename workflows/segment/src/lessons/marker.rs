//! 示例一: 边缘滤波预览, 然后是 "提议种子 -> 人工修正 -> 分水岭" 的两阶段分割.

use super::{load_into, Inputs, Profile};
use nuclei_berry::filters;
use nuclei_berry::prelude::*;
use ndarray::ArrayView2;

/// 人工修正时删除的候选种子下标.
const REJECTED_SEED: usize = 11;

pub fn run(inputs: &Inputs) -> BerryResult<Profile> {
    let mut profile = Profile::new();
    let mut session = Session::new();
    let mip = load_into(&mut session, inputs, &mut profile)?;

    let gallery: [(&str, fn(ArrayView2<'_, f32>) -> Image); 5] = [
        ("sobel_h", filters::sobel_h),
        ("sobel_v", filters::sobel_v),
        ("roberts", filters::roberts),
        ("prewitt", filters::prewitt),
        ("scharr", filters::scharr),
    ];
    let source = session.image(&mip)?.clone();
    for (name, filter) in gallery {
        session.add_image(filter(source.view()), Some(name))?;
    }
    log::info!("edge gallery: {:?}", session.names());
    // 只保留原图.
    session.truncate(1);
    profile.stage("edges");

    let pipeline = Pipeline::default();
    let (proposal, points) = pipeline.propose_into(&mut session, &mip)?;
    profile.stage("propose");

    let peaks = session.points_mut(&points)?;
    peaks.select([REJECTED_SEED]);
    if peaks.remove_selected() == 0 {
        log::warn!("fewer than {} seeds, nothing rejected", REJECTED_SEED + 1);
    }
    let snapshot = inputs.out.join("peaks.bin");
    std::fs::write(&snapshot, session.points(&points)?.to_bytes()?)
        .map_err(PersistError::from)?;
    profile.wrote(snapshot);

    let segmented = proposal.finalize_into(&mut session, &points)?;
    if let Some(w) = segmented.warning() {
        log::warn!("{w}");
    }
    profile.count_nuclei(segmented.count);
    profile.stage("finalize");

    let raw = inputs.out.join("nuclei_segmentation.tif");
    save_labels(segmented.labels.view(), &raw)?;
    profile.wrote(raw);
    let vis = inputs.out.join("nuclei_segmentation_vis.png");
    segmented.labels.save(&vis)?;
    profile.wrote(vis);
    profile.stage("save");

    Ok(profile.finish(session.len()))
}
