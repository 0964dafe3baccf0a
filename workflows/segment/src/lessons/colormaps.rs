//! 示例三: 内置色图与自定义色图.

use super::{Inputs, Profile};
use nuclei_berry::colormap::{self, linspace};
use nuclei_berry::consts::rgba::WHITE;
use nuclei_berry::prelude::*;
use std::path::Path;

/// 细胞核清晰可见的 z 层.
const IN_FOCUS_Z: usize = 30;

const BLUE: Rgba = [0.0, 0.0, 1.0, 1.0];
const GREEN: Rgba = [0.0, 1.0, 0.0, 1.0];

/// 取第 [`IN_FOCUS_Z`] 层; 层数不足或本身是二维数据时退化为最大强度投影.
fn in_focus_plane(path: &Path) -> BerryResult<Image> {
    let raw = open(path)?;
    Ok(match raw.plane_at(IN_FOCUS_Z) {
        Some(plane) => plane,
        None => {
            log::warn!("`{}` has no z = {IN_FOCUS_Z}, projecting instead", path.display());
            raw.into_plane(0)
        }
    })
}

fn render_to(
    session: &Session,
    inputs: &Inputs,
    name: &str,
    profile: &mut Profile,
) -> BerryResult<()> {
    if let Some(rendered) = session.render() {
        let path = inputs.out.join(name);
        save_rgba(&rendered, &path)?;
        profile.wrote(path);
    }
    Ok(())
}

pub fn run(inputs: &Inputs) -> BerryResult<Profile> {
    let mut profile = Profile::new();
    let mut session = Session::new();
    let nuclei = in_focus_plane(&inputs.nuclei)?;
    profile.stage("load");

    let nuclei = session.add_image(nuclei, Some("nuclei"))?;
    let blue = colormap::builtin("blue")
        .cloned()
        .unwrap_or_else(|| colormap::gray().clone());
    session.set_colormap(&nuclei, blue)?;
    session.set_contrast_limits(&nuclei, ContrastLimits::new(0.0, 0.4)?)?;
    render_to(&session, inputs, "nuclei_blue.png", &mut profile)?;

    // 查找表由 10 个等距颜色构成.
    let white_to_blue = Colormap::try_from(ColormapDef {
        colors: linspace(WHITE, BLUE, 10),
        name: "white_to_blue".to_owned(),
        interpolation: Interpolation::Linear,
    })?;
    session.set_colormap(&nuclei, white_to_blue)?;
    render_to(&session, inputs, "nuclei_white_to_blue.png", &mut profile)?;
    profile.stage("nuclei");

    let Some(path) = &inputs.membranes else {
        log::warn!("no membrane image, white_to_green overlay skipped");
        return Ok(profile.finish(session.len()));
    };
    let membranes = in_focus_plane(path)?;

    // 线性插值只需给出两端颜色.
    let white_to_green =
        Colormap::new("white_to_green", vec![WHITE, GREEN], Interpolation::Linear)?;
    let limits = ContrastLimits::new(0.02, 0.1)?;
    let standalone = inputs.out.join("membranes_white_to_green.png");
    save_rgba(
        &colormap::apply(membranes.view(), &white_to_green, limits, 0.7),
        &standalone,
    )?;
    profile.wrote(standalone);

    if session.shape() == Some(membranes.dim()) {
        let overlay = session.add_image(membranes, Some("membranes"))?;
        session.set_colormap(&overlay, white_to_green)?;
        session.set_contrast_limits(&overlay, limits)?;
        session.set_opacity(&overlay, 0.7)?;
        render_to(&session, inputs, "composite.png", &mut profile)?;
    } else {
        log::warn!("membrane and nuclei images differ in shape, composite skipped");
    }
    profile.stage("membranes");

    Ok(profile.finish(session.len()))
}
