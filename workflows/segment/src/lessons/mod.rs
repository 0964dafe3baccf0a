//! 教程中的各个示例. 每个示例使用独立的会话, 互不影响.

mod colormaps;
mod marker;
mod profile;
mod shortcuts;

use nuclei_berry::prelude::*;
use std::path::PathBuf;

pub use profile::Profile;

/// 示例的输入与输出位置.
pub struct Inputs {
    /// 细胞核图像.
    pub nuclei: PathBuf,

    /// 细胞膜图像, 可选.
    pub membranes: Option<PathBuf>,

    /// 输出目录.
    pub out: PathBuf,
}

/// 示例函数.
pub type Lesson = fn(&Inputs) -> BerryResult<Profile>;

/// 全部示例.
pub const ALL: [(&str, Lesson); 3] = [
    ("marker watershed", marker::run),
    ("widget and shortcuts", shortcuts::run),
    ("colormaps", colormaps::run),
];

/// 加载图像并压平为二维, 作为会话的第一个图层.
fn load_into(
    session: &mut Session,
    inputs: &Inputs,
    profile: &mut Profile,
) -> BerryResult<String> {
    let image = open(&inputs.nuclei)?.into_plane(0);
    profile.stage("load");
    session.add_image(image, Some(layer_names::NUCLEI_MIP))
}
