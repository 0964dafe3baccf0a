//! 程序运行函数.

use crate::lessons::{self, Inputs};
use crate::result::LessonResult;
use utils::loader;

/// 实际运行.
pub fn run() -> LessonResult {
    let nuclei =
        loader::nuclei_image_from_env_or_home().expect("Cannot resolve nuclei image path");
    assert!(nuclei.is_file(), "`{}` is not a file", nuclei.display());
    let out = loader::out_dir_from_env_or_home().expect("Cannot resolve output directory");
    std::fs::create_dir_all(&out).expect("Creating output directory error");
    let membranes = loader::membrane_image_from_env_or_home().filter(|p| p.is_file());

    let inputs = Inputs {
        nuclei,
        membranes,
        out,
    };

    // 逐个运行, 不并行.
    println!("Running lessons...");
    LessonResult::from_iter(lessons::ALL.into_iter().map(|(name, t)| {
        log::info!("lesson `{name}`");
        (name, t(&inputs).map_err(|e| e.to_string()))
    }))
}
