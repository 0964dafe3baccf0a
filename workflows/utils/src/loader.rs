//! 对 `nuclei-berry::dataset` 的更一层封装. 提供更直接的路径解析.

use nuclei_berry::dataset::home_dataset_dir_with;
use std::env;
use std::path::PathBuf;

/// 获取细胞核图像路径.
///
/// 1. 若环境变量 `$NUCLEI_IMAGE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nuclei/nuclei.tif`.
pub fn nuclei_image_from_env_or_home() -> Option<PathBuf> {
    from_env_or_home("NUCLEI_IMAGE", ["nuclei.tif"])
}

/// 获取细胞膜图像路径 (色图示例使用).
///
/// 1. 若环境变量 `$MEMBRANE_IMAGE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nuclei/cell_membranes.tif`.
pub fn membrane_image_from_env_or_home() -> Option<PathBuf> {
    from_env_or_home("MEMBRANE_IMAGE", ["cell_membranes.tif"])
}

/// 获取输出目录.
///
/// 1. 若环境变量 `$NUCLEI_OUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nuclei/out`.
pub fn out_dir_from_env_or_home() -> Option<PathBuf> {
    from_env_or_home("NUCLEI_OUT_DIR", ["out"])
}

fn from_env_or_home<const N: usize>(key: &str, rest: [&str; N]) -> Option<PathBuf> {
    match env::var(key) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(rest),
    }
}
