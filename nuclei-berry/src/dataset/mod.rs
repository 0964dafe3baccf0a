//! 本地数据目录约定.
//!
//! 所有样例数据默认存放在 `{用户主目录}/dataset/nuclei` 下:
//!
//! ```text
//! dataset/nuclei
//! ├── nuclei.tif            # 细胞核荧光图像, 多页 TIFF 按 `[z, 高, 宽]` 读入
//! ├── cell_membranes.tif    # 细胞膜荧光图像, 同上
//! └── out/                  # 分割结果与渲染结果
//! ```

use std::path::{Path, PathBuf};

/// 数据子目录名.
const NUCLEI: &str = "nuclei";

/// 获取 `{用户主目录}/dataset/nuclei` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.push(NUCLEI);
    Some(ans)
}

/// 获取 `{用户主目录}/dataset/nuclei` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
