//! 图像数据的加载、三维投影与持久化存储.

mod load;
mod project;
mod save;

#[cfg(feature = "remote")]
pub use load::fetch;
pub use load::{open, RawImage};
pub use project::max_projection;
pub use save::{save_image, save_labels, save_mask, save_rgba, ImgWriteRaw, ImgWriteVis};
