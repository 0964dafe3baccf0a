#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供细胞核荧光图像的交互式实例分割工作流, 以及该工作流依赖的基础图像处理算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 只处理二维单通道图像. 三维数据 (多页 / 体数据) 在加载后需要先做最大强度投影.
//! 2. 所有变换都按值语义工作: 输入只借用, 输出是新分配的数组. 图层之间不共享数据.
//! 3. 在非期望情况下 (违反文档中写明的调用约定), 程序会直接 panic, 而不会导致内存错误.
//!
//! # 工作流
//!
//! ### 数据加载 ✅
//!
//! 支持常见栅格图像 (png/tiff/...), `.npy` 与 nifti 文件. 三维数据通过最大强度投影压平.
//!
//! 实现位于 `nuclei-berry/src/data`.
//!
//! ### 前景提取 ✅
//!
//! Li 最小交叉熵自动阈值, 另提供 Otsu 阈值和百分位阈值 (交互控件使用).
//!
//! 实现位于 `nuclei-berry/src/filters/threshold.rs`.
//!
//! ### 掩膜清理 ✅
//!
//! 填充小孔洞 (4-邻接), 移除小目标 (8-邻接). 该操作是幂等的.
//!
//! 实现位于 `nuclei-berry/src/morph`.
//!
//! ### 距离变换 + 高斯平滑 + 局部极大值 ✅
//!
//! 精确欧氏距离变换 (Felzenszwalb 算法), 可分离高斯平滑, 按连通分量约束的局部极大值检测.
//!
//! 实现位于 `nuclei-berry/src/{distance, filters/gaussian, peaks}.rs`.
//!
//! ### 人工修正 + 标记控制分水岭 ✅
//!
//! 两阶段接口: [`workflow::Pipeline::propose_seeds`] 给出候选种子,
//! 人工增删后交给 [`workflow::Proposal::finalize_seeds`] 完成分割.
//!
//! 实现位于 `nuclei-berry/src/{session/points, watershed, workflow}.rs`.
//!
//! ### 会话 (图层集合), 命令注册表, 参数化控件 ✅
//!
//! 实现位于 `nuclei-berry/src/session`.
//!
//! ### 自定义色图 ✅
//!
//! 实现位于 `nuclei-berry/src/colormap.rs`.

use ndarray::Array2;

/// 二维索引 `(高, 宽)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 一个连通区域的所有像素索引.
pub type Area2d = Vec<Idx2d>;

/// 多个连通区域.
pub type Areas2d = Vec<Area2d>;

/// 单通道灰度图像. 像素值为任意有限浮点数.
pub type Image = Array2<f32>;

/// 二值掩膜, `true` 为前景.
pub type Mask = Array2<bool>;

/// 实例分割标签图. `0` 为背景, 正整数为互不相同的目标编号.
pub type LabelMap = Array2<u32>;

pub mod colormap;

pub mod consts;

pub mod data;

pub mod dataset;

pub mod distance;

mod error;

pub use error::{BerryError, BerryResult, DataLoadError, PersistError};

pub mod filters;

pub mod morph;

pub mod peaks;

pub mod session;

pub mod watershed;

pub mod workflow;

pub mod prelude;
