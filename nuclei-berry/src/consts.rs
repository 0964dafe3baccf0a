//! 通用常量.

/// 标签图中背景的值.
pub const BACKGROUND: u32 = 0;

/// 默认的孔洞填充门限. 面积 (像素数) **严格小于** 该值的封闭孔洞会被填充.
pub const MIN_HOLE_SIZE: usize = 60;

/// 默认的小目标移除门限. 面积 (像素数) **严格小于** 该值的前景连通区域会被移除.
pub const MIN_OBJECT_SIZE: usize = 50;

/// 默认的距离图高斯平滑标准差.
pub const SMOOTH_SIGMA: f32 = 10.0;

/// 默认的局部极大值检测窗口边长 (正方形, 奇数).
pub const PEAK_FOOTPRINT: usize = 7;

/// 默认的局部极大值边界排除宽度. 距图像边缘小于该值的像素不会成为峰.
pub const PEAK_EXCLUDE_BORDER: usize = 1;

/// 高斯核截断半径 (以标准差为单位).
pub const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// 点集默认显示尺寸.
pub const POINT_SIZE: f32 = 5.0;

/// 百分位阈值控件的默认值.
pub const THRESHOLD_PERCENTILE: i64 = 50;

/// 常用图层名.
pub mod layer {
    /// 原始 (投影后) 图像.
    pub const NUCLEI_MIP: &str = "nuclei_mip";

    /// 自动阈值得到的前景.
    pub const FOREGROUND: &str = "foreground";

    /// 距离变换 (随后被平滑结果替换).
    pub const DISTANCE: &str = "distance";

    /// 候选种子点.
    pub const PEAKS: &str = "peaks";

    /// 两阶段工作流的最终分割.
    pub const NUCLEI_SEGMENTATION: &str = "nuclei_segmentation";

    /// 百分位阈值控件的输出图层.
    pub const THRESHOLD_RESULT: &str = "threshold result";

    /// 快捷键工作流的分割输出图层.
    pub const LIVE_SEGMENTATION: &str = "nuclei segmentation";
}

/// 默认快捷键.
pub mod keys {
    /// 清理 `threshold result` 图层.
    pub const PROCESS_FOREGROUND: &str = "Shift-P";

    /// 在 `threshold result` 上完成分割.
    pub const COMPLETE_SEGMENTATION: &str = "Shift-S";
}

/// 常用 RGBA 颜色, 各分量位于 `[0, 1]`.
pub mod rgba {
    use crate::colormap::Rgba;

    /// 黑色.
    pub const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];

    /// 白色.
    pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

    /// 红色. 候选种子点的默认颜色.
    pub const RED: Rgba = [1.0, 0.0, 0.0, 1.0];

    /// 全透明.
    pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];
}
