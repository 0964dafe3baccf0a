//! 参数化控件. 控件在输入改变时自动重新计算, 并把结果写回会话.

use super::Session;
use crate::consts::{layer, THRESHOLD_PERCENTILE};
use crate::filters::threshold_percentile;
use crate::BerryResult;

/// 有界整数滑块.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IntSlider {
    min: i64,
    max: i64,
    value: i64,
}

impl IntSlider {
    /// 创建滑块. `value` 会被截断到 `[min, max]`.
    ///
    /// # Panics
    ///
    /// 如果 `min > max`.
    pub fn new(min: i64, max: i64, value: i64) -> Self {
        assert!(min <= max, "slider range [{min}, {max}] is empty");
        Self {
            min,
            max,
            value: value.clamp(min, max),
        }
    }

    /// 当前值.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// 取值范围.
    #[inline]
    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    /// 设置新值 (截断到范围内). 返回值是否发生了变化.
    pub fn set(&mut self, value: i64) -> bool {
        let value = value.clamp(self.min, self.max);
        let changed = value != self.value;
        self.value = value;
        changed
    }
}

/// 百分位阈值控件.
///
/// 输入: 一个图像图层和一个 `[0, 100]` 的百分位滑块;
/// 输出: `image > min + p / 100 * (max - min)` 的掩膜, 写入 `threshold result` 标签图层
/// (第一次调用时创建). 任一输入改变都会自动重新调用.
#[derive(Clone, Debug)]
pub struct ThresholdWidget {
    source: String,
    output: String,
    percentile: IntSlider,
}

impl ThresholdWidget {
    /// 以默认百分位 (50) 创建控件, 输入为 `source` 图像图层. 创建时不会调用.
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            output: layer::THRESHOLD_RESULT.to_owned(),
            percentile: IntSlider::new(0, 100, THRESHOLD_PERCENTILE),
        }
    }

    /// 输入图层名.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 输出图层名.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// 当前百分位.
    #[inline]
    pub fn percentile(&self) -> i64 {
        self.percentile.value()
    }

    /// 以当前输入计算一次, 并把结果写入输出图层.
    pub fn call(&self, session: &mut Session) -> BerryResult<()> {
        let image = session.image(&self.source)?;
        let mask = threshold_percentile(image.view(), self.percentile.value());
        log::debug!(
            "threshold widget: {} at percentile {}",
            self.source,
            self.percentile.value()
        );
        session.upsert_mask(&self.output, mask.view())
    }

    /// 移动滑块. 值改变时自动调用, 返回是否重新计算.
    pub fn set_percentile(&mut self, value: i64, session: &mut Session) -> BerryResult<bool> {
        if !self.percentile.set(value) {
            return Ok(false);
        }
        self.call(session).map(|_| true)
    }

    /// 更换输入图层. 名称改变时自动调用, 返回是否重新计算.
    pub fn set_source(&mut self, source: &str, session: &mut Session) -> BerryResult<bool> {
        if self.source == source {
            return Ok(false);
        }
        self.source = source.to_owned();
        self.call(session).map(|_| true)
    }
}
