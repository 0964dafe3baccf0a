//! 运行统计.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// 分段计时器. 初始化时视为已经开始计时.
#[derive(Clone, Debug)]
struct StageTimer {
    consumed: Duration,
    since: Instant,
}

impl StageTimer {
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 结束当前区间并立即开始下一区间. 返回本区间时长.
    #[inline]
    fn lap(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        self.since = Instant::now();
        d
    }
}

/// 单个示例的运行统计.
#[derive(Clone, Debug)]
pub struct Profile {
    timer: StageTimer,

    /// 各阶段名称与耗时, 按执行顺序.
    stages: Vec<(&'static str, Duration)>,

    /// 结束时会话中的图层个数.
    layers: usize,

    /// 分割得到的细胞核个数. 不做分割的示例为 `None`.
    nuclei: Option<u32>,

    /// 写出的文件.
    outputs: Vec<PathBuf>,
}

impl Profile {
    /// 初始化, 同时开始计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            timer: StageTimer::new(),
            stages: Vec::new(),
            layers: 0,
            nuclei: None,
            outputs: Vec::new(),
        }
    }

    /// 结束一个阶段.
    #[inline]
    pub fn stage(&mut self, name: &'static str) {
        let d = self.timer.lap();
        self.stages.push((name, d));
    }

    /// 记录细胞核个数.
    #[inline]
    pub fn count_nuclei(&mut self, n: u32) {
        self.nuclei = Some(n);
    }

    /// 记录写出的文件.
    #[inline]
    pub fn wrote(&mut self, path: PathBuf) {
        self.outputs.push(path);
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// 各阶段耗时.
    #[inline]
    pub fn stages(&self) -> &[(&'static str, Duration)] {
        &self.stages
    }

    /// 以微秒为单位获得所有阶段的总耗时.
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.timer.consumed.as_micros() as u64
    }

    /// 图层个数.
    #[inline]
    pub fn get_layers(&self) -> usize {
        self.layers
    }

    /// 细胞核个数.
    #[inline]
    pub fn get_nuclei(&self) -> Option<u32> {
        self.nuclei
    }

    /// 写出的文件.
    #[inline]
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }
}
