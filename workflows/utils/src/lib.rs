//! 工作流程序依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 日志级别环境变量.
const LOG_ENV: &str = "NUCLEI_LOG";

/// 向 `w` 写入一行简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 初始化日志. 默认级别为 `Info`, 可由 `$NUCLEI_LOG` (例如 `debug`, `warn`) 覆盖.
pub fn init_logger() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| v.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("logger already initialized: {e}");
    }
}
