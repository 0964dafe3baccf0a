//! 细胞核交互式分割教程的批处理版本.
//!
//! 人工修正与控件操作以固定的脚本代替. 输入输出路径见 `utils::loader`.

mod lessons;
mod result;
mod runner;

fn main() {
    utils::init_logger();
    let result = runner::run();
    result.analyze();
    if !result.all_succeeded() {
        std::process::exit(1);
    }
}
