//! 冰球概率场计算: 加载场景, 扫描, 写出结果.

mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn main() -> ExitCode {
    // 默认 info 级别, 可由 `$RUST_LOG` 覆盖.
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("日志初始化失败: {e}");
    }

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(utils::cpus())
        .build_global()
    {
        log::warn!("线程池初始化失败, 使用默认配置: {e}");
    }

    match runner::run() {
        Ok(result) => {
            result.analyze();
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
