//! 可视化管线入口: 查看器 bundle, 会话 JSON 与合并场景.

use clap::Parser;
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

mod args;
mod runner;

use args::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("日志系统初始化失败");

    let result = match &cli.command {
        Command::Bundle(a) => runner::run_bundle(a),
        Command::State(a) => runner::run_state(a),
        Command::Scene(a) => runner::run_scene(a),
    };
    if let Err(e) = result {
        error!("{e:?}");
        std::process::exit(1);
    }
}
