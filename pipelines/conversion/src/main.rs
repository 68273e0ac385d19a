//! 转换管线入口: 映射文件表格化与体素掩码网格化.

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
        Command::Table(a) => runner::run_table(a),
        Command::NeuronMesh(a) => runner::run_neuron_mesh(a),
        Command::VesicleMesh(a) => runner::run_vesicle_mesh(a),
    };
    if let Err(e) = result {
        error!("{e:?}");
        std::process::exit(1);
    }
}
