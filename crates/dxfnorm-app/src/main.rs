//! DXFNORM 命令行入口
//!
//! 读取配置与图层规则表，批量规范化 DXF 图纸并写出结果。

mod config;
mod run;

use anyhow::{Context, Result};
use clap::Parser;
use config::{AppConfig, OutputMode};
use dxfnorm_core::rule::RuleTable;
use run::Job;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// 批量规范化 DXF 图纸：展开块、清理块定义、按规则重映射图层、统一样式
#[derive(Debug, Parser)]
#[command(name = "dxfnorm", version, about)]
struct Cli {
    /// 输入的 DXF 文件或目录
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 图层规则表（.csv 或 .json）
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出方式
    #[arg(long, value_enum)]
    mode: Option<OutputMode>,

    /// 图章文件；未指定时使用输入中的 logos.dxf
    #[arg(long)]
    stamp: Option<PathBuf>,

    /// 把修订云来源图层上的闭合轮廓转换为修订云
    #[arg(long)]
    revision_cloud: bool,

    /// 修订云来源图层
    #[arg(long)]
    cloud_layer: Option<String>,

    /// 修订云弧段最大长度
    #[arg(long)]
    segment_length: Option<f64>,

    /// 并行处理文件
    #[arg(long)]
    parallel: bool,

    /// JSON 报告输出路径
    #[arg(long)]
    report: Option<PathBuf>,

    /// 配置文件（默认查找 DXFNORM_CONFIG 或 ./config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut AppConfig) {
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(mode) = self.mode {
            config.output.mode = mode;
        }
        if let Some(report) = &self.report {
            config.output.report = Some(report.clone());
        }
        if self.revision_cloud {
            config.normalize.keep_revision_cloud = true;
        }
        if let Some(layer) = &self.cloud_layer {
            config.normalize.revision_cloud_source_layer = layer.clone();
        }
        if let Some(length) = self.segment_length {
            config.normalize.cloud_segment_length = length;
        }
        if self.parallel {
            config.normalize.parallel = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    let mut config = match config {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("配置加载失败，使用默认配置: {err}");
            AppConfig::default()
        }
    };
    cli.apply(&mut config);
    init_tracing(&config);

    if let Err(err) = execute(cli, config) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    config.normalize.validate()?;

    let rules = match &cli.rules {
        Some(path) => dxfnorm_file::read_rule_sheet(path)
            .with_context(|| format!("cannot read rule sheet {}", path.display()))?,
        None => {
            info!("no rule sheet given, layers keep their names");
            RuleTable::new()
        }
    };

    let report = run::run(Job {
        inputs: cli.inputs,
        rules,
        options: config.normalize,
        output: config.output,
        stamp: cli.stamp,
    })?;

    println!(
        "normalized {} file(s), {} failed, wrote {} file(s)",
        report.batch.normalized_count(),
        report.batch.failed_count(),
        report.written.len()
    );
    for failure in &report.batch.failures {
        println!("  failed: {} ({})", failure.name, failure.error);
    }
    Ok(())
}

/// 初始化日志：`RUST_LOG` 优先，否则使用配置中的级别
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
