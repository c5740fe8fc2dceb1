use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use methods_distance::cli::{self, Command};
use methods_distance::config::AnalysisConfig;

/// Java method ordering analysis
///
/// 检查类内方法的调用依赖与声明顺序，默认输出人类可读格式
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 日志级别 (RUST_LOG 优先)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// 输出 JSON 格式 (默认输出人类可读文本)
    #[arg(long, global = true)]
    json: bool,

    /// 配置文件 (.yml / .yaml / Checkstyle .xml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 一屏可见的方法数阈值 (覆盖配置文件)
    #[arg(long, global = true)]
    screen_lines_count: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志 (只写 stderr，stdout 留给报告)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let base = match &args.config {
        Some(path) => AnalysisConfig::load(path).with_context(|| format!("invalid config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let config = base
        .with_screen_lines_override(args.screen_lines_count.as_deref())
        .context("invalid --screen-lines-count")?;

    cli::handle_command(args.command, args.json, &config)
}
