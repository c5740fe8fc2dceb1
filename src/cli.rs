//! CLI 模式处理器
//!
//! 提供命令行接口，默认输出人类可读格式
//! 使用 --json 参数可输出 JSON 格式

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use crate::config::AnalysisConfig;
use crate::engine::{self, ClassAnalysis};
use crate::report::{self, Violation};

/// CLI Commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 🔍 检查方法顺序 - 文件或目录
    Check {
        /// Java 文件或源码目录
        #[arg(default_value = ".")]
        path: PathBuf,

        /// 输出 Checkstyle XML 报告
        #[arg(long)]
        xml: bool,
    },

    /// 📐 单文件指标 (初始顺序 vs 优化顺序)
    Metrics {
        /// Java 文件路径
        file: PathBuf,
    },

    /// 🔀 输出优化后的方法顺序
    Reorder {
        /// Java 文件路径
        file: PathBuf,
    },
}

/// 命令执行结果: 输出内容 + 是否以非零状态退出
struct Outcome {
    value: Value,
    failed: bool,
}

impl Outcome {
    fn ok(value: Value) -> Self {
        Self { value, failed: false }
    }
}

/// 处理 CLI 命令
///
/// json_output: 是否输出 JSON 格式（默认 false，输出人类可读格式）
pub fn handle_command(cmd: Command, json_output: bool, config: &AnalysisConfig) -> Result<()> {
    let raw_output = matches!(cmd, Command::Check { xml: true, .. });
    let result = match cmd {
        Command::Check { path, xml } => run_check(&path, xml, json_output, config),
        Command::Metrics { file } => run_metrics(&file, json_output, config),
        Command::Reorder { file } => run_reorder(&file, json_output, config),
    };

    // 输出结果
    match result {
        Ok(outcome) => {
            if json_output && !raw_output {
                // JSON 格式：包装 success 字段
                let output = json!({
                    "success": !outcome.failed,
                    "data": outcome.value
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                // 人类可读格式：直接输出内容
                print_value(&outcome.value);
            }
            if outcome.failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            if json_output {
                let output = json!({
                    "success": false,
                    "error": format!("{e:#}")
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                eprintln!("❌ {e:#}");
            }
            std::process::exit(2);
        }
    }

    Ok(())
}

/// 打印 Value，智能处理字符串和其他类型
fn print_value(value: &Value) {
    match value {
        Value::String(s) => println!("{s}"),
        _ => println!("{}", serde_json::to_string_pretty(value).unwrap_or_default()),
    }
}

fn analyze_single(file: &Path, config: &AnalysisConfig) -> Result<ClassAnalysis> {
    engine::analyze_file(file, config)
        .with_context(|| format!("failed to analyse {}", file.display()))?
        .ok_or_else(|| anyhow!("no top-level class found in {}", file.display()))
}

fn run_metrics(file: &Path, json_output: bool, config: &AnalysisConfig) -> Result<Outcome> {
    let report = analyze_single(file, config)?.metrics_report();
    if json_output {
        Ok(Outcome::ok(serde_json::to_value(&report)?))
    } else {
        Ok(Outcome::ok(json!(report.to_text())))
    }
}

fn run_reorder(file: &Path, json_output: bool, config: &AnalysisConfig) -> Result<Outcome> {
    let report = analyze_single(file, config)?.metrics_report();
    if json_output {
        Ok(Outcome::ok(serde_json::to_value(&report.placements)?))
    } else {
        Ok(Outcome::ok(json!(report.order_text())))
    }
}

/// 批量检查: 违规或分析失败时以状态码 1 退出
fn run_check(path: &Path, xml: bool, json_output: bool, config: &AnalysisConfig) -> Result<Outcome> {
    let outcomes = engine::analyze_path(path, config)?;

    let mut files = Vec::new();
    let mut violations: Vec<Violation> = Vec::new();
    let mut failures: Vec<(PathBuf, String)> = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(Some(analysis)) => {
                if let Some(violation) = analysis.violation() {
                    violations.push(violation);
                }
            }
            Ok(None) => {}
            Err(e) => failures.push((outcome.path.clone(), e.to_string())),
        }
        files.push(outcome.path);
    }
    let failed = !violations.is_empty() || !failures.is_empty();

    let value = if xml {
        json!(report::to_checkstyle_xml(&files, &violations)?)
    } else if json_output {
        json!({
            "files": files.len(),
            "violations": violations
                .iter()
                .map(|v| json!({
                    "file": v.file,
                    "line": v.line,
                    "signature": v.signature,
                    "delta": v.delta,
                    "message": v.message(),
                }))
                .collect::<Vec<_>>(),
            "failures": failures
                .iter()
                .map(|(file, error)| json!({ "file": file, "error": error }))
                .collect::<Vec<_>>(),
        })
    } else {
        let mut out = String::new();
        for v in &violations {
            out.push_str(&format!("{}:{}: {}\n", v.file.display(), v.line, v.message()));
        }
        for (file, error) in &failures {
            out.push_str(&format!("{}: ❌ {}\n", file.display(), error));
        }
        out.push_str(&format!(
            "Checked {} files: {} violations, {} failures",
            files.len(),
            violations.len(),
            failures.len()
        ));
        json!(out)
    };

    Ok(Outcome { value, failed })
}
