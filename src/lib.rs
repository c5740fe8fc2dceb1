// ============================================================================
// Methods Distance - Library Interface
// ============================================================================
//
// 单个 Java 类内部的方法调用依赖分析: 调用点解析、依赖图、顺序指标与重排。
// The binary (main.rs) drives these modules through `cli`.

pub mod call_graph;
pub mod call_site;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ordering;
pub mod reorder;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod symbol_table;

pub use config::AnalysisConfig;
pub use engine::{analyze_parsed, analyze_path, analyze_source, ClassAnalysis};
pub use error::{AnalysisError, ConfigError};
