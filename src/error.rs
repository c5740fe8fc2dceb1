// ============================================================================
// 错误类型
// ============================================================================
//
// 无法解析的调用点不是错误 (直接丢弃)，只有集成契约被破坏或配置错误才会上抛。

use std::path::PathBuf;
use thiserror::Error;

/// 分析结果类型
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failures that stop an analysis. Dropped call sites never end up here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The parser handed over a site whose syntactic shape is not a call or a reference.
    #[error("malformed call site at line {line}: unexpected node kind `{kind}`")]
    MalformedSite { kind: String, line: usize },

    /// Externally produced parser output could not be decoded.
    #[error("malformed parser input: {0}")]
    MalformedInput(String),

    /// A method sequence that is not a permutation of the class's methods, or a move out of range.
    #[error("invalid ordering: {0}")]
    InvalidOrdering(String),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误 (在分析开始前报告给调用方)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option `{key}`")]
    Missing { key: String },

    #[error("option `{key}` must be a non-negative integer, got `{value}`")]
    NotNumeric { key: String, value: String },

    #[error("cannot read config {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("unsupported config format `{0}` (expected .yml, .yaml or .xml)")]
    UnknownFormat(String),
}
