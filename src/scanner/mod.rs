//! 源码解析适配层
//!
//! 把 Java 源码转换为分析引擎的输入 (ParsedClass)。

pub mod tree_sitter_java;

pub use tree_sitter_java::JavaTreeSitterAnalyzer;
