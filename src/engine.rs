//! 分析引擎 - 串联整个流水线
//!
//! ParsedClass -> ClassDefinition -> 调用点解析 -> DependencyGraph -> Ordering (初始 / 优化)
//!
//! 每个类的分析互相独立，不共享可变状态，批量模式下用 rayon 并行。

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::call_graph::DependencyGraph;
use crate::call_site::ParsedClass;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::ordering::Ordering;
use crate::reorder::Reorderer;
use crate::report::{MetricsReport, Violation};
use crate::resolver::CallSiteResolver;
use crate::scanner::JavaTreeSitterAnalyzer;
use crate::symbol_table::ClassDefinition;

/// Result of analysing one class; orderings are derived on demand.
#[derive(Debug, Clone)]
pub struct ClassAnalysis {
    pub file: PathBuf,
    pub class: ClassDefinition,
    pub graph: DependencyGraph,
    pub config: AnalysisConfig,
}

impl ClassAnalysis {
    pub fn initial_ordering(&self) -> Ordering<'_> {
        Ordering::initial(&self.class, &self.graph)
    }

    pub fn optimized_ordering(&self) -> Ordering<'_> {
        Reorderer::new().reorder(&self.initial_ordering())
    }

    /// First out-of-place method of the optimized order, if any.
    pub fn violation(&self) -> Option<Violation> {
        Violation::detect(&self.file, &self.optimized_ordering())
    }

    pub fn metrics_report(&self) -> MetricsReport {
        let initial = self.initial_ordering();
        let optimized = Reorderer::new().reorder(&initial);
        MetricsReport::new(
            &self.file,
            &initial,
            &optimized,
            &self.config.penalties,
            self.config.screen_lines_count,
        )
    }
}

/// 从解析结果构建分析
pub fn analyze_parsed(parsed: &ParsedClass, file: &Path, config: &AnalysisConfig) -> ClassAnalysis {
    let class = ClassDefinition::new(&parsed.name, &parsed.methods);
    let calls = CallSiteResolver::new(&class).resolve_all(&parsed.call_sites);
    debug!(
        file = %file.display(),
        class = %parsed.name,
        methods = class.len(),
        sites = parsed.call_sites.len(),
        resolved = calls.len(),
        "analysed class"
    );
    let graph = DependencyGraph::new(calls);
    ClassAnalysis {
        file: file.to_path_buf(),
        class,
        graph,
        config: config.clone(),
    }
}

/// 分析一段 Java 源码 (没有顶层类时返回 None)
pub fn analyze_source(code: &str, file: &Path, config: &AnalysisConfig) -> AnalysisResult<Option<ClassAnalysis>> {
    let parsed = JavaTreeSitterAnalyzer::new().parse_class(code, file)?;
    Ok(parsed.map(|p| analyze_parsed(&p, file, config)))
}

pub fn analyze_file(file: &Path, config: &AnalysisConfig) -> AnalysisResult<Option<ClassAnalysis>> {
    let code = std::fs::read_to_string(file).map_err(|source| AnalysisError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    analyze_source(&code, file, config)
}

/// One file of a batch run.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: AnalysisResult<Option<ClassAnalysis>>,
}

/// 分析单个文件或目录下的所有 .java 文件 (并行)，结果按路径排序
///
/// A file that fails is reported in its outcome and does not abort the batch.
pub fn analyze_path(path: &Path, config: &AnalysisConfig) -> AnalysisResult<Vec<FileOutcome>> {
    if !path.exists() {
        return Err(AnalysisError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "path not found"),
        });
    }

    let mut files: Vec<PathBuf> = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("java"))
            .map(|e| e.into_path())
            .collect()
    };
    files.sort();

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|file| {
            let result = analyze_file(file, config);
            if let Err(e) = &result {
                warn!(file = %file.display(), error = %e, "analysis failed");
            }
            FileOutcome {
                path: file.clone(),
                result,
            }
        })
        .collect();

    Ok(outcomes)
}
