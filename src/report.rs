// ============================================================================
// 报告 - 违规 (第一个需要移动的方法) 与指标报告
// ============================================================================

use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::Serialize;

use crate::ordering::{Ordering, OrderingMetrics, PenaltyWeights};

/// Checkstyle 模块名 (XML 报告的 source 属性)
pub const CHECK_SOURCE: &str = "methods-distance.MethodCallDependencyCheck";

/// The first method of the optimized order that is not at its declared place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub file: PathBuf,
    pub line: usize,
    pub signature: String,
    /// Declaration index minus new position; positive means "move up".
    pub delta: isize,
}

impl Violation {
    /// Compares the optimized ordering against declaration order.
    pub fn detect(file: &Path, optimized: &Ordering<'_>) -> Option<Self> {
        optimized
            .methods()
            .into_iter()
            .enumerate()
            .find(|(position, method)| method.index != *position)
            .map(|(position, method)| Violation {
                file: file.to_path_buf(),
                line: method.line,
                signature: method.signature.clone(),
                delta: method.index as isize - position as isize,
            })
    }

    pub fn message(&self) -> String {
        let direction = if self.delta > 0 { "up" } else { "down" };
        let distance = self.delta.unsigned_abs();
        format!(
            "Method '{}' should be moved {} by {} position{}",
            self.signature,
            direction,
            distance,
            if distance == 1 { "" } else { "s" }
        )
    }
}

/// 方法在优化顺序中的位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodPlacement {
    pub signature: String,
    pub line: usize,
    pub initial_index: usize,
    pub new_position: usize,
    pub delta: isize,
}

/// 一个类在初始顺序与优化顺序下的全部指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub file: PathBuf,
    pub class_name: String,
    pub screen_lines_count: usize,
    pub method_count: usize,
    pub resolved_calls: usize,
    pub initial: OrderingMetrics,
    pub optimized: OrderingMetrics,
    pub placements: Vec<MethodPlacement>,
}

impl MetricsReport {
    pub fn new(
        file: &Path,
        initial: &Ordering<'_>,
        optimized: &Ordering<'_>,
        weights: &PenaltyWeights,
        screen_lines_count: usize,
    ) -> Self {
        let placements = optimized
            .methods()
            .into_iter()
            .enumerate()
            .map(|(position, method)| MethodPlacement {
                signature: method.signature.clone(),
                line: method.line,
                initial_index: method.index,
                new_position: position,
                delta: method.index as isize - position as isize,
            })
            .collect();

        Self {
            file: file.to_path_buf(),
            class_name: initial.class().name().to_string(),
            screen_lines_count,
            method_count: initial.len(),
            resolved_calls: initial.graph().calls().len(),
            initial: initial.metrics(weights, screen_lines_count),
            optimized: optimized.metrics(weights, screen_lines_count),
            placements,
        }
    }

    /// 人类可读格式
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "📐 {} ({})\n\
            ----------------------------------------\n\
            Methods: {} | Resolved calls: {} | Screen lines: {}\n\
            ----------------------------------------\n",
            self.class_name,
            self.file.display(),
            self.method_count,
            self.resolved_calls,
            self.screen_lines_count
        );
        out.push_str(&format!("{:<32}{:>10}{:>12}\n", "metric", "initial", "optimized"));
        let rows: [(&str, usize, usize); 8] = [
            ("total distance", self.initial.total_distance, self.optimized.total_distance),
            ("distant calls", self.initial.distant_calls, self.optimized.distant_calls),
            (
                "declaration before usage",
                self.initial.declaration_before_usage,
                self.optimized.declaration_before_usage,
            ),
            ("ctor group splits", self.initial.ctor_group_splits, self.optimized.ctor_group_splits),
            (
                "override group splits",
                self.initial.override_group_splits,
                self.optimized.override_group_splits,
            ),
            (
                "overload group splits",
                self.initial.overload_group_splits,
                self.optimized.overload_group_splits,
            ),
            ("accessor splits", self.initial.accessor_splits, self.optimized.accessor_splits),
            (
                "relative order inconsistency",
                self.initial.relative_order_inconsistencies,
                self.optimized.relative_order_inconsistencies,
            ),
        ];
        for (name, initial, optimized) in rows {
            out.push_str(&format!("{name:<32}{initial:>10}{optimized:>12}\n"));
        }
        out.push_str(&format!(
            "{:<32}{:>10.1}{:>12.1}\n",
            "penalty", self.initial.penalty, self.optimized.penalty
        ));
        out
    }

    /// 优化后的顺序 (reorder 子命令)
    pub fn order_text(&self) -> String {
        let mut out = format!("🔀 {} - optimized order\n", self.class_name);
        for placement in &self.placements {
            let marker = match placement.delta {
                0 => String::new(),
                d if d > 0 => format!("  ↑{d}"),
                d => format!("  ↓{}", d.unsigned_abs()),
            };
            out.push_str(&format!(
                "{:>3}. {} (line {}, was #{}){}\n",
                placement.new_position, placement.signature, placement.line, placement.initial_index, marker
            ));
        }
        out
    }
}

/// Checkstyle 兼容的 XML 报告
pub fn to_checkstyle_xml(files: &[PathBuf], violations: &[Violation]) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("checkstyle");
    root.push_attribute(("version", env!("CARGO_PKG_VERSION")));
    writer.write_event(Event::Start(root))?;

    for file in files {
        let name = file.display().to_string();
        let mut file_elem = BytesStart::new("file");
        file_elem.push_attribute(("name", name.as_str()));
        writer.write_event(Event::Start(file_elem))?;

        for violation in violations.iter().filter(|v| &v.file == file) {
            let line = violation.line.to_string();
            let message = violation.message();
            let mut error = BytesStart::new("error");
            error.push_attribute(("line", line.as_str()));
            error.push_attribute(("severity", "warning"));
            error.push_attribute(("message", message.as_str()));
            error.push_attribute(("source", CHECK_SOURCE));
            writer.write_event(Event::Empty(error))?;
        }

        writer.write_event(Event::End(BytesEnd::new("file")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("checkstyle")))?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
