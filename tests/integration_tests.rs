// ============================================================================
// Integration Tests - Java source -> dependency graph -> metrics -> reorder
// ============================================================================
//
// These tests drive the public pipeline end to end:
// 1. Call-site resolution (overloads, varargs, method references, nested types)
// 2. Appearance order and distance metrics
// 3. Reordering totality and the first-violation report
// 4. Batch runs over the fixtures directory

use std::path::Path;

use methods_distance::call_site::ParsedClass;
use methods_distance::config::AnalysisConfig;
use methods_distance::engine::{analyze_file, analyze_path, analyze_source, ClassAnalysis};
use methods_distance::error::AnalysisError;
use methods_distance::ordering::Ordering;
use methods_distance::symbol_table::MethodId;

mod common {
    use std::path::PathBuf;

    /// Helper to get the fixtures directory path
    pub fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Helper to get one fixture of the ordering set
    pub fn ordering_fixture(name: &str) -> PathBuf {
        fixtures_dir().join("ordering").join(name)
    }
}

fn analyze_fixture(name: &str) -> ClassAnalysis {
    analyze_file(&common::ordering_fixture(name), &AnalysisConfig::default())
        .expect("fixture should be analysable")
        .expect("fixture should contain a class")
}

fn id_of(analysis: &ClassAnalysis, signature: &str) -> MethodId {
    analysis
        .class
        .methods()
        .iter()
        .find(|m| m.signature == signature)
        .map(|m| m.id)
        .unwrap_or_else(|| panic!("no method {signature}"))
}

fn callee_signatures(analysis: &ClassAnalysis, caller: &str) -> Vec<String> {
    let ordering = analysis.initial_ordering();
    ordering
        .dependencies_in_appearance_order(id_of(analysis, caller))
        .iter()
        .map(|id| analysis.class.method(*id).signature.clone())
        .collect()
}

// ============================================================================
// Appearance order and distances
// ============================================================================

#[test]
fn test_appearance_order_example() {
    let analysis = analyze_fixture("AppearanceOrder.java");
    assert_eq!(analysis.class.name(), "AppearanceOrder");
    assert_eq!(analysis.class.len(), 7);

    assert_eq!(callee_signatures(&analysis, "a()"), vec!["b3()", "b2()", "b1()"]);
    // 参数中的调用先于外层调用
    assert_eq!(callee_signatures(&analysis, "d()"), vec!["c2()", "c1(int)"]);

    let ordering = analysis.initial_ordering();
    assert_eq!(ordering.index_distance(id_of(&analysis, "a()"), id_of(&analysis, "b1()")), 3);
    assert_eq!(ordering.total_distance(), 12);
    assert_eq!(ordering.declaration_before_usage_count(), 0);
}

#[test]
fn test_distant_call_threshold() {
    // caller 与两个被调用方法的距离分别为 5 和 6
    let mut body = String::from("    void caller() { five(); six(); }\n");
    for i in 1..=4 {
        body.push_str(&format!("    void filler{i}() {{ }}\n"));
    }
    body.push_str("    void five() { }\n    void six() { }\n");
    let code = format!("public class Distances {{\n{body}}}\n");

    let config = AnalysisConfig {
        screen_lines_count: 5,
        ..AnalysisConfig::default()
    };
    let analysis = analyze_source(&code, Path::new("Distances.java"), &config).unwrap().unwrap();
    let ordering = analysis.initial_ordering();
    assert_eq!(ordering.index_distance(id_of(&analysis, "caller()"), id_of(&analysis, "six()")), 6);
    assert_eq!(ordering.distant_call_count(5), 1);
    assert_eq!(analysis.metrics_report().initial.distant_calls, 1);
}

// ============================================================================
// Call-site resolution
// ============================================================================

#[test]
fn test_overloads_resolved_by_arity() {
    let analysis = analyze_fixture("Overloads.java");
    assert_eq!(callee_signatures(&analysis, "format()"), vec!["format(String)"]);
    assert_eq!(callee_signatures(&analysis, "format(String)"), vec!["format(File,String)"]);
    // base.getName() 与 String.format(..) 不属于本类
    assert!(callee_signatures(&analysis, "format(File,String)").is_empty());
    assert_eq!(
        callee_signatures(&analysis, "report()"),
        vec!["sum(Integer...)", "format()"]
    );
    // sum() / sum(1) / sum(1, 2, 3) 都命中可变参数版本
    let sum = id_of(&analysis, "sum(Integer...)");
    assert_eq!(analysis.graph.calls().iter().filter(|c| c.callee == sum).count(), 3);
    assert_eq!(analysis.initial_ordering().overload_group_split_count(), 0);
}

#[test]
fn test_method_reference_static_instance_split() {
    let analysis = analyze_fixture("MethodReferences.java");
    let filter = "filter(List)";
    assert_eq!(callee_signatures(&analysis, filter), vec!["a1(Integer)", "a1()"]);
    let static_a1 = analysis.class.method(id_of(&analysis, "a1(Integer)"));
    assert!(static_a1.is_static);
    assert!(static_a1.overloaded);
}

#[test]
fn test_calls_inside_nested_types_are_excluded() {
    let analysis = analyze_fixture("AnonymousClasses.java");
    let names: Vec<&str> = analysis.class.methods().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["run", "helper"]);
    assert!(analysis.graph.calls().is_empty());
    let helper = id_of(&analysis, "helper()");
    assert!(!analysis.graph.has_dependants(helper));
}

#[test]
fn test_field_initializer_call_has_no_caller() {
    let code = r#"
public class Fields {
    private final int size = compute();

    int compute() { return 1; }
}
"#;
    let analysis = analyze_source(code, Path::new("Fields.java"), &AnalysisConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(analysis.graph.calls().len(), 1);
    assert_eq!(analysis.graph.calls()[0].caller, None);
    assert!(analysis.graph.edges().is_empty());
    assert_eq!(analysis.initial_ordering().total_distance(), 0);
}

// ============================================================================
// Reordering and reporting
// ============================================================================

#[test]
fn test_reorder_is_total_with_cycles() {
    let code = r#"
public class Cycles {
    void ping(int n) { if (n > 0) pong(n - 1); }
    void unrelated() { }
    void pong(int n) { if (n > 0) ping(n - 1); self(); }
    void self() { self(); }
    void last() { ping(3); }
}
"#;
    let analysis = analyze_source(code, Path::new("Cycles.java"), &AnalysisConfig::default())
        .unwrap()
        .unwrap();
    let optimized = analysis.optimized_ordering();
    let order: Vec<&str> = optimized.methods().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(order, vec!["ping", "pong", "self", "unrelated", "last"]);

    let mut positions: Vec<usize> = analysis.class.methods().iter().map(|m| optimized.position_of(m.id)).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    // 声明序号不受重排影响
    assert_eq!(analysis.class.methods()[1].index, 1);
}

#[test]
fn test_reordering_reduces_distance_and_reports_violation() {
    let analysis = analyze_fixture("Misplaced.java");
    let initial = analysis.initial_ordering();
    let optimized = analysis.optimized_ordering();
    assert!(optimized.total_distance() < initial.total_distance());

    let violation = analysis.violation().unwrap();
    assert_eq!(violation.signature, "validate()");
    assert_eq!(violation.line, 16);
    assert_eq!(violation.delta, 2);
    assert_eq!(violation.message(), "Method 'validate()' should be moved up by 2 positions");

    let report = analysis.metrics_report();
    assert!(report.optimized.penalty < report.initial.penalty);
}

#[test]
fn test_optimized_order_is_a_fixed_point() {
    let analysis = analyze_fixture("Misplaced.java");
    let optimized = analysis.optimized_ordering();
    let again = methods_distance::reorder::Reorderer::new().reorder(&optimized);
    assert_eq!(again.order(), optimized.order());
}

#[test]
fn test_reorder_rejects_foreign_sequence() {
    let analysis = analyze_fixture("Misplaced.java");
    let initial: Ordering<'_> = analysis.initial_ordering();
    let result = initial.reorder(vec![MethodId(0), MethodId(1)]);
    assert!(matches!(result, Err(AnalysisError::InvalidOrdering(_))));
}

// ============================================================================
// Batch runs and parser boundary
// ============================================================================

#[test]
fn test_batch_over_fixtures() {
    let outcomes = analyze_path(&common::fixtures_dir().join("ordering"), &AnalysisConfig::default()).unwrap();
    let names: Vec<String> = outcomes
        .iter()
        .map(|o| o.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "AnonymousClasses.java",
            "Api.java",
            "AppearanceOrder.java",
            "MethodReferences.java",
            "Misplaced.java",
            "Overloads.java",
        ]
    );
    // 接口文件没有顶层类
    assert!(outcomes[1].result.as_ref().unwrap().is_none());

    let violations: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().and_then(|a| a.as_ref()).and_then(|a| a.violation()))
        .map(|v| v.signature)
        .collect();
    assert_eq!(violations, vec!["validate()".to_string()]);
}

#[test]
fn test_malformed_parser_output_fails_fast() {
    let json = r#"{"name": "X", "methods": [], "call_sites": [{"kind": "lambda"}]}"#;
    assert!(matches!(ParsedClass::from_json(json), Err(AnalysisError::MalformedInput(_))));
}
