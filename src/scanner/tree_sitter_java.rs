use std::cell::RefCell;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;
use tree_sitter::{Node, Parser};

use crate::call_site::{CallQualifier, CallSite, Enclosure, MethodDeclaration, ParsedClass, RefQualifier, SourcePos};
use crate::error::{AnalysisError, AnalysisResult};
use crate::symbol_table::Accessibility;

// ============================================================================
// thread_local Parser 复用
// ============================================================================
//
// Parser::new() 和 set_language() 涉及 native 层初始化和内存分配。
// 使用 thread_local 确保每个线程只初始化一次 Parser，rayon 并行分析时互不共享状态。
//
// ============================================================================

thread_local! {
    /// 线程本地 Parser 实例 (避免重复创建)
    static JAVA_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// 获取或初始化线程本地 Parser
fn with_parser<F, R>(language: &tree_sitter::Language, file_path: &Path, f: F) -> AnalysisResult<R>
where
    F: FnOnce(&mut Parser) -> AnalysisResult<R>,
{
    JAVA_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();

        // 懒初始化 Parser
        if slot.is_none() {
            let mut parser = Parser::new();
            parser.set_language(language).map_err(|e| AnalysisError::Parse {
                path: file_path.to_path_buf(),
                message: format!("failed to set language: {e}"),
            })?;
            *slot = Some(parser);
        }

        let parser = slot.as_mut().ok_or_else(|| AnalysisError::Parse {
            path: file_path.to_path_buf(),
            message: "parser unavailable".to_string(),
        })?;
        f(parser)
    })
}

/// 泛型参数 (含嵌套) 擦除
static GENERIC_ARGS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// 嵌套类型体: 其中的调用属于其他类型
const TYPE_BODY_KINDS: &[&str] = &["class_body", "interface_body", "enum_body", "annotation_type_body"];

const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Java source -> ParsedClass, the upstream producer for the analysis engine.
pub struct JavaTreeSitterAnalyzer {
    language: tree_sitter::Language,
}

impl JavaTreeSitterAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::language(),
        }
    }

    /// Parses the first top-level class of `code`.
    ///
    /// A file without a top-level class yields `Ok(None)`.
    pub fn parse_class(&self, code: &str, file_path: &Path) -> AnalysisResult<Option<ParsedClass>> {
        with_parser(&self.language, file_path, |parser| {
            let tree = parser.parse(code, None).ok_or_else(|| AnalysisError::Parse {
                path: file_path.to_path_buf(),
                message: "failed to parse code".to_string(),
            })?;
            let root = tree.root_node();
            if root.has_error() {
                trace!(path = %file_path.display(), "source contains syntax errors");
            }

            let mut cursor = root.walk();
            let class_node = root
                .named_children(&mut cursor)
                .find(|n| n.kind() == "class_declaration");
            match class_node {
                Some(node) => self.extract_class(node, code.as_bytes()).map(Some),
                None => Ok(None),
            }
        })
    }

    fn extract_class(&self, class_node: Node, code: &[u8]) -> AnalysisResult<ParsedClass> {
        let name = class_node
            .child_by_field_name("name")
            .map(|n| node_text(n, code).to_string())
            .unwrap_or_default();

        let mut methods = Vec::new();
        let mut call_sites = Vec::new();

        let Some(body) = class_node.child_by_field_name("body") else {
            return Ok(ParsedClass {
                name,
                methods,
                call_sites,
            });
        };

        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in members {
            let enclosure = match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    let declaration = self.extract_method(member, code);
                    let anchor = declaration.position;
                    methods.push(declaration);
                    Enclosure::Method(anchor)
                }
                kind if TYPE_DECLARATION_KINDS.contains(&kind) => Enclosure::NestedType,
                _ => Enclosure::ClassBody,
            };
            collect_call_sites(member, enclosure, code, &mut call_sites)?;
        }

        Ok(ParsedClass {
            name,
            methods,
            call_sites,
        })
    }

    /// 提取方法/构造器声明
    fn extract_method(&self, node: Node, code: &[u8]) -> MethodDeclaration {
        let is_ctor = node.kind() == "constructor_declaration";
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, code).to_string())
            .unwrap_or_default();

        let mut modifiers: Vec<String> = Vec::new();
        let mut is_override = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "modifiers" {
                continue;
            }
            let mut mod_cursor = child.walk();
            for modifier in child.children(&mut mod_cursor) {
                match modifier.kind() {
                    "marker_annotation" | "annotation" => {
                        let annotation = modifier
                            .child_by_field_name("name")
                            .map(|n| node_text(n, code))
                            .unwrap_or("");
                        if annotation == "Override" || annotation.ends_with(".Override") {
                            is_override = true;
                        }
                    }
                    keyword => modifiers.push(keyword.to_string()),
                }
            }
        }

        let (parameter_types, vararg) = node
            .child_by_field_name("parameters")
            .map(|params| extract_parameters(params, code))
            .unwrap_or_default();

        let start = node.start_position();
        MethodDeclaration {
            name,
            parameter_types,
            vararg,
            accessibility: Accessibility::from_modifiers(modifiers.iter().map(String::as_str)),
            is_static: modifiers.iter().any(|m| m == "static"),
            is_override,
            is_ctor,
            return_type: if is_ctor {
                None
            } else {
                node.child_by_field_name("type").map(|t| display_type(node_text(t, code)))
            },
            position: SourcePos::new(start.row + 1, start.column),
            end_line: node.end_position().row + 1,
        }
    }
}

impl Default for JavaTreeSitterAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// 参数显示类型列表 + 是否可变参数
fn extract_parameters(params: Node, code: &[u8]) -> (Vec<String>, bool) {
    let mut types = Vec::new();
    let mut vararg = false;
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let mut ty = param
                    .child_by_field_name("type")
                    .map(|t| display_type(node_text(t, code)))
                    .unwrap_or_default();
                // `String args[]`
                if let Some(dims) = param.child_by_field_name("dimensions") {
                    ty.push_str(&"[]".repeat(node_text(dims, code).matches('[').count()));
                }
                types.push(ty);
            }
            "spread_parameter" => {
                let mut spread_cursor = param.walk();
                let ty = param
                    .named_children(&mut spread_cursor)
                    .find(|c| c.kind() != "modifiers")
                    .map(|t| display_type(node_text(t, code)))
                    .unwrap_or_default();
                types.push(format!("{ty}..."));
                vararg = true;
            }
            _ => {}
        }
    }
    (types, vararg)
}

/// `Map<String, List<Integer>>[]` -> `Map[]`
fn display_type(text: &str) -> String {
    let mut erased: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    while GENERIC_ARGS_REGEX.is_match(&erased) {
        erased = GENERIC_ARGS_REGEX.replace_all(&erased, "").into_owned();
    }
    erased
}

/// 后序遍历: 接收者与参数中的调用先于包含它们的调用 (求值顺序)
fn collect_call_sites(node: Node, enclosure: Enclosure, code: &[u8], sites: &mut Vec<CallSite>) -> AnalysisResult<()> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        let child_enclosure = if TYPE_BODY_KINDS.contains(&child.kind()) {
            Enclosure::NestedType
        } else {
            enclosure
        };
        collect_call_sites(child, child_enclosure, code, sites)?;
    }

    if matches!(node.kind(), "method_invocation" | "method_reference") {
        if let Some(site) = call_site_from_node(node, enclosure, code)? {
            sites.push(site);
        }
    }
    Ok(())
}

/// Builds a call site from a `method_invocation` or `method_reference` node.
///
/// Constructor references (`Type::new`) are not call sites and yield `None`.
pub fn call_site_from_node(node: Node, enclosure: Enclosure, code: &[u8]) -> AnalysisResult<Option<CallSite>> {
    let start = node.start_position();
    let position = SourcePos::new(start.row + 1, start.column);
    let malformed = || AnalysisError::MalformedSite {
        kind: node.kind().to_string(),
        line: position.line,
    };

    match node.kind() {
        "method_invocation" => {
            let name = node.child_by_field_name("name").ok_or_else(malformed)?;
            let arg_count = node
                .child_by_field_name("arguments")
                .map(|args| {
                    let mut cursor = args.walk();
                    let count = args
                        .named_children(&mut cursor)
                        .filter(|c| !matches!(c.kind(), "line_comment" | "block_comment"))
                        .count();
                    count
                })
                .unwrap_or(0);
            Ok(Some(CallSite::DirectCall {
                name: node_text(name, code).to_string(),
                qualifier: call_qualifier(node, code),
                arg_count,
                position,
                enclosure,
            }))
        }
        "method_reference" => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            let Some(last) = children.last() else {
                return Err(malformed());
            };
            if last.kind() == "new" {
                return Ok(None);
            }
            if last.kind() != "identifier" {
                return Err(malformed());
            }
            let qualifier = children
                .iter()
                .find(|c| c.is_named() && !matches!(c.kind(), "line_comment" | "block_comment"))
                .map(|q| reference_qualifier(*q, code))
                .unwrap_or(RefQualifier::Expression);
            Ok(Some(CallSite::MethodReference {
                name: node_text(*last, code).to_string(),
                qualifier,
                position,
                enclosure,
            }))
        }
        _ => Err(malformed()),
    }
}

fn call_qualifier(invocation: Node, code: &[u8]) -> CallQualifier {
    let Some(object) = invocation.child_by_field_name("object") else {
        return CallQualifier::Implicit;
    };

    // `Outer.super.name()` 中的 super 是 invocation 的直接子节点
    let mut cursor = invocation.walk();
    let has_super_token = invocation
        .children(&mut cursor)
        .any(|c| c.kind() == "super" && c.id() != object.id());
    if has_super_token {
        return CallQualifier::Super;
    }

    match object.kind() {
        "this" => CallQualifier::This,
        "super" => CallQualifier::Super,
        "field_access" => match object.child_by_field_name("field") {
            Some(field) if field.kind() == "this" => {
                let outer = object
                    .child_by_field_name("object")
                    .map(|o| simple_name(node_text(o, code)))
                    .unwrap_or_default();
                CallQualifier::OuterThis(outer)
            }
            _ => CallQualifier::Other,
        },
        _ => CallQualifier::Other,
    }
}

fn reference_qualifier(qualifier: Node, code: &[u8]) -> RefQualifier {
    match qualifier.kind() {
        "this" => RefQualifier::This,
        "super" => RefQualifier::Super,
        "identifier" | "type_identifier" | "scoped_identifier" | "scoped_type_identifier" | "generic_type" => {
            RefQualifier::Type(simple_name(&display_type(node_text(qualifier, code))))
        }
        "field_access" => match qualifier.child_by_field_name("field") {
            Some(field) if field.kind() == "identifier" => {
                RefQualifier::Type(simple_name(node_text(qualifier, code)))
            }
            _ => RefQualifier::Expression,
        },
        _ => RefQualifier::Expression,
    }
}

/// `java.util.Objects` -> `Objects`
fn simple_name(text: &str) -> String {
    text.rsplit('.').next().unwrap_or(text).trim().to_string()
}

fn node_text<'a>(node: Node, code: &'a [u8]) -> &'a str {
    node.utf8_text(code).unwrap_or("")
}
