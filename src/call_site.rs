// ============================================================================
// 调用点模型 - 上游解析器交给引擎的输入
// ============================================================================
//
// 解析器 (scanner::tree_sitter_java 或外部生产者的 JSON) 输出 ParsedClass:
// 方法声明列表 + 调用点列表。调用点是封闭的 tagged union，每个变体只携带
// 自己的解析分支需要的字段。

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::symbol_table::Accessibility;

/// 1-based line, 0-based column of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Lexical owner of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "anchor", rename_all = "snake_case")]
pub enum Enclosure {
    /// Inside the body of the analysed class's member declared at `anchor`.
    Method(SourcePos),
    /// Inside the analysed class but outside any member body (field initialiser,
    /// initializer block).
    ClassBody,
    /// Inside a nested, local or anonymous type declared within the class.
    NestedType,
}

/// Receiver of a direct call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CallQualifier {
    /// `name(args)`
    Implicit,
    /// `this.name(args)`
    This,
    /// `super.name(args)` or `Outer.super.name(args)`
    Super,
    /// `Outer.this.name(args)`
    OuterThis(String),
    /// Any other receiver expression.
    Other,
}

/// Qualifier on the left of `::`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum RefQualifier {
    This,
    Super,
    /// A type name, reduced to its simple name.
    Type(String),
    Expression,
}

/// 调用点 (closed union: direct call or method reference)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallSite {
    DirectCall {
        name: String,
        qualifier: CallQualifier,
        arg_count: usize,
        position: SourcePos,
        enclosure: Enclosure,
    },
    MethodReference {
        name: String,
        qualifier: RefQualifier,
        position: SourcePos,
        enclosure: Enclosure,
    },
}

impl CallSite {
    pub fn direct(name: &str, arg_count: usize, position: SourcePos, enclosure: Enclosure) -> Self {
        CallSite::DirectCall {
            name: name.to_string(),
            qualifier: CallQualifier::Implicit,
            arg_count,
            position,
            enclosure,
        }
    }

    pub fn reference(name: &str, qualifier: RefQualifier, position: SourcePos, enclosure: Enclosure) -> Self {
        CallSite::MethodReference {
            name: name.to_string(),
            qualifier,
            position,
            enclosure,
        }
    }

    /// Replaces the qualifier of a direct call; method references are returned unchanged.
    pub fn with_qualifier(mut self, new_qualifier: CallQualifier) -> Self {
        if let CallSite::DirectCall { qualifier, .. } = &mut self {
            *qualifier = new_qualifier;
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            CallSite::DirectCall { name, .. } | CallSite::MethodReference { name, .. } => name,
        }
    }

    pub fn position(&self) -> SourcePos {
        match self {
            CallSite::DirectCall { position, .. } | CallSite::MethodReference { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }

    pub fn enclosure(&self) -> &Enclosure {
        match self {
            CallSite::DirectCall { enclosure, .. } | CallSite::MethodReference { enclosure, .. } => enclosure,
        }
    }
}

/// 方法声明 (解析器输出，构建 MethodDefinition 的原料)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    /// Display types: arrays `T[]`, trailing vararg `T...`, generics erased.
    #[serde(default)]
    pub parameter_types: Vec<String>,
    #[serde(default)]
    pub vararg: bool,
    #[serde(default = "default_accessibility")]
    pub accessibility: Accessibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_override: bool,
    #[serde(default)]
    pub is_ctor: bool,
    /// `None` for constructors.
    #[serde(default)]
    pub return_type: Option<String>,
    pub position: SourcePos,
    pub end_line: usize,
}

fn default_accessibility() -> Accessibility {
    Accessibility::Default
}

impl MethodDeclaration {
    /// A package-private, void, parameterless instance method on one line.
    pub fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            parameter_types: Vec::new(),
            vararg: false,
            accessibility: Accessibility::Default,
            is_static: false,
            is_override: false,
            is_ctor: false,
            return_type: Some("void".to_string()),
            position: SourcePos::new(line, 0),
            end_line: line,
        }
    }

    pub fn with_parameters(mut self, types: &[&str]) -> Self {
        self.parameter_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_vararg(mut self, vararg: bool) -> Self {
        self.vararg = vararg;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_override(mut self, is_override: bool) -> Self {
        self.is_override = is_override;
        self
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_return_type(mut self, return_type: &str) -> Self {
        self.return_type = Some(return_type.to_string());
        self
    }

    pub fn as_ctor(mut self) -> Self {
        self.is_ctor = true;
        self.return_type = None;
        self
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = end_line;
        self
    }
}

/// 一个被分析类的完整解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedClass {
    pub name: String,
    pub methods: Vec<MethodDeclaration>,
    /// Call sites in evaluation order.
    pub call_sites: Vec<CallSite>,
}

impl ParsedClass {
    /// Decodes a parser result produced outside this crate.
    ///
    /// Unknown site kinds and missing fields are integration defects and fail fast.
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        serde_json::from_str(json).map_err(|e| AnalysisError::MalformedInput(e.to_string()))
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalysisError::MalformedInput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_decodes_both_site_kinds() {
        let json = r#"{
            "name": "Test",
            "methods": [
                {"name": "a", "position": {"line": 2, "column": 4}, "end_line": 4},
                {"name": "b", "parameter_types": ["int"], "accessibility": "public",
                 "is_static": true, "return_type": "int",
                 "position": {"line": 5, "column": 4}, "end_line": 5}
            ],
            "call_sites": [
                {"kind": "direct_call", "name": "b", "qualifier": {"kind": "implicit"},
                 "arg_count": 1, "position": {"line": 3, "column": 8},
                 "enclosure": {"kind": "method", "anchor": {"line": 2, "column": 4}}},
                {"kind": "method_reference", "name": "b",
                 "qualifier": {"kind": "type", "name": "Test"},
                 "position": {"line": 3, "column": 20},
                 "enclosure": {"kind": "class_body"}}
            ]
        }"#;
        let parsed = ParsedClass::from_json(json).unwrap();
        assert_eq!(parsed.methods.len(), 2);
        assert_eq!(parsed.methods[0].accessibility, Accessibility::Default);
        assert_eq!(parsed.methods[1].accessibility, Accessibility::Public);
        assert_eq!(
            parsed.call_sites[0],
            CallSite::direct("b", 1, SourcePos::new(3, 8), Enclosure::Method(SourcePos::new(2, 4)))
        );
        assert_eq!(
            parsed.call_sites[1],
            CallSite::reference(
                "b",
                RefQualifier::Type("Test".to_string()),
                SourcePos::new(3, 20),
                Enclosure::ClassBody
            )
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_site_kind() {
        let json = r#"{
            "name": "Test",
            "methods": [],
            "call_sites": [
                {"kind": "constructor_call", "name": "Test",
                 "position": {"line": 1, "column": 0}, "enclosure": {"kind": "class_body"}}
            ]
        }"#;
        let err = ParsedClass::from_json(json).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedInput(_)));
    }

    #[test]
    fn test_json_round_trip_keeps_qualifiers() {
        let parsed = ParsedClass {
            name: "Outer".to_string(),
            methods: vec![MethodDeclaration::new("a", 1)],
            call_sites: vec![CallSite::direct("a", 0, SourcePos::new(1, 10), Enclosure::NestedType)
                .with_qualifier(CallQualifier::OuterThis("Outer".to_string()))],
        };
        let json = parsed.to_json().unwrap();
        assert_eq!(ParsedClass::from_json(&json).unwrap(), parsed);
    }

    #[test]
    fn test_with_qualifier_ignores_references() {
        let site = CallSite::reference("a", RefQualifier::This, SourcePos::new(1, 0), Enclosure::ClassBody)
            .with_qualifier(CallQualifier::Super);
        assert!(matches!(site, CallSite::MethodReference { qualifier: RefQualifier::This, .. }));
        assert_eq!(site.name(), "a");
        assert_eq!(site.line(), 1);
    }
}
