// ============================================================================
// 符号表模块 - 被分析类的方法目录 (MethodCatalog)
// ============================================================================

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::call_site::{Enclosure, MethodDeclaration, SourcePos};

static GETTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^get[A-Z]\w*$").unwrap());

static BOOLEAN_GETTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^is[A-Z]\w*$").unwrap());

static SETTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^set[A-Z]\w*$").unwrap());

static ACCESSOR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:set|get|is)([A-Z]\w*)$").unwrap());

/// Stable identity of a declared method: its slot in the class arena.
///
/// Overloads share a name but never an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub usize);

impl MethodId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 访问级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    Public,
    Protected,
    #[serde(rename = "package", alias = "default")]
    Default,
    Private,
}

impl Accessibility {
    /// 从修饰符列表推断访问级别
    pub fn from_modifiers<'a>(modifiers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut result = Accessibility::Default;
        for modifier in modifiers {
            match modifier {
                "public" => return Accessibility::Public,
                "protected" => result = Accessibility::Protected,
                "private" if result == Accessibility::Default => result = Accessibility::Private,
                _ => {}
            }
        }
        result
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Accessibility::Public => "public",
            Accessibility::Protected => "protected",
            Accessibility::Default => "package",
            Accessibility::Private => "private",
        };
        f.write_str(text)
    }
}

/// 方法定义 (一个被分析类自身声明的方法或构造器)
#[derive(Debug, Clone, Serialize)]
pub struct MethodDefinition {
    pub id: MethodId,
    pub name: String,
    /// Display signature, e.g. `format(File,String)`.
    pub signature: String,
    /// Fixed parameter count; the trailing vararg parameter is not counted.
    pub arg_count: usize,
    pub vararg: bool,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_override: bool,
    pub is_ctor: bool,
    /// `true` when at least one sibling shares the name.
    pub overloaded: bool,
    pub return_type: Option<String>,
    /// 0-based position among the class's own methods in source order.
    pub index: usize,
    pub line: usize,
    pub column: usize,
    /// Source lines the declaration spans, start and end lines included.
    pub length: usize,
    pub getter: bool,
    pub setter: bool,
    /// Property name for accessors, e.g. `height` for `getHeight`.
    pub property: Option<String>,
}

impl MethodDefinition {
    fn from_declaration(id: MethodId, decl: &MethodDeclaration) -> Self {
        let vararg = decl.vararg;
        let param_count = decl.parameter_types.len();
        let arg_count = if vararg { param_count.saturating_sub(1) } else { param_count };
        let is_void = !decl.is_ctor && decl.return_type.as_deref() == Some("void");
        let returns_boolean = matches!(decl.return_type.as_deref(), Some("boolean" | "Boolean"));
        let public = decl.accessibility == Accessibility::Public;

        let getter = public
            && !decl.is_ctor
            && arg_count == 0
            && !vararg
            && !is_void
            && (GETTER_REGEX.is_match(&decl.name)
                || BOOLEAN_GETTER_REGEX.is_match(&decl.name) && returns_boolean);
        let setter = public
            && !decl.is_ctor
            && arg_count == 1
            && !vararg
            && is_void
            && SETTER_REGEX.is_match(&decl.name);
        let property = if getter || setter { accessor_property_name(&decl.name) } else { None };

        Self {
            id,
            name: decl.name.clone(),
            signature: format!("{}({})", decl.name, decl.parameter_types.join(",")),
            arg_count,
            vararg,
            accessibility: decl.accessibility,
            is_static: decl.is_static,
            is_override: decl.is_override,
            is_ctor: decl.is_ctor,
            overloaded: false,
            return_type: decl.return_type.clone(),
            index: id.index(),
            line: decl.position.line,
            column: decl.position.column,
            length: decl.end_line.saturating_sub(decl.position.line) + 1,
            getter,
            setter,
            property,
        }
    }

    pub fn is_instance(&self) -> bool {
        !self.is_static
    }

    pub fn is_void(&self) -> bool {
        !self.is_ctor && self.return_type.as_deref() == Some("void")
    }

    pub fn anchor(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }
}

/// `getHeight` -> `height`, `isFat` -> `fat`
fn accessor_property_name(method_name: &str) -> Option<String> {
    let captures = ACCESSOR_REGEX.captures(method_name)?;
    let suffix = captures.get(1)?.as_str();
    let mut chars = suffix.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// 类定义 - 方法目录与查找索引
///
/// Built once per analysis from the parser's declarations and never mutated.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    name: String,
    methods: Vec<MethodDefinition>,
    /// 方法名 -> 同名方法 (声明顺序)
    by_name: HashMap<String, Vec<MethodId>>,
    static_by_name: HashMap<String, Vec<MethodId>>,
    instance_by_name: HashMap<String, Vec<MethodId>>,
    /// 声明位置 -> 方法，用于把调用点映射回所在方法
    by_anchor: HashMap<SourcePos, MethodId>,
}

impl ClassDefinition {
    pub fn new(name: &str, declarations: &[MethodDeclaration]) -> Self {
        let mut methods: Vec<MethodDefinition> = declarations
            .iter()
            .enumerate()
            .map(|(index, decl)| MethodDefinition::from_declaration(MethodId(index), decl))
            .collect();

        let mut by_name: HashMap<String, Vec<MethodId>> = HashMap::new();
        let mut static_by_name: HashMap<String, Vec<MethodId>> = HashMap::new();
        let mut instance_by_name: HashMap<String, Vec<MethodId>> = HashMap::new();
        let mut by_anchor = HashMap::new();

        for method in &methods {
            by_name.entry(method.name.clone()).or_default().push(method.id);
            let split = if method.is_static { &mut static_by_name } else { &mut instance_by_name };
            split.entry(method.name.clone()).or_default().push(method.id);
            by_anchor.insert(method.anchor(), method.id);
        }

        for method in &mut methods {
            method.overloaded = by_name.get(&method.name).map_or(false, |ids| ids.len() > 1);
        }

        Self {
            name: name.to_string(),
            methods,
            by_name,
            static_by_name,
            instance_by_name,
            by_anchor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All methods in declaration order.
    pub fn methods(&self) -> &[MethodDefinition] {
        &self.methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn method(&self, id: MethodId) -> &MethodDefinition {
        &self.methods[id.index()]
    }

    pub fn method_by_index(&self, index: usize) -> Option<&MethodDefinition> {
        self.methods.get(index)
    }

    pub fn methods_by_name(&self, name: &str) -> Vec<&MethodDefinition> {
        self.lookup(&self.by_name, name)
    }

    pub fn static_methods_by_name(&self, name: &str) -> Vec<&MethodDefinition> {
        self.lookup(&self.static_by_name, name)
    }

    pub fn instance_methods_by_name(&self, name: &str) -> Vec<&MethodDefinition> {
        self.lookup(&self.instance_by_name, name)
    }

    fn lookup(&self, index: &HashMap<String, Vec<MethodId>>, name: &str) -> Vec<&MethodDefinition> {
        index
            .get(name)
            .map(|ids| ids.iter().map(|id| self.method(*id)).collect())
            .unwrap_or_default()
    }

    /// Method declared at `anchor`, if any.
    pub fn method_at(&self, anchor: SourcePos) -> Option<&MethodDefinition> {
        self.by_anchor.get(&anchor).map(|id| self.method(*id))
    }

    /// 调用点所在的本类方法 (字段初始化等方法体外位置返回 None)
    pub fn method_enclosing(&self, enclosure: &Enclosure) -> Option<&MethodDefinition> {
        match enclosure {
            Enclosure::Method(anchor) => self.method_at(*anchor),
            Enclosure::ClassBody | Enclosure::NestedType => None,
        }
    }

    /// True only inside a method body of this exact class, never inside a nested,
    /// anonymous or local type declared within it.
    pub fn is_within_own_method(&self, enclosure: &Enclosure) -> bool {
        self.method_enclosing(enclosure).is_some()
    }

    /// True when the position belongs to this class rather than to a type nested in it.
    pub fn is_lexically_owned(&self, enclosure: &Enclosure) -> bool {
        match enclosure {
            Enclosure::Method(_) => self.is_within_own_method(enclosure),
            Enclosure::ClassBody => true,
            Enclosure::NestedType => false,
        }
    }

    /// 属性名 -> 访问器 (getter/setter)，声明顺序
    pub fn property_accessors(&self) -> Vec<(String, Vec<&MethodDefinition>)> {
        let mut groups: Vec<(String, Vec<&MethodDefinition>)> = Vec::new();
        for method in &self.methods {
            let Some(property) = &method.property else { continue };
            match groups.iter_mut().find(|(name, _)| name == property) {
                Some((_, members)) => members.push(method),
                None => groups.push((property.clone(), vec![method])),
            }
        }
        groups
    }

    /// 名称 -> 同名方法，只包含真正重载的组 (不含构造器)
    pub fn overload_groups(&self) -> Vec<Vec<MethodId>> {
        let mut seen: Vec<&str> = Vec::new();
        let mut groups = Vec::new();
        for method in self.methods.iter().filter(|m| !m.is_ctor) {
            if seen.contains(&method.name.as_str()) {
                continue;
            }
            seen.push(&method.name);
            let ids: Vec<MethodId> = self.by_name[&method.name]
                .iter()
                .copied()
                .filter(|id| !self.method(*id).is_ctor)
                .collect();
            if ids.len() > 1 {
                groups.push(ids);
            }
        }
        groups
    }
}
