// ============================================================================
// 调用点解析 - 判断调用/方法引用是否指向本类声明的方法，以及是哪一个
// ============================================================================
//
// 重载只按参数个数 (arity) 和 vararg 兼容性近似解析，不做参数类型匹配。
// 解析失败不是错误: 调用可能指向父类、其他对象或外部类型，直接丢弃。

use tracing::trace;

use crate::call_graph::ResolvedCall;
use crate::call_site::{CallQualifier, CallSite, RefQualifier};
use crate::symbol_table::{ClassDefinition, MethodDefinition};

/// Attributes call sites of one class to the methods that class declares.
pub struct CallSiteResolver<'a> {
    class: &'a ClassDefinition,
}

impl<'a> CallSiteResolver<'a> {
    pub fn new(class: &'a ClassDefinition) -> Self {
        Self { class }
    }

    /// Resolves every site, dropping the ones that do not target this class.
    pub fn resolve_all(&self, sites: &[CallSite]) -> Vec<ResolvedCall> {
        sites.iter().filter_map(|site| self.resolve(site)).collect()
    }

    pub fn resolve(&self, site: &CallSite) -> Option<ResolvedCall> {
        // 嵌套/匿名/局部类中的调用属于其他类型
        if !self.class.is_lexically_owned(site.enclosure()) {
            trace!(line = site.line(), name = site.name(), "dropped: owned by another type");
            return None;
        }

        let callee = match site {
            CallSite::DirectCall {
                name,
                qualifier,
                arg_count,
                ..
            } => self.resolve_direct_call(name, qualifier, *arg_count),
            CallSite::MethodReference { name, qualifier, .. } => self.resolve_reference(name, qualifier),
        };

        let Some(callee) = callee else {
            trace!(line = site.line(), name = site.name(), "dropped: no matching declaration");
            return None;
        };

        Some(ResolvedCall {
            position: site.position(),
            caller: self.class.method_enclosing(site.enclosure()).map(|m| m.id),
            callee: callee.id,
        })
    }

    fn resolve_direct_call(
        &self,
        name: &str,
        qualifier: &CallQualifier,
        arg_count: usize,
    ) -> Option<&'a MethodDefinition> {
        match qualifier {
            CallQualifier::Implicit | CallQualifier::This => {}
            CallQualifier::Super | CallQualifier::OuterThis(_) | CallQualifier::Other => return None,
        }

        self.class
            .methods_by_name(name)
            .into_iter()
            .filter(|m| !m.is_ctor)
            .find(|m| accepts_arity(m, arg_count))
    }

    fn resolve_reference(&self, name: &str, qualifier: &RefQualifier) -> Option<&'a MethodDefinition> {
        let candidates = match qualifier {
            RefQualifier::This => self.class.instance_methods_by_name(name),
            RefQualifier::Type(type_name) if type_name == self.class.name() => {
                self.class.static_methods_by_name(name)
            }
            RefQualifier::Type(_) | RefQualifier::Super | RefQualifier::Expression => return None,
        };
        candidates.into_iter().find(|m| !m.is_ctor)
    }
}

/// Vararg methods take at least their fixed parameters; others need an exact count.
fn accepts_arity(method: &MethodDefinition, arg_count: usize) -> bool {
    (method.vararg && method.arg_count <= arg_count) || method.arg_count == arg_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::{Enclosure, MethodDeclaration, SourcePos};
    use crate::symbol_table::MethodId;
    use proptest::prelude::*;

    fn inside(class: &ClassDefinition, caller: usize) -> Enclosure {
        Enclosure::Method(class.methods()[caller].anchor())
    }

    fn call(name: &str, args: usize, enclosure: Enclosure) -> CallSite {
        CallSite::direct(name, args, SourcePos::new(40, 8), enclosure)
    }

    fn format_class() -> ClassDefinition {
        ClassDefinition::new(
            "Formatter",
            &[
                MethodDeclaration::new("format", 2),
                MethodDeclaration::new("format", 4).with_parameters(&["String"]),
                MethodDeclaration::new("format", 6).with_parameters(&["File", "String"]),
                MethodDeclaration::new("run", 8),
            ],
        )
    }

    #[test]
    fn test_overload_resolved_by_arity() {
        let class = format_class();
        let resolver = CallSiteResolver::new(&class);
        let from_run = inside(&class, 3);

        let one = resolver.resolve(&call("format", 1, from_run)).unwrap();
        assert_eq!(class.method(one.callee).signature, "format(String)");
        assert_eq!(one.caller, Some(MethodId(3)));

        let two = resolver.resolve(&call("format", 2, from_run)).unwrap();
        assert_eq!(class.method(two.callee).signature, "format(File,String)");

        assert!(resolver.resolve(&call("format", 3, from_run)).is_none());
        assert!(resolver.resolve(&call("unknown", 0, from_run)).is_none());
    }

    #[test]
    fn test_vararg_accepts_any_count_above_fixed_parameters() {
        let class = ClassDefinition::new(
            "Test",
            &[
                MethodDeclaration::new("format", 2)
                    .with_parameters(&["Integer..."])
                    .with_vararg(true),
                MethodDeclaration::new("log", 4)
                    .with_parameters(&["String", "Object..."])
                    .with_vararg(true),
                MethodDeclaration::new("run", 6),
            ],
        );
        let resolver = CallSiteResolver::new(&class);
        let from_run = inside(&class, 2);
        for args in 0..4 {
            let resolved = resolver.resolve(&call("format", args, from_run)).unwrap();
            assert_eq!(resolved.callee, MethodId(0));
        }
        assert!(resolver.resolve(&call("log", 0, from_run)).is_none());
        assert_eq!(resolver.resolve(&call("log", 1, from_run)).unwrap().callee, MethodId(1));
        assert_eq!(resolver.resolve(&call("log", 3, from_run)).unwrap().callee, MethodId(1));
    }

    #[test]
    fn test_first_declared_candidate_wins() {
        // 可变参数版本在前时，即使存在精确匹配也选它
        let class = ClassDefinition::new(
            "Test",
            &[
                MethodDeclaration::new("m", 2)
                    .with_parameters(&["int..."])
                    .with_vararg(true),
                MethodDeclaration::new("m", 4).with_parameters(&["int"]),
                MethodDeclaration::new("run", 6),
            ],
        );
        let resolver = CallSiteResolver::new(&class);
        let resolved = resolver.resolve(&call("m", 1, inside(&class, 2))).unwrap();
        assert_eq!(resolved.callee, MethodId(0));
    }

    #[test]
    fn test_qualified_calls_outside_authority_are_dropped() {
        let class = format_class();
        let resolver = CallSiteResolver::new(&class);
        let from_run = inside(&class, 3);

        let this_call = call("format", 0, from_run).with_qualifier(CallQualifier::This);
        assert!(resolver.resolve(&this_call).is_some());

        for qualifier in [
            CallQualifier::Super,
            CallQualifier::OuterThis("Formatter".to_string()),
            CallQualifier::Other,
        ] {
            let site = call("format", 0, from_run).with_qualifier(qualifier);
            assert!(resolver.resolve(&site).is_none());
        }
    }

    #[test]
    fn test_method_reference_static_instance_split() {
        let class = ClassDefinition::new(
            "InputMethodReference",
            &[
                MethodDeclaration::new("a1", 2)
                    .with_parameters(&["Integer"])
                    .with_static(true)
                    .with_return_type("boolean"),
                MethodDeclaration::new("a1", 6).with_return_type("boolean"),
                MethodDeclaration::new("run", 10),
            ],
        );
        let resolver = CallSiteResolver::new(&class);
        let from_run = inside(&class, 2);
        let pos = SourcePos::new(11, 30);

        let by_type = CallSite::reference(
            "a1",
            RefQualifier::Type("InputMethodReference".to_string()),
            pos,
            from_run,
        );
        assert_eq!(resolver.resolve(&by_type).unwrap().callee, MethodId(0));

        let by_this = CallSite::reference("a1", RefQualifier::This, pos, from_run);
        assert_eq!(resolver.resolve(&by_this).unwrap().callee, MethodId(1));

        for qualifier in [
            RefQualifier::Type("Other".to_string()),
            RefQualifier::Super,
            RefQualifier::Expression,
        ] {
            let site = CallSite::reference("a1", qualifier, pos, from_run);
            assert!(resolver.resolve(&site).is_none());
        }
    }

    #[test]
    fn test_nested_type_sites_are_dropped() {
        let class = format_class();
        let resolver = CallSiteResolver::new(&class);
        assert!(resolver.resolve(&call("format", 0, Enclosure::NestedType)).is_none());
        // 未知锚点同样不属于本类方法
        let stray = Enclosure::Method(SourcePos::new(100, 4));
        assert!(resolver.resolve(&call("format", 0, stray)).is_none());
    }

    #[test]
    fn test_field_initializer_call_has_no_caller() {
        let class = format_class();
        let resolver = CallSiteResolver::new(&class);
        let resolved = resolver.resolve(&call("format", 0, Enclosure::ClassBody)).unwrap();
        assert_eq!(resolved.caller, None);
        assert_eq!(resolved.callee, MethodId(0));
    }

    #[test]
    fn test_resolve_all_keeps_site_order() {
        let class = format_class();
        let resolver = CallSiteResolver::new(&class);
        let from_run = inside(&class, 3);
        let calls = resolver.resolve_all(&[
            call("format", 2, from_run),
            call("println", 1, from_run),
            call("format", 0, from_run),
        ]);
        let callees: Vec<MethodId> = calls.iter().map(|c| c.callee).collect();
        assert_eq!(callees, vec![MethodId(2), MethodId(0)]);
    }

    proptest! {
        /// 解析结果总是声明顺序中第一个满足 arity 规则的候选
        #[test]
        fn prop_resolution_picks_first_arity_match(
            overloads in prop::collection::vec((0usize..4, any::<bool>()), 1..6),
            args in 0usize..6,
        ) {
            let mut decls: Vec<MethodDeclaration> = overloads
                .iter()
                .enumerate()
                .map(|(i, (fixed, vararg))| {
                    let mut params: Vec<String> = (0..*fixed).map(|_| "int".to_string()).collect();
                    if *vararg {
                        params.push("int...".to_string());
                    }
                    let params: Vec<&str> = params.iter().map(String::as_str).collect();
                    MethodDeclaration::new("m", i * 2 + 1)
                        .with_parameters(&params)
                        .with_vararg(*vararg)
                })
                .collect();
            decls.push(MethodDeclaration::new("caller", 100));
            let class = ClassDefinition::new("Test", &decls);
            let resolver = CallSiteResolver::new(&class);

            let expected = overloads
                .iter()
                .position(|(fixed, vararg)| (*vararg && *fixed <= args) || *fixed == args);
            let resolved = resolver.resolve(&call("m", args, inside(&class, overloads.len())));
            prop_assert_eq!(resolved.map(|r| r.callee.index()), expected);
        }
    }
}
