// ============================================================================
// 依赖图模块 - 单个类内部的方法调用关系
// ============================================================================
//
// 节点是 MethodId (方法在类中的槽位)，边按调用点首次出现顺序去重保存。
// 距离类指标使用原始 ResolvedCall 列表 (重复调用各计一次)，而不是去重后的边。

use std::collections::HashMap;

use serde::Serialize;

use crate::call_site::SourcePos;
use crate::symbol_table::MethodId;

/// 一个已解析到本类方法的调用点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedCall {
    /// Where the call or reference expression starts.
    pub position: SourcePos,
    /// `None` for calls outside any method body, e.g. a field initialiser.
    pub caller: Option<MethodId>,
    pub callee: MethodId,
}

impl ResolvedCall {
    pub fn line(&self) -> usize {
        self.position.line
    }
}

/// 调用图 - caller -> callee 与 callee -> caller 邻接表
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 全部已解析调用 (源码顺序)
    calls: Vec<ResolvedCall>,
    /// 方法 -> 它调用的方法 (去重，首次出现顺序)
    outgoing: HashMap<MethodId, Vec<MethodId>>,
    /// 方法 -> 调用它的方法 (去重，首次出现顺序)
    incoming: HashMap<MethodId, Vec<MethodId>>,
    /// 去重后的边，按首次出现顺序
    edges: Vec<(MethodId, MethodId)>,
}

impl DependencyGraph {
    pub fn new(calls: Vec<ResolvedCall>) -> Self {
        let mut graph = Self::default();
        for call in &calls {
            if let Some(caller) = call.caller {
                graph.add_edge(caller, call.callee);
            }
        }
        graph.calls = calls;
        graph
    }

    /// 添加调用关系 (重复边只保留第一次)
    fn add_edge(&mut self, caller: MethodId, callee: MethodId) {
        let callees = self.outgoing.entry(caller).or_default();
        if callees.contains(&callee) {
            return;
        }
        callees.push(callee);
        self.incoming.entry(callee).or_default().push(caller);
        self.edges.push((caller, callee));
    }

    /// Every resolved call, including caller-less ones.
    pub fn calls(&self) -> &[ResolvedCall] {
        &self.calls
    }

    /// Raw `(caller, callee)` pairs of calls made from inside a method body.
    pub fn method_calls(&self) -> impl Iterator<Item = (MethodId, MethodId)> + '_ {
        self.calls.iter().filter_map(|call| call.caller.map(|caller| (caller, call.callee)))
    }

    /// Distinct edges in first-appearance order.
    pub fn edges(&self) -> &[(MethodId, MethodId)] {
        &self.edges
    }

    /// Callees of `method` in first call-site appearance order.
    pub fn dependencies_of(&self, method: MethodId) -> &[MethodId] {
        self.outgoing.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependants_of(&self, method: MethodId) -> &[MethodId] {
        self.incoming.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct edge test, not transitive.
    pub fn depends_on(&self, caller: MethodId, callee: MethodId) -> bool {
        self.dependencies_of(caller).contains(&callee)
    }

    pub fn has_dependencies(&self, method: MethodId) -> bool {
        !self.dependencies_of(method).is_empty()
    }

    pub fn has_dependants(&self, method: MethodId) -> bool {
        !self.dependants_of(method).is_empty()
    }
}
