// ============================================================================
// Ordering - 方法的一个线性排列 (初始: 声明顺序) 及其上的结构质量指标
// ============================================================================
//
// Ordering 是只读视图: reorder / move_method_by 返回新实例，MethodDefinition 的
// 声明序号 (index) 永远不变，作为 "初始位置" 的锚点。

use serde::{Deserialize, Serialize};

use crate::call_graph::DependencyGraph;
use crate::error::{AnalysisError, AnalysisResult};
use crate::symbol_table::{Accessibility, ClassDefinition, MethodDefinition, MethodId};

/// 各项指标在总惩罚分中的权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PenaltyWeights {
    pub ctor_group_split: f64,
    pub override_group_split: f64,
    pub overload_group_split: f64,
    pub accessor_split: f64,
    pub declaration_before_usage: f64,
    pub relative_order_inconsistency: f64,
    pub distant_call: f64,
    pub total_distance: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            ctor_group_split: 4.0,
            override_group_split: 3.0,
            overload_group_split: 5.0,
            accessor_split: 3.0,
            declaration_before_usage: 4.0,
            relative_order_inconsistency: 1.0,
            distant_call: 3.0,
            total_distance: 1.0,
        }
    }
}

/// Every metric of one ordering, ready for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderingMetrics {
    pub total_distance: usize,
    pub distant_calls: usize,
    pub declaration_before_usage: usize,
    pub ctor_group_splits: usize,
    pub override_group_splits: usize,
    pub overload_group_splits: usize,
    pub accessor_splits: usize,
    pub relative_order_inconsistencies: usize,
    pub penalty: f64,
}

#[derive(Debug, Clone)]
pub struct Ordering<'a> {
    class: &'a ClassDefinition,
    graph: &'a DependencyGraph,
    /// position -> method
    order: Vec<MethodId>,
    /// method index -> position
    positions: Vec<usize>,
}

impl<'a> Ordering<'a> {
    /// Declaration order.
    pub fn initial(class: &'a ClassDefinition, graph: &'a DependencyGraph) -> Self {
        let order: Vec<MethodId> = class.methods().iter().map(|m| m.id).collect();
        Self::from_order(class, graph, order)
    }

    pub(crate) fn from_order(class: &'a ClassDefinition, graph: &'a DependencyGraph, order: Vec<MethodId>) -> Self {
        let mut positions = vec![0; order.len()];
        for (position, id) in order.iter().enumerate() {
            positions[id.index()] = position;
        }
        Self {
            class,
            graph,
            order,
            positions,
        }
    }

    pub fn class(&self) -> &'a ClassDefinition {
        self.class
    }

    pub fn graph(&self) -> &'a DependencyGraph {
        self.graph
    }

    pub fn order(&self) -> &[MethodId] {
        &self.order
    }

    /// Methods in this ordering's sequence.
    pub fn methods(&self) -> Vec<&'a MethodDefinition> {
        self.order.iter().map(|id| self.class.method(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position_of(&self, method: MethodId) -> usize {
        self.positions[method.index()]
    }

    pub fn method_at_position(&self, position: usize) -> Option<&'a MethodDefinition> {
        self.order.get(position).map(|id| self.class.method(*id))
    }

    pub fn method_by_initial_index(&self, index: usize) -> Option<&'a MethodDefinition> {
        self.class.method_by_index(index)
    }

    // ========================================================================
    // 派生排列
    // ========================================================================

    /// A new ordering over the same methods in the given sequence.
    pub fn reorder(&self, sequence: Vec<MethodId>) -> AnalysisResult<Ordering<'a>> {
        let mut seen = vec![false; self.order.len()];
        let is_permutation = sequence.len() == self.order.len()
            && sequence.iter().all(|id| match seen.get_mut(id.index()) {
                Some(flag) if !*flag => {
                    *flag = true;
                    true
                }
                _ => false,
            });
        if !is_permutation {
            return Err(AnalysisError::InvalidOrdering(format!(
                "new ordering contains another set of methods: current {}, new {}",
                self.signature_list(&self.order),
                self.signature_list(&sequence)
            )));
        }
        Ok(Self::from_order(self.class, self.graph, sequence))
    }

    /// Moves one method by `shift` positions, shifting the methods in between.
    pub fn move_method_by(&self, method: MethodId, shift: isize) -> AnalysisResult<Ordering<'a>> {
        let current = self.position_of(method);
        let target = current as isize + shift;
        if target < 0 || target >= self.order.len() as isize {
            return Err(AnalysisError::InvalidOrdering(format!(
                "cannot move method #{current} by {shift} positions"
            )));
        }
        let mut order = self.order.clone();
        order.remove(current);
        order.insert(target as usize, method);
        Ok(Self::from_order(self.class, self.graph, order))
    }

    fn signature_list(&self, ids: &[MethodId]) -> String {
        let signatures: Vec<&str> = ids
            .iter()
            .map(|id| {
                self.class
                    .method_by_index(id.index())
                    .map_or("<unknown>", |m| m.signature.as_str())
            })
            .collect();
        format!("[{}]", signatures.join("; "))
    }

    // ========================================================================
    // 查询
    // ========================================================================

    pub fn is_leaf_method(&self, method: MethodId) -> bool {
        !self.graph.has_dependencies(method)
    }

    /// Public method that neither calls nor is called by other methods of the class.
    pub fn is_interface_method(&self, method: MethodId) -> bool {
        self.class.method(method).accessibility == Accessibility::Public
            && !self.graph.has_dependencies(method)
            && !self.graph.has_dependants(method)
    }

    /// Distinct callees by first call-site occurrence, independent of positions.
    pub fn dependencies_in_appearance_order(&self, method: MethodId) -> &'a [MethodId] {
        self.graph.dependencies_of(method)
    }

    pub fn index_distance(&self, a: MethodId, b: MethodId) -> usize {
        self.position_of(a).abs_diff(self.position_of(b))
    }

    /// Start line the method would have if the class were re-emitted in this order.
    ///
    /// Each method carries its own lines plus the blank run that followed it in the
    /// source; the last method reuses the separator before it.
    pub fn translated_line(&self, method: MethodId) -> usize {
        let Some(first) = self.class.methods().first() else {
            return 0;
        };
        let preceding: usize = self.order[..self.position_of(method)]
            .iter()
            .map(|id| self.footprint(*id))
            .sum();
        first.line + preceding
    }

    /// 方法本身的行数 + 其后的空白间隔 (按原始布局)
    fn footprint(&self, method: MethodId) -> usize {
        let methods = self.class.methods();
        let def = self.class.method(method);
        let gap_after = |index: usize| {
            let current = &methods[index];
            methods
                .get(index + 1)
                .map(|next| next.line.saturating_sub(current.line + current.length))
        };
        let separator = gap_after(def.index)
            .or_else(|| def.index.checked_sub(1).and_then(&gap_after))
            .unwrap_or(0);
        def.length + separator
    }

    pub fn line_distance(&self, a: MethodId, b: MethodId) -> usize {
        self.translated_line(a).abs_diff(self.translated_line(b))
    }

    // ========================================================================
    // 指标
    // ========================================================================

    /// Sum of index distances over every call made from a method body.
    pub fn total_distance(&self) -> usize {
        self.graph
            .method_calls()
            .map(|(caller, callee)| self.index_distance(caller, callee))
            .sum()
    }

    /// Calls whose caller and callee are more than `threshold` positions apart.
    pub fn distant_call_count(&self, threshold: usize) -> usize {
        self.graph
            .method_calls()
            .filter(|(caller, callee)| self.index_distance(*caller, *callee) > threshold)
            .count()
    }

    /// Calls whose callee sits after the caller.
    pub fn declaration_before_usage_count(&self) -> usize {
        self.graph
            .method_calls()
            .filter(|(caller, callee)| self.position_of(*callee) > self.position_of(*caller))
            .count()
    }

    pub fn overload_group_split_count(&self) -> usize {
        self.class
            .overload_groups()
            .iter()
            .map(|group| self.group_split(group))
            .sum()
    }

    /// All override-marked methods are treated as one group.
    pub fn override_group_split_count(&self) -> usize {
        let group: Vec<MethodId> = self.class.methods().iter().filter(|m| m.is_override).map(|m| m.id).collect();
        self.group_split(&group)
    }

    pub fn ctor_group_split_count(&self) -> usize {
        let group: Vec<MethodId> = self.class.methods().iter().filter(|m| m.is_ctor).map(|m| m.id).collect();
        self.group_split(&group)
    }

    /// Getter/setter pairs of the same property that are not adjacent.
    pub fn accessor_split_count(&self) -> usize {
        self.class
            .property_accessors()
            .iter()
            .map(|(_, accessors)| {
                let getters = accessors.iter().filter(|m| m.getter);
                getters
                    .map(|getter| {
                        accessors
                            .iter()
                            .filter(|m| m.setter)
                            .filter(|setter| self.index_distance(getter.id, setter.id) != 1)
                            .count()
                    })
                    .sum::<usize>()
            })
            .sum()
    }

    /// Pairs of distinct edges that disagree on callers-before-callees.
    pub fn relative_order_inconsistency_count(&self) -> usize {
        let (mut forward, mut backward) = (0usize, 0usize);
        for (caller, callee) in self.graph.edges() {
            let (from, to) = (self.position_of(*caller), self.position_of(*callee));
            if from < to {
                forward += 1;
            } else if from > to {
                backward += 1;
            }
        }
        forward * backward
    }

    /// 组内夹杂的外部方法数: max - min + 1 - |group|
    fn group_split(&self, group: &[MethodId]) -> usize {
        let positions = group.iter().map(|id| self.position_of(*id));
        match (positions.clone().min(), positions.max()) {
            (Some(min), Some(max)) => max - min + 1 - group.len(),
            _ => 0,
        }
    }

    pub fn penalty(&self, weights: &PenaltyWeights, threshold: usize) -> f64 {
        self.metrics(weights, threshold).penalty
    }

    pub fn metrics(&self, weights: &PenaltyWeights, threshold: usize) -> OrderingMetrics {
        let mut metrics = OrderingMetrics {
            total_distance: self.total_distance(),
            distant_calls: self.distant_call_count(threshold),
            declaration_before_usage: self.declaration_before_usage_count(),
            ctor_group_splits: self.ctor_group_split_count(),
            override_group_splits: self.override_group_split_count(),
            overload_group_splits: self.overload_group_split_count(),
            accessor_splits: self.accessor_split_count(),
            relative_order_inconsistencies: self.relative_order_inconsistency_count(),
            penalty: 0.0,
        };
        metrics.penalty = weights.ctor_group_split * metrics.ctor_group_splits as f64
            + weights.override_group_split * metrics.override_group_splits as f64
            + weights.overload_group_split * metrics.overload_group_splits as f64
            + weights.accessor_split * metrics.accessor_splits as f64
            + weights.declaration_before_usage * metrics.declaration_before_usage as f64
            + weights.relative_order_inconsistency * metrics.relative_order_inconsistencies as f64
            + weights.distant_call * metrics.distant_calls as f64
            + weights.total_distance * metrics.total_distance as f64;
        metrics
    }
}
