// ============================================================================
// 重排 - 从依赖图推导更好的方法顺序
// ============================================================================
//
// 以声明顺序为种子的前序 DFS: 每个方法之后紧跟它 (尚未放置的) 依赖，
// 依赖按调用点出现顺序展开。visited 集合保证有环时也能终止并产生全排列。

use tracing::debug;

use crate::ordering::Ordering;
use crate::symbol_table::MethodId;

/// Depth-first reorderer, deterministic for a fixed initial order and graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reorderer;

impl Reorderer {
    pub fn new() -> Self {
        Self
    }

    pub fn reorder<'a>(&self, initial: &Ordering<'a>) -> Ordering<'a> {
        let graph = initial.graph();
        let mut visited = vec![false; initial.len()];
        let mut placed: Vec<MethodId> = Vec::with_capacity(initial.len());
        let mut stack: Vec<MethodId> = Vec::new();

        for &seed in initial.order() {
            if visited[seed.index()] {
                continue;
            }
            stack.push(seed);
            while let Some(method) = stack.pop() {
                if visited[method.index()] {
                    continue;
                }
                visited[method.index()] = true;
                placed.push(method);
                // 逆序入栈，使第一个出现的依赖最先弹出
                for &dependency in graph.dependencies_of(method).iter().rev() {
                    if !visited[dependency.index()] {
                        stack.push(dependency);
                    }
                }
            }
        }

        let moved = placed
            .iter()
            .enumerate()
            .filter(|(position, id)| initial.position_of(**id) != *position)
            .count();
        debug!(methods = placed.len(), moved, "reordered methods");

        Ordering::from_order(initial.class(), graph, placed)
    }
}
