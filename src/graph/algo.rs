//! Graph algorithms shared by [`WorkflowGraph`](super::WorkflowGraph).

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

/// Kahn's algorithm over an adjacency map.
///
/// Returns nodes in dependency order with lexicographic tie-breaking for
/// determinism. When the graph is cyclic, the result excludes cycle members;
/// callers compare the length against the node count to detect this.
pub(super) fn topological_sort(adjacency: &FxHashMap<&str, Vec<&str>>) -> Vec<String> {
    let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();
    for (&node, targets) in adjacency {
        in_degree.entry(node).or_insert(0);
        for &target in targets {
            *in_degree.entry(target).or_insert(0) += 1;
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();
    ready.sort_unstable();

    let mut queue: VecDeque<&str> = ready.into();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        let Some(targets) = adjacency.get(node) else {
            continue;
        };
        let mut unlocked = Vec::new();
        for &target in targets {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    unlocked.push(target);
                }
            }
        }
        unlocked.sort_unstable();
        queue.extend(unlocked);
    }

    order
}

/// Breadth-first shortest path from `start` to `goal`, inclusive.
///
/// Returns an empty vector when `goal` is unreachable.
pub(super) fn shortest_path(
    adjacency: &FxHashMap<&str, Vec<&str>>,
    start: &str,
    goal: &str,
) -> Vec<String> {
    if start == goal {
        return vec![start.to_string()];
    }

    let mut predecessor: FxHashMap<&str, &str> = FxHashMap::default();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let Some(targets) = adjacency.get(node) else {
            continue;
        };
        for &target in targets {
            if target == start || predecessor.contains_key(target) {
                continue;
            }
            predecessor.insert(target, node);
            if target == goal {
                let mut path = vec![goal.to_string()];
                let mut current = goal;
                while let Some(&prev) = predecessor.get(current) {
                    path.push(prev.to_string());
                    current = prev;
                }
                path.reverse();
                return path;
            }
            queue.push_back(target);
        }
    }

    Vec::new()
}
