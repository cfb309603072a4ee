use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Error type for execution order resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The walk must start from exactly one declared input
    InputCount { found: usize },
    /// Nothing was reachable from the input
    Empty,
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::InputCount { found } => write!(
                f,
                "Currently, only one input is supported, but {} was given",
                found
            ),
            TopologyError::Empty => write!(f, "Execution order is empty"),
        }
    }
}

impl std::error::Error for TopologyError {}

/// Resolve a single-pass execution order starting from one input.
///
/// # Arguments
/// * `inputs` - The declared input nodes; exactly one is supported
/// * `successors` - Function that returns the successors of a node
///
/// # Returns
/// Every node reachable from the input exactly once, each one after all of
/// its forward predecessors.
///
/// # Algorithm
/// 1. DFS from the input to collect the reachable nodes and classify edges
///    that point back into the current DFS path as feedback edges
/// 2. Kahn-style walk over the remaining forward edges, visiting successors
///    in the order `successors` yields them
///
/// Feedback edges never create an in-pass cycle. The executor realizes them
/// by reading the previous call's cached value.
pub fn resolve_order<K>(
    inputs: impl IntoIterator<Item = K>,
    successors: impl Fn(&K) -> Vec<K>,
) -> Result<Vec<K>, TopologyError>
where
    K: Hash + Eq + Clone + Debug,
{
    let inputs: Vec<K> = inputs.into_iter().collect();
    if inputs.len() != 1 {
        return Err(TopologyError::InputCount {
            found: inputs.len(),
        });
    }
    let root = inputs[0].clone();

    let mut adjacency: HashMap<K, Vec<K>> = HashMap::new();
    let mut visited = HashSet::new();
    let mut recursion_stack = HashSet::new();
    let mut feedback: HashSet<(K, K)> = HashSet::new();

    fn enter<K>(
        node: K,
        successors: &impl Fn(&K) -> Vec<K>,
        visited: &mut HashSet<K>,
        recursion_stack: &mut HashSet<K>,
    ) -> (K, Vec<K>, usize)
    where
        K: Hash + Eq + Clone + Debug,
    {
        visited.insert(node.clone());
        recursion_stack.insert(node.clone());

        let mut neighbors: Vec<K> = Vec::new();
        for neighbor in successors(&node) {
            if !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }
        (node, neighbors, 0)
    }

    // Frames are (node, deduplicated successors, next successor to look at)
    let mut stack = vec![enter(
        root.clone(),
        &successors,
        &mut visited,
        &mut recursion_stack,
    )];
    while let Some((node, neighbors, next)) = stack.last_mut() {
        if let Some(neighbor) = neighbors.get(*next).cloned() {
            *next += 1;
            if recursion_stack.contains(&neighbor) {
                feedback.insert((node.clone(), neighbor));
            } else if !visited.contains(&neighbor) {
                let frame = enter(neighbor, &successors, &mut visited, &mut recursion_stack);
                stack.push(frame);
            }
            continue;
        }

        if let Some((node, neighbors, _)) = stack.pop() {
            recursion_stack.remove(&node);
            adjacency.insert(node, neighbors);
        }
    }

    // Count forward predecessors only
    let mut pending: HashMap<K, usize> = adjacency.keys().map(|k| (k.clone(), 0)).collect();
    for (from, tos) in &adjacency {
        for to in tos {
            if !feedback.contains(&(from.clone(), to.clone())) {
                if let Some(count) = pending.get_mut(to) {
                    *count += 1;
                }
            }
        }
    }

    let mut order = Vec::with_capacity(adjacency.len());
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors {
                if feedback.contains(&(node.clone(), neighbor.clone())) {
                    continue;
                }
                if let Some(count) = pending.get_mut(neighbor) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }
        order.push(node);
    }

    if order.is_empty() {
        return Err(TopologyError::Empty);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges<'a>(list: &'a [(&'a str, &'a str)]) -> impl Fn(&&'a str) -> Vec<&'a str> + 'a {
        move |node: &&str| {
            list.iter()
                .filter(|(from, _)| from == node)
                .map(|(_, to)| *to)
                .collect()
        }
    }

    fn position(order: &[&str], node: &str) -> usize {
        order.iter().position(|n| *n == node).unwrap()
    }

    #[test]
    fn test_simple_chain() {
        // a -> b -> c
        let list = [("a", "b"), ("b", "c")];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond() {
        // a -> b -> d
        // a -> c -> d
        let list = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_predecessors_come_first() {
        // the long path a -> b -> c -> e must still put e after the shortcut a -> e
        let list = [
            ("a", "e"),
            ("a", "b"),
            ("b", "c"),
            ("c", "e"),
            ("c", "d"),
            ("e", "f"),
            ("d", "f"),
        ];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order.len(), 6);
        for (from, to) in list {
            assert!(position(&order, from) < position(&order, to), "{from} -> {to}");
        }
    }

    #[test]
    fn test_feedback_edge_does_not_block() {
        // a -> b -> c, c -> b feeds back
        let list = [("a", "b"), ("b", "c"), ("c", "b")];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_self_loop() {
        let list = [("a", "b"), ("b", "b")];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_unreachable_nodes_are_left_out() {
        let list = [("a", "b"), ("x", "b")];
        let order = resolve_order(["a"], edges(&list)).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_input_count() {
        let list = [("a", "b")];
        assert_eq!(
            resolve_order(Vec::<&str>::new(), edges(&list)),
            Err(TopologyError::InputCount { found: 0 })
        );
        assert_eq!(
            resolve_order(["a", "b"], edges(&list)),
            Err(TopologyError::InputCount { found: 2 })
        );
    }

    #[test]
    fn test_long_chain() {
        const LEN: u32 = 100_000;
        let order = resolve_order([0u32], |k: &u32| if k + 1 < LEN { vec![k + 1] } else { vec![] }).unwrap();
        assert_eq!(order.len(), LEN as usize);
        assert!(order.iter().copied().eq(0..LEN));
    }

    #[test]
    fn test_long_cycle_back_to_root() {
        // 0 -> 1 -> ... -> n-1 -> 0, the closing edge is feedback
        const LEN: u32 = 50_000;
        let order = resolve_order([0u32], |k: &u32| vec![(k + 1) % LEN]).unwrap();
        assert!(order.iter().copied().eq(0..LEN));
    }
}
