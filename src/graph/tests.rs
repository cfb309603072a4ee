use super::*;
use crate::error::GraphError;
use crate::tensor::Shape;

fn chain(names: &[&str]) -> Graph<()> {
    let mut graph = Graph::new();
    for name in names {
        graph.add_node(*name, Some(())).unwrap();
    }
    for pair in names.windows(2) {
        graph.connect(pair[0], pair[1]).unwrap();
    }
    if let Some(first) = names.first() {
        graph.inputs.push(first.to_string());
    }
    graph
}

fn names(graph: &Graph<()>, keys: &[NodeKey]) -> Vec<String> {
    keys.iter()
        .map(|&key| graph.name(key).unwrap().to_string())
        .collect()
}

#[test]
fn test_simple_chain_topology() {
    let graph = chain(&["input", "linear", "lif", "output"]);

    let order = graph.execution_order().unwrap();
    assert_eq!(names(&graph, &order), vec!["input", "linear", "lif", "output"]);
}

#[test]
fn test_duplicate_names_rejected() {
    let mut graph: Graph<()> = Graph::new();
    graph.add_node("a", None).unwrap();
    assert!(matches!(
        graph.add_node("a", None),
        Err(GraphError::DuplicateNode(name)) if name == "a"
    ));
}

#[test]
fn test_connect_unknown_node() {
    let mut graph = chain(&["a"]);
    assert!(matches!(
        graph.connect("a", "missing"),
        Err(GraphError::UnknownNode(name)) if name == "missing"
    ));
}

#[test]
fn test_root_and_sources() {
    let mut graph = chain(&["a", "b", "c"]);
    graph.connect("c", "b").unwrap();

    let a = graph.key("a").unwrap();
    let b = graph.key("b").unwrap();
    let c = graph.key("c").unwrap();

    assert_eq!(graph.get_root(), vec![a]);
    assert_eq!(graph.find_source_nodes_of(b), vec![a, c]);
    assert!(graph.find_source_nodes_of(a).is_empty());
}

#[test]
fn test_duplicate_edge_is_ignored() {
    let mut graph = chain(&["a", "b"]);
    let a = graph.key("a").unwrap();
    let b = graph.key("b").unwrap();

    assert!(!graph.add_edge(a, b));
    assert_eq!(graph.successors(a), vec![b]);
}

#[test]
fn test_edge_shapes_are_recorded() {
    let mut graph: Graph<()> = Graph::new();
    let a = graph.add_node("a", None).unwrap();
    let b = graph.add_node("b", None).unwrap();
    graph.add_edge_with_shape(a, b, Some(Shape::from([3])));

    assert_eq!(graph.node(a).unwrap().outgoing[&b], Some(Shape::from([3])));
    assert_eq!(graph.node(b).unwrap().incoming[&a], Some(Shape::from([3])));
}

#[test]
fn test_remove_node_clears_edges() {
    let mut graph = chain(&["a", "b", "c"]);
    let a = graph.key("a").unwrap();
    let b = graph.key("b").unwrap();
    let c = graph.key("c").unwrap();

    let (node, elem) = graph.remove_node(b).unwrap();
    assert_eq!(node.name, "b");
    assert_eq!(elem, Some(()));

    assert!(graph.successors(a).is_empty());
    assert!(graph.find_source_nodes_of(c).is_empty());
    assert!(!graph.contains("b"));
    assert_eq!(graph.node_list(), &[a, c]);
}

#[test]
fn test_recurrent_graph_order() {
    // input -> rnn -> output with rnn feeding itself through a hidden edge
    let mut graph = chain(&["input", "rnn", "output"]);
    graph.connect("rnn", "rnn").unwrap();

    let order = graph.execution_order().unwrap();
    assert_eq!(names(&graph, &order), vec!["input", "rnn", "output"]);
}

#[test]
fn test_order_requires_one_input() {
    let mut graph = chain(&["a", "b"]);
    graph.inputs.push("b".to_string());
    assert_eq!(
        graph.execution_order(),
        Err(TopologyError::InputCount { found: 2 })
    );

    let empty: Graph<()> = Graph::new();
    assert_eq!(
        empty.execution_order(),
        Err(TopologyError::InputCount { found: 0 })
    );
}

#[test]
fn test_into_parts_keeps_markers() {
    let mut graph: Graph<u32> = Graph::new();
    let a = graph.add_node("a", Some(7)).unwrap();
    let b = graph.add_node("b", None).unwrap();

    let (topology, elems) = graph.into_parts();
    assert!(topology.is_mapped(a));
    assert!(!topology.is_mapped(b));
    assert_eq!(elems[a], 7);
    assert_eq!(topology.name(b), Some("b"));
}
