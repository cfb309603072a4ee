//! Rebuilding an executable graph from IR.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GraphError;
use crate::executor::{ExecutorConfig, GraphExecutor};
use crate::graph::{Graph, Unit};
use crate::ir::{self, IrGraph, IrNode};
use crate::units::Identity;

/// Where an IR graph comes from: already in memory, or a JSON file on disk.
#[derive(Debug, Clone)]
pub enum IrSource {
    Graph(IrGraph),
    Path(PathBuf),
}

impl IrSource {
    pub fn resolve(self) -> Result<IrGraph, GraphError> {
        match self {
            IrSource::Graph(graph) => Ok(graph),
            IrSource::Path(path) => ir::read(path),
        }
    }
}

impl From<IrGraph> for IrSource {
    fn from(graph: IrGraph) -> Self {
        IrSource::Graph(graph)
    }
}

impl From<PathBuf> for IrSource {
    fn from(path: PathBuf) -> Self {
        IrSource::Path(path)
    }
}

impl From<&Path> for IrSource {
    fn from(path: &Path) -> Self {
        IrSource::Path(path.to_path_buf())
    }
}

impl From<&str> for IrSource {
    fn from(path: &str) -> Self {
        IrSource::Path(PathBuf::from(path))
    }
}

/// Unit used for a node the caller's mapping declined. Only boundary markers
/// get one; everything else stays unmapped.
pub fn default_unit(node: &IrNode) -> Option<Box<dyn Unit>> {
    if node.is_boundary() {
        Some(Box::new(Identity::new()))
    } else {
        None
    }
}

/// Builds a graph with one node per IR node, in IR order.
///
/// Edge endpoints naming a subgraph rather than one of its members are
/// rewritten to `<name>.output` when used as a source and `<name>.input` when
/// used as a destination, provided those members exist.
///
/// The graph's inputs are the `Input` markers nothing feeds into and its
/// outputs the `Output` markers nothing reads from. Markers of an inlined
/// subgraph are wired on both sides and stay plain passthroughs.
pub fn to_graph<F>(ir: &IrGraph, mut map: F) -> Result<Graph<Box<dyn Unit>>, GraphError>
where
    F: FnMut(&IrNode) -> Option<Box<dyn Unit>>,
{
    let mut graph = Graph::new();
    for (name, node) in &ir.nodes {
        let unit = map(node).or_else(|| default_unit(node));
        graph.add_node(name.as_str(), unit)?;
    }

    for (src, dst) in &ir.edges {
        let src = boundary_endpoint(&graph, src, "output");
        let dst = boundary_endpoint(&graph, dst, "input");
        let from = graph.require(&src)?;
        let to = graph.require(&dst)?;
        graph.add_edge(from, to);
    }

    for (name, node) in &ir.nodes {
        let Some(topology) = graph.key(name).and_then(|key| graph.node(key)) else {
            continue;
        };
        let (is_root, is_sink) = (topology.is_root(), topology.is_sink());
        match node {
            IrNode::Input { .. } if is_root => graph.inputs.push(name.clone()),
            IrNode::Output { .. } if is_sink => graph.outputs.push(name.clone()),
            _ => {}
        }
    }

    debug!(
        nodes = graph.len(),
        edges = ir.edges.len(),
        inputs = graph.inputs.len(),
        outputs = graph.outputs.len(),
        "reconstructed graph from IR"
    );
    Ok(graph)
}

fn boundary_endpoint<T>(graph: &Graph<T>, name: &str, member: &str) -> String {
    if !graph.contains(name) {
        let candidate = format!("{name}.{member}");
        if graph.contains(&candidate) {
            return candidate;
        }
    }
    name.to_string()
}

/// Reads or takes an IR graph, maps its nodes and builds an executor.
pub fn load<F>(source: impl Into<IrSource>, map: F) -> Result<GraphExecutor, GraphError>
where
    F: FnMut(&IrNode) -> Option<Box<dyn Unit>>,
{
    load_with_config(source, map, ExecutorConfig::default())
}

pub fn load_with_config<F>(
    source: impl Into<IrSource>,
    map: F,
    config: ExecutorConfig,
) -> Result<GraphExecutor, GraphError>
where
    F: FnMut(&IrNode) -> Option<Box<dyn Unit>>,
{
    let ir = source.into().resolve()?;
    let graph = to_graph(&ir, map)?;
    GraphExecutor::with_config(graph, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Leaf;
    use crate::tensor::Tensor;
    use crate::units;

    fn flattened() -> IrGraph {
        IrGraph::new()
            .with_node("input", IrNode::input([1]))
            .with_node("block.input", IrNode::input([1]))
            .with_node("block.sum", Leaf::new("integrator"))
            .with_node("block.output", IrNode::output([1]))
            .with_node("output", IrNode::output([1]))
            .with_edge("input", "block")
            .with_edge("block.input", "block.sum")
            .with_edge("block.sum", "block.output")
            .with_edge("block", "output")
    }

    #[test]
    fn test_subgraph_endpoints_are_rewritten() {
        let graph = to_graph(&flattened(), units::from_ir).unwrap();

        let input = graph.key("input").unwrap();
        let block_input = graph.key("block.input").unwrap();
        let block_output = graph.key("block.output").unwrap();
        let output = graph.key("output").unwrap();

        assert_eq!(graph.successors(input), vec![block_input]);
        assert_eq!(graph.successors(block_output), vec![output]);
        assert!(!graph.contains("block"));
    }

    #[test]
    fn test_markers_default_to_identity() {
        let ir = IrGraph::new()
            .with_node("input", IrNode::input([2]))
            .with_node("conv", Leaf::new("conv2d"))
            .with_node("output", IrNode::output([2]))
            .with_edge("input", "conv")
            .with_edge("conv", "output");

        let graph = to_graph(&ir, |_| None).unwrap();
        assert!(graph.is_mapped(graph.key("input").unwrap()));
        assert!(graph.is_mapped(graph.key("output").unwrap()));
        assert!(!graph.is_mapped(graph.key("conv").unwrap()));
        assert_eq!(graph.inputs, vec!["input".to_string()]);
        assert_eq!(graph.outputs, vec!["output".to_string()]);
    }

    #[test]
    fn test_unknown_endpoint_is_reported() {
        let ir = IrGraph::new()
            .with_node("input", IrNode::input([1]))
            .with_edge("input", "missing");

        let result = to_graph(&ir, units::from_ir);
        assert!(matches!(result, Err(GraphError::UnknownNode(name)) if name == "missing"));
    }

    #[test]
    fn test_inner_markers_are_not_boundaries() {
        let graph = to_graph(&flattened(), units::from_ir).unwrap();
        assert_eq!(graph.inputs, vec!["input".to_string()]);
        assert_eq!(graph.outputs, vec!["output".to_string()]);
    }

    #[test]
    fn test_load_runs_flattened_subgraph() {
        let mut executor = load(flattened(), units::from_ir).unwrap();
        assert_eq!(
            executor.execution_order(),
            vec!["input", "block.input", "block.sum", "block.output", "output"]
        );

        let (first, state) = executor.forward(&Tensor::scalar(2.0), None).unwrap();
        let (second, _) = executor.forward(&Tensor::scalar(2.0), Some(&state)).unwrap();
        assert_eq!(first.data(), &[2.0]);
        assert_eq!(second.data(), &[4.0]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(dir.path().join("absent.json").as_path(), units::from_ir);
        assert!(matches!(result, Err(GraphError::Io(_))));
    }
}
