//! Turning a traced model into IR.

mod trace;

pub use trace::{Trace, Traceable};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::GraphError;
use crate::graph::TopologyError;
use crate::ir::{IrGraph, IrNode};
use crate::tensor::Tensor;

/// Names taken by the synthesized boundary markers.
const RESERVED: [&str; 2] = ["input", "output"];

/// Knobs for [`extract_ir`].
pub struct ExtractOptions<U> {
    /// Name of the single node a childless model collapses into.
    pub model_name: String,
    /// Units whose children are folded into the unit itself.
    pub ignore_submodules_of: Option<Box<dyn Fn(&U) -> bool>>,
    /// Dimensions dropped from recorded shapes, typically batch and time.
    pub ignore_dims: Vec<usize>,
}

impl<U> Default for ExtractOptions<U> {
    fn default() -> Self {
        Self {
            model_name: "model".to_string(),
            ignore_submodules_of: None,
            ignore_dims: Vec::new(),
        }
    }
}

impl<U> ExtractOptions<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn ignore_submodules_of(mut self, predicate: impl Fn(&U) -> bool + 'static) -> Self {
        self.ignore_submodules_of = Some(Box::new(predicate));
        self
    }

    pub fn ignore_dims(mut self, dims: impl IntoIterator<Item = usize>) -> Self {
        self.ignore_dims = dims.into_iter().collect();
        self
    }
}

impl<U> std::fmt::Debug for ExtractOptions<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("model_name", &self.model_name)
            .field("ignore_submodules_of", &self.ignore_submodules_of.is_some())
            .field("ignore_dims", &self.ignore_dims)
            .finish()
    }
}

/// Traces `model` against `sample` and describes it as IR, converting every
/// traced unit with `map`.
///
/// The result has a synthesized `input` node shaped like `sample` and an
/// `output` node shaped like the value leaving the last unit, both without
/// `ignore_dims`. Subgraphs returned by `map` are inlined one level deep,
/// their members named `<unit>.<member>`. A unit or member whose name is
/// already taken, or is `input` or `output`, fails with
/// [`GraphError::DuplicateNode`].
pub fn extract_ir<M, F>(
    model: &M,
    mut map: F,
    sample: &Tensor,
    options: &ExtractOptions<M::Unit>,
) -> Result<IrGraph, GraphError>
where
    M: Traceable,
    F: FnMut(&M::Unit) -> IrNode,
{
    let model_name = if model.has_children() {
        None
    } else {
        Some(options.model_name.as_str())
    };

    let mut trace = model.trace(sample, model_name)?.ignore_tensors();
    if let Some(ignore) = &options.ignore_submodules_of {
        trace = trace.ignore_submodules_of(|unit| ignore(unit));
    }

    let roots = trace.graph.get_root();
    let [root] = roots[..] else {
        return Err(TopologyError::InputCount { found: roots.len() }.into());
    };

    let graph = &trace.graph;
    let mut nodes: IndexMap<String, IrNode> = IndexMap::new();
    let mut edges: Vec<(String, String)> = Vec::new();
    nodes.insert(
        "input".to_string(),
        IrNode::input(sample.shape().without_dims(&options.ignore_dims)?),
    );

    for (key, node) in graph.iter() {
        let Some(unit) = graph.elem(key) else {
            continue;
        };
        let name = node.name.as_str();
        let entry = match map(unit) {
            IrNode::Subgraph(subgraph) => inline_subgraph(name, subgraph, &mut nodes, &mut edges)?,
            mapped => {
                insert_unique(&mut nodes, name.to_string(), mapped)?;
                name.to_string()
            }
        };
        if key == root {
            edges.push(("input".to_string(), entry));
        }
    }

    for (key, node) in graph.iter() {
        for &target in node.outgoing.keys() {
            if let Some(target) = graph.name(target) {
                edges.push((node.name.clone(), target.to_string()));
            }
        }

        if node.is_sink() {
            let shape = trace
                .output_shape(key)
                .ok_or_else(|| GraphError::UnknownShape {
                    node: node.name.clone(),
                })?
                .without_dims(&options.ignore_dims)?;
            nodes.insert("output".to_string(), IrNode::output(shape));
            edges.push((node.name.clone(), "output".to_string()));
        }
    }

    let total = edges.len();
    let edges: Vec<(String, String)> = edges.into_iter().collect::<IndexSet<_>>().into_iter().collect();
    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        duplicates = total - edges.len(),
        "extracted IR graph"
    );

    Ok(IrGraph { nodes, edges })
}

/// Adds the members of `subgraph` under `name.` and returns the member the
/// graph input should connect to.
fn inline_subgraph(
    name: &str,
    subgraph: IrGraph,
    nodes: &mut IndexMap<String, IrNode>,
    edges: &mut Vec<(String, String)>,
) -> Result<String, GraphError> {
    let entry = if subgraph.nodes.contains_key("input") {
        "input"
    } else {
        subgraph.nodes.keys().next().ok_or(GraphError::Empty)?.as_str()
    };
    let entry = format!("{name}.{entry}");

    for (member, node) in subgraph.nodes {
        if matches!(node, IrNode::Subgraph(_)) {
            return Err(GraphError::NestedSubgraph {
                node: name.to_string(),
                member,
            });
        }
        insert_unique(nodes, format!("{name}.{member}"), node)?;
    }
    for (src, dst) in subgraph.edges {
        edges.push((format!("{name}.{src}"), format!("{name}.{dst}")));
    }
    Ok(entry)
}

fn insert_unique(nodes: &mut IndexMap<String, IrNode>, name: String, node: IrNode) -> Result<(), GraphError> {
    if RESERVED.contains(&name.as_str()) || nodes.contains_key(&name) {
        return Err(GraphError::DuplicateNode(name));
    }
    nodes.insert(name, node);
    Ok(())
}
