use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::IrGraph;
use crate::error::GraphError;

/// Reads an IR graph stored as JSON.
pub fn read(path: impl AsRef<Path>) -> Result<IrGraph, GraphError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let graph: IrGraph = serde_json::from_reader(reader)?;
    debug!(
        path = %path.display(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "read IR graph"
    );
    Ok(graph)
}

pub fn write(path: impl AsRef<Path>, graph: &IrGraph) -> Result<(), GraphError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, graph)?;
    writer.flush()?;
    debug!(path = %path.display(), nodes = graph.nodes.len(), "wrote IR graph");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrNode, Leaf};
    use crate::tensor::Tensor;

    #[test]
    fn test_write_then_read() {
        let subgraph = IrGraph::new()
            .with_node("input", IrNode::input([2]))
            .with_node("lif", Leaf::new("leaky").with_param("beta", Tensor::scalar(0.9)))
            .with_node("output", IrNode::output([2]))
            .with_edge("input", "lif")
            .with_edge("lif", "output");
        let weight = Tensor::new([2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let graph = IrGraph::new()
            .with_node("input", IrNode::input([2]))
            .with_node("affine", Leaf::new("affine").with_param("weight", weight))
            .with_node("block", subgraph)
            .with_node("output", IrNode::output([2]))
            .with_edge("input", "affine")
            .with_edge("affine", "block")
            .with_edge("block", "output");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        write(&path, &graph).unwrap();

        assert_eq!(read(&path).unwrap(), graph);
    }

    #[test]
    fn test_read_rejects_mismatched_tensor() {
        let weight = Tensor::new([2, 3], vec![0.5; 6]).unwrap();
        let graph = IrGraph::new()
            .with_node("input", IrNode::input([3]))
            .with_node("affine", Leaf::new("affine").with_param("weight", weight))
            .with_edge("input", "affine");

        // Leave a single element behind a [2, 3] shape
        let mut json = serde_json::to_value(&graph).unwrap();
        *json
            .pointer_mut("/nodes/affine/params/weight/data")
            .unwrap() = serde_json::json!([1.0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(read(&path), Err(GraphError::Json(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read(dir.path().join("missing.json")),
            Err(GraphError::Io(_))
        ));
    }
}
