//! Stateful execution of a [`Graph`] of units.

mod state;


pub use state::ExecutionState;

use arrayvec::ArrayVec;
use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

use crate::error::GraphError;
use crate::graph::{Graph, NodeKey, StateSpec, Unit, MAX_UNIT_ARGS};
use crate::tensor::Tensor;

/// What `forward` returns when no declared output node produced a value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Use the value of the second-to-last node in the execution order and
    /// log a warning.
    #[default]
    PreviousNode,
    /// Fail with [`GraphError::MissingOutput`].
    Strict,
}

#[derive(Clone, Debug, Default)]
pub struct ExecutorConfig {
    pub output_policy: OutputPolicy,
}

impl ExecutorConfig {
    pub fn strict() -> Self {
        Self {
            output_policy: OutputPolicy::Strict,
        }
    }
}

/// Owns the units of a graph and runs forward passes over them in a fixed
/// execution order.
#[derive(Debug)]
pub struct GraphExecutor {
    graph: Graph<()>,
    units: SecondaryMap<NodeKey, Box<dyn Unit>>,
    state_specs: SecondaryMap<NodeKey, StateSpec>,
    execution_order: Vec<NodeKey>,
    outputs: Vec<NodeKey>,
    config: ExecutorConfig,
}

impl GraphExecutor {
    pub fn new(graph: Graph<Box<dyn Unit>>) -> Result<Self, GraphError> {
        Self::with_config(graph, ExecutorConfig::default())
    }

    /// Resolves the execution order and adopts every unit in `graph`.
    pub fn with_config(
        graph: Graph<Box<dyn Unit>>,
        config: ExecutorConfig,
    ) -> Result<Self, GraphError> {
        if graph.is_empty() {
            return Err(GraphError::Empty);
        }
        let execution_order = graph.execution_order()?;

        let (graph, units) = graph.into_parts();
        let state_specs: SecondaryMap<NodeKey, StateSpec> = units
            .iter()
            .map(|(key, unit)| (key, unit.state_spec()))
            .collect();
        let outputs = graph
            .outputs
            .iter()
            .filter_map(|name| graph.key(name))
            .collect();

        debug!(
            nodes = graph.len(),
            ordered = execution_order.len(),
            units = units.len(),
            stateful = state_specs.values().filter(|spec| spec.is_stateful()).count(),
            "instantiated graph executor"
        );

        Ok(Self {
            graph,
            units,
            state_specs,
            execution_order,
            outputs,
            config,
        })
    }

    /// Runs one forward pass.
    ///
    /// `data` is delivered to the first unit in the execution order. Every
    /// unit receives the sum of its predecessors' values: from this pass when
    /// already computed, otherwise from `old_state`, which is how feedback
    /// edges carry values across calls. Stateful units additionally receive
    /// the hidden values they returned in `old_state`. Nodes without a unit
    /// are skipped.
    ///
    /// Returns the output and the state to pass into the next call. Omitting
    /// `old_state` starts from an empty state.
    pub fn forward(
        &mut self,
        data: &Tensor,
        old_state: Option<&ExecutionState>,
    ) -> Result<(Tensor, ExecutionState), GraphError> {
        let fresh = ExecutionState::default();
        let old_state = old_state.unwrap_or(&fresh);
        let mut new_state = ExecutionState::default();
        let mut data = Some(data);

        for &key in &self.execution_order {
            let Some(node) = self.graph.node(key) else {
                continue;
            };
            let name = node.name.as_str();
            let Some(unit) = self.units.get_mut(key) else {
                trace!(node = name, "skipping unmapped node");
                continue;
            };

            let mut contributions: Vec<&Tensor> = Vec::new();
            if let Some(data) = data.take() {
                contributions.push(data);
            }
            for source in node.incoming.keys() {
                let Some(source_name) = self.graph.name(*source) else {
                    continue;
                };
                if let Some(value) = new_state
                    .cache
                    .get(source_name)
                    .or_else(|| old_state.cache.get(source_name))
                {
                    contributions.push(value);
                }
            }

            let Some(input) = Tensor::sum_all(&contributions)? else {
                return Err(GraphError::NoInputs {
                    node: name.to_string(),
                });
            };

            let spec = self
                .state_specs
                .get(key)
                .copied()
                .unwrap_or(StateSpec::Stateless);
            let hidden = match spec {
                StateSpec::Stateless => &[][..],
                _ => old_state.hidden(name).unwrap_or(&[]),
            };

            let count = 1 + hidden.len();
            if count > MAX_UNIT_ARGS {
                return Err(GraphError::TooManyArguments {
                    node: name.to_string(),
                    count,
                    max: MAX_UNIT_ARGS,
                });
            }
            let mut args = ArrayVec::<Tensor, MAX_UNIT_ARGS>::new();
            args.push(input);
            args.extend(hidden.iter().cloned());

            trace!(
                node = name,
                inputs = contributions.len(),
                hidden = hidden.len(),
                "applying unit"
            );
            let mut result = unit.forward(&args).map_err(|source| GraphError::Unit {
                node: name.to_string(),
                source,
            })?;
            if result.is_empty() {
                return Err(GraphError::EmptyResult {
                    node: name.to_string(),
                });
            }

            let output = match spec {
                StateSpec::Stateless => result.swap_remove(0),
                StateSpec::Trailing => {
                    let output = result.remove(0);
                    new_state.hidden.insert(name.to_string(), result);
                    output
                }
                StateSpec::Whole => {
                    let output = result[0].clone();
                    new_state.hidden.insert(name.to_string(), result);
                    output
                }
            };
            new_state.cache.insert(name.to_string(), output);
        }

        let output = self.resolve_output(&new_state)?;
        Ok((output, new_state))
    }

    /// Feeds `inputs` one step at a time, threading the state through.
    pub fn forward_sequence(
        &mut self,
        inputs: &[Tensor],
        state: Option<ExecutionState>,
    ) -> Result<(Vec<Tensor>, ExecutionState), GraphError> {
        let mut state = state.unwrap_or_default();
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            let (output, next) = self.forward(input, Some(&state))?;
            outputs.push(output);
            state = next;
        }
        Ok((outputs, state))
    }

    fn resolve_output(&self, state: &ExecutionState) -> Result<Tensor, GraphError> {
        let cached = |key: NodeKey| self.graph.name(key).and_then(|name| state.cache.get(name));

        let found = if self.outputs.is_empty() {
            self.execution_order.last().and_then(|&key| cached(key))
        } else {
            self.execution_order
                .iter()
                .rev()
                .filter(|key| self.outputs.contains(key))
                .find_map(|&key| cached(key))
        };
        if let Some(output) = found {
            return Ok(output.clone());
        }

        match self.config.output_policy {
            OutputPolicy::Strict => Err(GraphError::MissingOutput),
            OutputPolicy::PreviousNode => {
                let fallback = self
                    .execution_order
                    .len()
                    .checked_sub(2)
                    .map(|index| self.execution_order[index]);
                let Some((key, value)) =
                    fallback.and_then(|key| cached(key).map(|value| (key, value)))
                else {
                    return Err(GraphError::MissingOutput);
                };
                warn!(
                    node = self.graph.name(key).unwrap_or_default(),
                    "no output node produced a value, using the second-to-last node"
                );
                Ok(value.clone())
            }
        }
    }

    /// Node names in execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .filter_map(|&key| self.graph.name(key))
            .collect()
    }

    pub fn is_stateful(&self, name: &str) -> bool {
        self.graph
            .key(name)
            .and_then(|key| self.state_specs.get(key))
            .is_some_and(|spec| spec.is_stateful())
    }

    pub fn unit(&self, name: &str) -> Option<&dyn Unit> {
        let key = self.graph.key(name)?;
        self.units.get(key).map(|unit| &**unit)
    }

    /// Topology of the adopted graph; nodes with a unit carry a `()` marker.
    pub fn graph(&self) -> &Graph<()> {
        &self.graph
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}
