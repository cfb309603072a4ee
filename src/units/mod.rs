//! Reference units and the IR mapping for them.

mod affine;
mod identity;
mod integrator;
mod leaky;

pub use affine::Affine;
pub use identity::Identity;
pub use integrator::Integrator;
pub use leaky::Leaky;

use tracing::warn;

use crate::graph::Unit;
use crate::ir::IrNode;

/// Maps catalog leaves (`affine`, `leaky`, `integrator`) to units. Anything
/// else, including boundary markers, is left to the caller's defaults.
pub fn from_ir(node: &IrNode) -> Option<Box<dyn Unit>> {
    let leaf = node.as_leaf()?;
    let unit: Result<Box<dyn Unit>, _> = match leaf.kind.as_str() {
        "affine" => Affine::from_leaf(leaf).map(|unit| Box::new(unit) as Box<dyn Unit>),
        "leaky" => Leaky::from_leaf(leaf).map(|unit| Box::new(unit) as Box<dyn Unit>),
        "integrator" => Ok(Box::new(Integrator::new()) as Box<dyn Unit>),
        _ => return None,
    };

    match unit {
        Ok(unit) => Some(unit),
        Err(err) => {
            warn!(kind = %leaf.kind, error = %err, "could not build unit from leaf");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StateSpec;
    use crate::ir::Leaf;

    #[test]
    fn test_catalog_lookup() {
        let leaky = from_ir(&Leaky::new(0.9, 1.0).to_ir()).unwrap();
        assert_eq!(leaky.state_spec(), StateSpec::Trailing);

        let integrator = from_ir(&Integrator::new().to_ir()).unwrap();
        assert_eq!(integrator.state_spec(), StateSpec::Whole);

        assert!(from_ir(&IrNode::input([1])).is_none());
        assert!(from_ir(&Leaf::new("conv2d").into()).is_none());
    }

    #[test]
    fn test_incomplete_leaf_is_unmapped() {
        assert!(from_ir(&Leaf::new("affine").into()).is_none());
    }
}
