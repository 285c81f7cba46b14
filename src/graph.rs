//! Walks over the computation graph recorded by tensor input lists.
//!
//! Nodes are identified by [`TensorId`], so a tensor that feeds several
//! consumers is visited once.
use crate::any_tensor::AnyTensor;
use crate::tensor::TensorId;
use std::collections::HashSet;

/// Every node `root` depends on, including `root`, with each node placed after
/// all of its inputs. Inputs are visited in recorded order.
pub fn topo_order(root: &AnyTensor) -> Vec<AnyTensor> {
    let mut order = Vec::new();
    let mut visited: HashSet<TensorId> = HashSet::new();
    let mut stack = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        let inputs = node.inputs().to_vec();
        stack.push((node, true));
        for input in inputs.into_iter().rev() {
            if !visited.contains(&input.id()) {
                stack.push((input, false));
            }
        }
    }
    order
}

/// The leaves `root` was computed from, in traversal order.
pub fn leaves(root: &AnyTensor) -> Vec<AnyTensor> {
    topo_order(root)
        .into_iter()
        .filter(|x| x.is_leaf())
        .collect()
}

pub fn node_count(root: &AnyTensor) -> usize {
    topo_order(root).len()
}
