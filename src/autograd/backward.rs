//! Reverse-mode traversal of the computational graph
//!
//! Backward rules are expressed with the same differentiable operations as the
//! forward pass, so a gradient is itself a tensor in the graph. With
//! `create_graph = true` the returned gradients stay attached and can be
//! differentiated again, which is what lets an outer loss see through inner-loop
//! gradient steps.

use super::ops::add;
use super::Tensor;
use ndarray::Array2;
use std::collections::{HashMap, HashSet};

/// A recorded operation that can map an output gradient to input gradients
pub trait BackwardOp {
    /// Operation name, for debugging
    fn name(&self) -> &'static str;

    /// Inputs of the operation, in the order used by [`BackwardOp::backward`]
    fn inputs(&self) -> Vec<Tensor>;

    /// Gradients w.r.t. each input; `needs[i]` is false when input `i` needs none
    fn backward(&self, grad_output: &Tensor, needs: &[bool]) -> Vec<Option<Tensor>>;
}

/// Nodes reachable from `root` through gradient-tracking edges, inputs first
fn topo_order(root: &Tensor) -> Vec<Tensor> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((tensor, expanded)) = stack.pop() {
        if expanded {
            order.push(tensor);
            continue;
        }
        if !visited.insert(tensor.id()) {
            continue;
        }
        stack.push((tensor.clone(), true));
        if let Some(op) = tensor.backward_op() {
            for input in op.inputs() {
                if input.requires_grad() && !visited.contains(&input.id()) {
                    stack.push((input, false));
                }
            }
        }
    }

    order
}

/// Propagate gradients from `root` to every node matching `is_target`
///
/// Only nodes lying on a path between a target and the root are visited.
fn propagate<F>(
    root: &Tensor,
    grad_output: Tensor,
    is_target: F,
    create_graph: bool,
) -> HashMap<usize, (Tensor, Tensor)>
where
    F: Fn(&Tensor) -> bool,
{
    let order = topo_order(root);

    let mut reaches = HashSet::new();
    for tensor in &order {
        let on_path = is_target(tensor)
            || tensor.backward_op().is_some_and(|op| {
                op.inputs().iter().any(|input| reaches.contains(&input.id()))
            });
        if on_path {
            reaches.insert(tensor.id());
        }
    }

    let mut results = HashMap::new();
    if !reaches.contains(&root.id()) {
        return results;
    }

    let mut pending: HashMap<usize, Tensor> = HashMap::new();
    pending.insert(root.id(), grad_output);

    for tensor in order.iter().rev() {
        let Some(grad) = pending.remove(&tensor.id()) else {
            continue;
        };
        if is_target(tensor) {
            results.insert(tensor.id(), (tensor.clone(), grad.clone()));
        }
        let Some(op) = tensor.backward_op() else {
            continue;
        };

        let inputs = op.inputs();
        let needs: Vec<bool> = inputs
            .iter()
            .map(|input| input.requires_grad() && reaches.contains(&input.id()))
            .collect();
        if !needs.iter().any(|&n| n) {
            continue;
        }

        let input_grads = op.backward(&grad, &needs);
        for ((input, need), input_grad) in inputs.iter().zip(&needs).zip(input_grads) {
            let Some(input_grad) = input_grad.filter(|_| *need) else {
                continue;
            };
            let input_grad = if create_graph {
                input_grad
            } else {
                input_grad.detach()
            };
            let merged = match pending.remove(&input.id()) {
                Some(previous) if create_graph => add(&previous, &input_grad),
                Some(previous) => add(&previous, &input_grad).detach(),
                None => input_grad,
            };
            pending.insert(input.id(), merged);
        }
    }

    results
}

/// Gradients of `output` w.r.t. `inputs`
///
/// The output is seeded with ones (a scalar loss is the usual case). Inputs the
/// output does not depend on get a zero gradient. With `create_graph` the results
/// remain part of the graph (second-order differentiation); otherwise they are
/// detached constants.
pub fn grad(output: &Tensor, inputs: &[Tensor], create_graph: bool) -> Vec<Tensor> {
    let ids: HashSet<usize> = inputs.iter().map(Tensor::id).collect();
    let (rows, cols) = output.shape();
    let results = propagate(
        output,
        Tensor::ones(rows, cols),
        |t| ids.contains(&t.id()),
        create_graph,
    );

    inputs
        .iter()
        .map(|input| {
            results
                .get(&input.id())
                .map(|(_, g)| g.clone())
                .unwrap_or_else(|| Tensor::zeros(input.rows(), input.cols(), false))
        })
        .collect()
}

/// Perform backward pass, accumulating into every gradient-tracking leaf
pub fn backward(tensor: &Tensor, grad_output: Option<Array2<f32>>) {
    let seed = match grad_output {
        Some(g) => Tensor::constant(g),
        None => {
            let (rows, cols) = tensor.shape();
            Tensor::ones(rows, cols)
        }
    };

    let results = propagate(tensor, seed, |t| t.is_leaf() && t.requires_grad(), false);
    for (leaf, g) in results.values() {
        leaf.accumulate_grad(&g.data());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::ops::{add, mul, scale, sum};

    #[test]
    fn test_backward_accumulates_into_leaves() {
        let a = Tensor::from_vec(1, 3, vec![1.0, 2.0, 3.0], true);
        let b = Tensor::from_vec(1, 3, vec![4.0, 5.0, 6.0], true);
        let loss = sum(&mul(&a, &b));
        backward(&loss, None);
        assert_eq!(a.grad().unwrap().row(0).to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(b.grad().unwrap().row(0).to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_shared_subexpression_accumulates() {
        // loss = sum(a + a) => d/da = 2
        let a = Tensor::from_vec(1, 2, vec![1.0, -1.0], true);
        let loss = sum(&add(&a, &a));
        backward(&loss, None);
        assert_eq!(a.grad().unwrap().row(0).to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_grad_of_unrelated_input_is_zero() {
        let a = Tensor::from_vec(1, 2, vec![1.0, 2.0], true);
        let b = Tensor::from_vec(1, 2, vec![3.0, 4.0], true);
        let loss = sum(&scale(&a, 2.0));
        let grads = grad(&loss, &[a.clone(), b.clone()], false);
        assert_eq!(grads[0].data().row(0).to_vec(), vec![2.0, 2.0]);
        assert_eq!(grads[1].data().row(0).to_vec(), vec![0.0, 0.0]);
        assert!(a.grad().is_none(), "grad() must not touch leaf cells");
    }

    #[test]
    fn test_grad_detached_without_create_graph() {
        let x = Tensor::from_vec(1, 1, vec![3.0], true);
        let y = sum(&mul(&x, &x));
        let g = grad(&y, &[x.clone()], false);
        assert!(!g[0].requires_grad());
        assert_eq!(g[0].item(), 6.0);
    }

    #[test]
    fn test_second_order_through_create_graph() {
        // y = x^3, dy/dx = 3x^2, d2y/dx2 = 6x
        let x = Tensor::from_vec(1, 1, vec![2.0], true);
        let y = sum(&mul(&mul(&x, &x), &x));
        let dy = grad(&y, &[x.clone()], true);
        assert!(dy[0].requires_grad());
        assert_eq!(dy[0].item(), 12.0);
        let d2y = grad(&sum(&dy[0]), &[x.clone()], false);
        assert_eq!(d2y[0].item(), 12.0);
    }

    #[test]
    fn test_grad_wrt_interior_node() {
        let x = Tensor::from_vec(1, 2, vec![1.0, 2.0], true);
        let h = scale(&x, 3.0);
        let loss = sum(&mul(&h, &h));
        let g = grad(&loss, &[h.clone()], false);
        // d/dh sum(h^2) = 2h = 6x
        assert_eq!(g[0].data().row(0).to_vec(), vec![6.0, 12.0]);
    }
}
