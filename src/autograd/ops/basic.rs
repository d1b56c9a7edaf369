//! Basic autograd operations: elementwise arithmetic, broadcasting and reductions

use super::{assert_same_shape, record};
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{Array2, Axis};

/// Add two tensors of the same shape
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape("add", a, b);
    let data = &*a.data() + &*b.data();
    record(data, &[a, b], || AddBackward {
        a: a.clone(),
        b: b.clone(),
    })
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for AddBackward {
    fn name(&self) -> &'static str {
        "add"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(grad.clone()), Some(grad.clone())]
    }
}

/// Subtract `b` from `a`
pub fn sub(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape("sub", a, b);
    let data = &*a.data() - &*b.data();
    record(data, &[a, b], || SubBackward {
        a: a.clone(),
        b: b.clone(),
    })
}

struct SubBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for SubBackward {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self, grad: &Tensor, needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(grad.clone()), needs[1].then(|| neg(grad))]
    }
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape("mul", a, b);
    let data = &*a.data() * &*b.data();
    record(data, &[a, b], || MulBackward {
        a: a.clone(),
        b: b.clone(),
    })
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for MulBackward {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self, grad: &Tensor, needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![
            needs[0].then(|| mul(grad, &self.b)),
            needs[1].then(|| mul(grad, &self.a)),
        ]
    }
}

/// Divide `a` by `b` element-wise
pub fn div(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape("div", a, b);
    let data = &*a.data() / &*b.data();
    record(data, &[a, b], || DivBackward {
        a: a.clone(),
        b: b.clone(),
    })
}

struct DivBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for DivBackward {
    fn name(&self) -> &'static str {
        "div"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self, grad: &Tensor, needs: &[bool]) -> Vec<Option<Tensor>> {
        // d(a/b)/db = -a / b^2
        vec![
            needs[0].then(|| div(grad, &self.b)),
            needs[1].then(|| neg(&div(&mul(grad, &self.a), &mul(&self.b, &self.b)))),
        ]
    }
}

/// Negate every element
pub fn neg(a: &Tensor) -> Tensor {
    scale(a, -1.0)
}

/// Multiply by a constant factor
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = &*a.data() * factor;
    record(data, &[a], || ScaleBackward {
        a: a.clone(),
        factor,
    })
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
}

impl BackwardOp for ScaleBackward {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(scale(grad, self.factor))]
    }
}

/// Add a constant to every element
pub fn add_scalar(a: &Tensor, value: f32) -> Tensor {
    let data = &*a.data() + value;
    record(data, &[a], || AddScalarBackward { a: a.clone() })
}

struct AddScalarBackward {
    a: Tensor,
}

impl BackwardOp for AddScalarBackward {
    fn name(&self) -> &'static str {
        "add_scalar"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(grad.clone())]
    }
}

/// Broadcast a `1 x c`, `r x 1` or `1 x 1` tensor to `rows x cols`
///
/// # Panics
///
/// If the shape cannot be broadcast.
pub fn broadcast_to(a: &Tensor, rows: usize, cols: usize) -> Tensor {
    if a.shape() == (rows, cols) {
        return a.clone();
    }
    let data = a
        .data()
        .broadcast((rows, cols))
        .unwrap_or_else(|| {
            panic!(
                "broadcast_to: cannot broadcast {:?} to ({rows}, {cols})",
                a.shape()
            )
        })
        .to_owned();
    record(data, &[a], || BroadcastBackward { a: a.clone() })
}

struct BroadcastBackward {
    a: Tensor,
}

impl BackwardOp for BroadcastBackward {
    fn name(&self) -> &'static str {
        "broadcast_to"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        let (rows, cols) = self.a.shape();
        let mut reduced = grad.clone();
        if rows == 1 && reduced.rows() != 1 {
            reduced = sum_rows(&reduced);
        }
        if cols == 1 && reduced.cols() != 1 {
            reduced = sum_cols(&reduced);
        }
        vec![Some(reduced)]
    }
}

/// Sum of all elements as a `1 x 1` tensor
pub fn sum(a: &Tensor) -> Tensor {
    let total = a.data().sum();
    record(Array2::from_elem((1, 1), total), &[a], || SumBackward {
        a: a.clone(),
    })
}

struct SumBackward {
    a: Tensor,
}

impl BackwardOp for SumBackward {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        let (rows, cols) = self.a.shape();
        vec![Some(broadcast_to(grad, rows, cols))]
    }
}

/// Column sums as a `1 x cols` tensor (reduces over rows)
pub fn sum_rows(a: &Tensor) -> Tensor {
    let data = a.data().sum_axis(Axis(0)).insert_axis(Axis(0));
    record(data, &[a], || SumAxisBackward { a: a.clone() })
}

/// Row sums as a `rows x 1` tensor (reduces over columns)
pub fn sum_cols(a: &Tensor) -> Tensor {
    let data = a.data().sum_axis(Axis(1)).insert_axis(Axis(1));
    record(data, &[a], || SumAxisBackward { a: a.clone() })
}

struct SumAxisBackward {
    a: Tensor,
}

impl BackwardOp for SumAxisBackward {
    fn name(&self) -> &'static str {
        "sum_axis"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        let (rows, cols) = self.a.shape();
        vec![Some(broadcast_to(grad, rows, cols))]
    }
}

/// Mean of all elements as a `1 x 1` tensor
pub fn mean(a: &Tensor) -> Tensor {
    let n = a.len().max(1) as f32;
    scale(&sum(a), 1.0 / n)
}
