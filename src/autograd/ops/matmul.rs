//! Matrix multiplication autograd operations

use crate::autograd::ops::record;
use crate::autograd::{BackwardOp, Tensor};

/// Matrix product `a (m x k) * b (k x n) -> (m x n)`
///
/// # Panics
///
/// If the inner dimensions disagree.
pub fn matmul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(
        a.cols(),
        b.rows(),
        "matmul: inner dimensions differ, {:?} x {:?}",
        a.shape(),
        b.shape()
    );
    let data = a.data().dot(&*b.data());
    record(data, &[a, b], || MatmulBackward {
        a: a.clone(),
        b: b.clone(),
    })
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
}

impl BackwardOp for MatmulBackward {
    fn name(&self) -> &'static str {
        "matmul"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self, grad: &Tensor, needs: &[bool]) -> Vec<Option<Tensor>> {
        // dL/dA = dL/dC * B^T, dL/dB = A^T * dL/dC
        vec![
            needs[0].then(|| matmul(grad, &transpose(&self.b))),
            needs[1].then(|| matmul(&transpose(&self.a), grad)),
        ]
    }
}

/// Transpose a matrix
pub fn transpose(a: &Tensor) -> Tensor {
    let data = a.data().t().to_owned();
    record(data, &[a], || TransposeBackward { a: a.clone() })
}

struct TransposeBackward {
    a: Tensor,
}

impl BackwardOp for TransposeBackward {
    fn name(&self) -> &'static str {
        "transpose"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(transpose(grad))]
    }
}
