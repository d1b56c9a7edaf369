//! Reference-counted 2-D tensor node of the computational graph

use super::BackwardOp;
use ndarray::Array2;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

struct Node {
    id: usize,
    data: RefCell<Array2<f32>>,
    grad: RefCell<Option<Array2<f32>>>,
    requires_grad: Cell<bool>,
    backward_op: Option<Rc<dyn BackwardOp>>,
}

/// A matrix-valued node with optional gradient tracking.
///
/// Cloning a `Tensor` is cheap and aliases the same node: parameters handed to an
/// optimizer and the ones used in a forward pass are the same object.
#[derive(Clone)]
pub struct Tensor {
    node: Rc<Node>,
}

impl Tensor {
    /// Create a leaf tensor
    pub fn new(data: Array2<f32>, requires_grad: bool) -> Self {
        Self {
            node: Rc::new(Node {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                data: RefCell::new(data),
                grad: RefCell::new(None),
                requires_grad: Cell::new(requires_grad),
                backward_op: None,
            }),
        }
    }

    /// Create the output of a recorded operation
    pub(crate) fn from_op(data: Array2<f32>, op: Rc<dyn BackwardOp>) -> Self {
        Self {
            node: Rc::new(Node {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                data: RefCell::new(data),
                grad: RefCell::new(None),
                requires_grad: Cell::new(true),
                backward_op: Some(op),
            }),
        }
    }

    /// Leaf tensor that never receives gradients
    pub fn constant(data: Array2<f32>) -> Self {
        Self::new(data, false)
    }

    /// Row-major construction from a flat buffer
    ///
    /// # Panics
    ///
    /// If `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>, requires_grad: bool) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "buffer of {} values cannot form a {rows}x{cols} tensor",
            data.len()
        );
        let array = Array2::from_shape_vec((rows, cols), data)
            .unwrap_or_else(|e| panic!("invalid {rows}x{cols} buffer: {e}"));
        Self::new(array, requires_grad)
    }

    pub fn zeros(rows: usize, cols: usize, requires_grad: bool) -> Self {
        Self::new(Array2::zeros((rows, cols)), requires_grad)
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::constant(Array2::ones((rows, cols)))
    }

    /// 1x1 constant
    pub fn scalar(value: f32) -> Self {
        Self::constant(Array2::from_elem((1, 1), value))
    }

    /// Unique node id, stable for the lifetime of the node
    pub fn id(&self) -> usize {
        self.node.id
    }

    pub fn data(&self) -> Ref<'_, Array2<f32>> {
        self.node.data.borrow()
    }

    /// Mutable access for in-place parameter updates.
    ///
    /// Only meaningful on leaves: recorded operations keep their own copies of
    /// whatever they need for the backward pass.
    pub fn data_mut(&self) -> RefMut<'_, Array2<f32>> {
        self.node.data.borrow_mut()
    }

    pub fn to_array(&self) -> Array2<f32> {
        self.data().clone()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data().dim()
    }

    pub fn rows(&self) -> usize {
        self.shape().0
    }

    pub fn cols(&self) -> usize {
        self.shape().1
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of a 1x1 tensor
    ///
    /// # Panics
    ///
    /// If the tensor is not 1x1.
    pub fn item(&self) -> f32 {
        let data = self.data();
        assert_eq!(data.dim(), (1, 1), "item() requires a 1x1 tensor");
        data[[0, 0]]
    }

    pub fn requires_grad(&self) -> bool {
        self.node.requires_grad.get()
    }

    /// Toggle gradient tracking on a leaf (used to freeze parameters)
    ///
    /// # Panics
    ///
    /// If called on a non-leaf tensor.
    pub fn set_requires_grad(&self, requires_grad: bool) {
        assert!(self.is_leaf(), "requires_grad can only be changed on leaves");
        self.node.requires_grad.set(requires_grad);
    }

    pub fn is_leaf(&self) -> bool {
        self.node.backward_op.is_none()
    }

    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.node.backward_op.clone()
    }

    /// Accumulated leaf gradient
    pub fn grad(&self) -> Option<Array2<f32>> {
        self.node.grad.borrow().clone()
    }

    pub fn set_grad(&self, grad: Array2<f32>) {
        *self.node.grad.borrow_mut() = Some(grad);
    }

    pub fn accumulate_grad(&self, grad: &Array2<f32>) {
        let mut cell = self.node.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += grad,
            None => *cell = Some(grad.clone()),
        }
    }

    pub fn zero_grad(&self) {
        *self.node.grad.borrow_mut() = None;
    }

    /// Copy of the data as a new leaf outside of any graph
    pub fn detach(&self) -> Tensor {
        Tensor::constant(self.to_array())
    }

    /// True when every element is finite
    pub fn is_finite(&self) -> bool {
        self.data().iter().all(|v| v.is_finite())
    }

    /// Whether two handles refer to the same node
    pub fn same_node(&self, other: &Tensor) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.shape();
        f.debug_struct("Tensor")
            .field("id", &self.id())
            .field("shape", &(rows, cols))
            .field("requires_grad", &self.requires_grad())
            .field(
                "op",
                &self.node.backward_op.as_ref().map(|op| op.name()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_leaf_properties() {
        let t = Tensor::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0], true);
        assert!(t.is_leaf());
        assert!(t.requires_grad());
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.data()[[1, 0]], 3.0);
    }

    #[test]
    fn test_clone_aliases_node() {
        let t = Tensor::zeros(1, 3, true);
        let alias = t.clone();
        alias.data_mut()[[0, 1]] = 5.0;
        assert_eq!(t.data()[[0, 1]], 5.0);
        assert!(t.same_node(&alias));
        assert_eq!(t.id(), alias.id());
    }

    #[test]
    fn test_grad_accumulation() {
        let t = Tensor::zeros(1, 2, true);
        t.accumulate_grad(&array![[1.0, 2.0]]);
        t.accumulate_grad(&array![[0.5, 0.5]]);
        assert_eq!(t.grad().unwrap(), array![[1.5, 2.5]]);
        t.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    fn test_detach_is_new_constant() {
        let t = Tensor::from_vec(1, 1, vec![2.0], true);
        let d = t.detach();
        assert!(!d.requires_grad());
        assert!(!d.same_node(&t));
        assert_eq!(d.item(), 2.0);
    }

    #[test]
    fn test_is_finite() {
        assert!(Tensor::scalar(1.0).is_finite());
        assert!(!Tensor::scalar(f32::NAN).is_finite());
        assert!(!Tensor::scalar(f32::INFINITY).is_finite());
    }

    #[test]
    #[should_panic(expected = "cannot form")]
    fn test_from_vec_length_mismatch_panics() {
        let _ = Tensor::from_vec(2, 2, vec![1.0], false);
    }
}
