use crate::any_tensor::AnyTensor;
use crate::backends::Backend;
use crate::op_kind::BinaryOp;
use crate::tensor::{Tensor, TensorError};
use crate::tensor_rank::Rank;

/// Checks that two tensors can be combined elementwise. Shapes must be equal;
/// there is no broadcasting.
pub fn check_binary_compatible<B: Backend, R: Rank>(
    left: &Tensor<B, R>,
    right: &Tensor<B, R>,
) -> Result<(), TensorError> {
    if left.dtype() != right.dtype() {
        return Err(TensorError::DTypeMismatch(left.dtype(), right.dtype()));
    }
    for x in [left, right] {
        if !x.is_materialized() {
            return Err(TensorError::MissingData(x.id()));
        }
    }
    if left.shape() != right.shape() {
        return Err(TensorError::ShapeMismatch(
            left.shape().to_vec(),
            right.shape().to_vec(),
        ));
    }
    Ok(())
}

impl<B: Backend, R: Rank> Tensor<B, R>
where
    Tensor<B, R>: Into<AnyTensor>,
{
    /// Computes `op(left, right)` into a new node whose inputs are `[left, right]`.
    pub fn binary(op: BinaryOp, left: &Self, right: &Self) -> Result<Self, TensorError> {
        check_binary_compatible(left, right)?;
        log::debug!("{op}({}, {}) on {}", left.id(), right.id(), B::KIND);
        let storage = B::elementwise_binary(op, left.dtype(), left.storage(), right.storage())?;
        Tensor::from_op(
            storage,
            left.shape().clone(),
            left.dtype(),
            op.into(),
            left.requires_grad() || right.requires_grad(),
            vec![left.to_any(), right.to_any()],
        )
    }

    pub fn add(&self, other: &Self) -> Result<Self, TensorError> {
        Self::binary(BinaryOp::Add, self, other)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, TensorError> {
        Self::binary(BinaryOp::Sub, self, other)
    }

    pub fn mul(&self, other: &Self) -> Result<Self, TensorError> {
        Self::binary(BinaryOp::Mul, self, other)
    }

    pub fn max(&self, other: &Self) -> Result<Self, TensorError> {
        Self::binary(BinaryOp::Max, self, other)
    }

    pub fn min(&self, other: &Self) -> Result<Self, TensorError> {
        Self::binary(BinaryOp::Min, self, other)
    }
}

macro_rules! impl_std_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<B: Backend, R: Rank> std::ops::$trait for &Tensor<B, R>
        where
            Tensor<B, R>: Into<AnyTensor>,
        {
            type Output = Result<Tensor<B, R>, TensorError>;
            fn $method(self, rhs: Self) -> Self::Output {
                Tensor::binary($op, self, rhs)
            }
        }
    };
}

impl_std_binary_op!(Add, add, BinaryOp::Add);
impl_std_binary_op!(Sub, sub, BinaryOp::Sub);
impl_std_binary_op!(Mul, mul, BinaryOp::Mul);
