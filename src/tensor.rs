use crate::any_tensor::AnyTensor;
use crate::backends::graph::GraphError;
use crate::backends::host::{HostBufferError, HostElement, HostStorage};
use crate::backends::{Backend, BackendError, BackendKind, HostBackend};
use crate::dtype::DType;
use crate::op_kind::OpKind;
use crate::shape::Shape;
use crate::tensor_rank::{Rank, RankError};
use ndarray::Array;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    #[error("Operand dtypes differ: {0} vs {1}")]
    DTypeMismatch(DType, DType),
    #[error("Operand shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<u64>, Vec<u64>),
    #[error("Tensor {0} has no materialized data")]
    MissingData(TensorId),
    #[error("Tensor size overflows the address space")]
    SizeOverflow,
    #[error("Operation {op} expects {expected} inputs, got {actual}")]
    ArityMismatch {
        op: OpKind,
        expected: usize,
        actual: usize,
    },
    #[error("Expected a {0} rank {1} tensor, found a {2} rank {3} tensor")]
    VariantMismatch(BackendKind, usize, BackendKind, usize),
    #[error("Requested dtype {0}, but tensor has dtype {1}")]
    WrongDType(DType, DType),
    #[error(transparent)]
    RankError(#[from] RankError),
    #[error(transparent)]
    BackendError(#[from] BackendError),
    #[error(transparent)]
    HostBufferError(#[from] HostBufferError),
    #[error(transparent)]
    GraphError(#[from] GraphError),
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
}

/// Process-wide unique identity of a graph node.
#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct TensorId(u64);

impl TensorId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        TensorId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TensorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

struct TensorNode<B: Backend, R: Rank> {
    id: TensorId,
    storage: B::Storage,
    shape: Shape<R>,
    dtype: DType,
    op: OpKind,
    requires_grad: bool,
    name: Option<String>,
    num_elements: u64,
    byte_size: usize,
    inputs: Vec<AnyTensor>,
}

impl<B: Backend, R: Rank> Drop for TensorNode<B, R> {
    // Unlinks uniquely owned ancestors iteratively so long chains do not
    // recurse once per node.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.inputs);
        while let Some(input) = pending.pop() {
            pending.extend(input.into_detached_inputs());
        }
    }
}

/// A node of the computation graph.
///
/// Cloning produces another handle to the same node. Equality and hashing
/// follow node identity, never the stored values.
pub struct Tensor<B: Backend, R: Rank> {
    inner: Arc<TensorNode<B, R>>,
}

impl<B: Backend, R: Rank> Tensor<B, R> {
    /// A graph leaf holding user-provided storage.
    pub fn leaf(
        storage: B::Storage,
        shape: Shape<R>,
        dtype: DType,
        requires_grad: bool,
        name: Option<String>,
    ) -> Result<Self, TensorError> {
        Self::new_node(storage, shape, dtype, OpKind::Identity, requires_grad, name, vec![])
    }

    /// A node produced by `op` from `inputs`. The input count must match `op.arity()`.
    pub fn from_op(
        storage: B::Storage,
        shape: Shape<R>,
        dtype: DType,
        op: OpKind,
        requires_grad: bool,
        inputs: Vec<AnyTensor>,
    ) -> Result<Self, TensorError> {
        Self::new_node(storage, shape, dtype, op, requires_grad, None, inputs)
    }

    fn new_node(
        storage: B::Storage,
        shape: Shape<R>,
        dtype: DType,
        op: OpKind,
        requires_grad: bool,
        name: Option<String>,
        inputs: Vec<AnyTensor>,
    ) -> Result<Self, TensorError> {
        if inputs.len() != op.arity() {
            return Err(TensorError::ArityMismatch {
                op,
                expected: op.arity(),
                actual: inputs.len(),
            });
        }
        let num_elements = shape.num_elements().ok_or(TensorError::SizeOverflow)?;
        let byte_size = dtype
            .buffer_byte_len(num_elements)
            .ok_or(TensorError::SizeOverflow)?;
        B::check_storage(&storage, dtype, num_elements)?;
        let id = TensorId::next();
        log::trace!("new {} tensor {id}: {op} {dtype} {shape}", B::KIND);
        Ok(Self {
            inner: Arc::new(TensorNode {
                id,
                storage,
                shape,
                dtype,
                op,
                requires_grad,
                name,
                num_elements,
                byte_size,
                inputs,
            }),
        })
    }

    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    pub fn storage(&self) -> &B::Storage {
        &self.inner.storage
    }

    pub fn shape(&self) -> &Shape<R> {
        &self.inner.shape
    }

    pub fn rank(&self) -> usize {
        R::KNOWN_LEN
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    pub fn op(&self) -> OpKind {
        self.inner.op
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.requires_grad
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn inputs(&self) -> &[AnyTensor] {
        &self.inner.inputs
    }

    pub fn is_leaf(&self) -> bool {
        self.inner.inputs.is_empty()
    }

    pub fn is_materialized(&self) -> bool {
        B::is_materialized(&self.inner.storage)
    }

    pub fn num_elements(&self) -> u64 {
        self.inner.num_elements
    }

    pub fn byte_size(&self) -> usize {
        self.inner.byte_size
    }

    pub fn to_any(&self) -> AnyTensor
    where
        Self: Into<AnyTensor>,
    {
        self.clone().into()
    }

    /// Takes the inputs out of the node if this was its last handle.
    pub(crate) fn into_detached_inputs(self) -> Vec<AnyTensor> {
        match Arc::into_inner(self.inner) {
            Some(mut node) => std::mem::take(&mut node.inputs),
            None => vec![],
        }
    }
}

impl<B: HostBackend, R: Rank> Tensor<B, R> {
    pub fn from_values<T: HostElement>(values: &[T], shape: Shape<R>) -> Result<Self, TensorError> {
        Self::leaf(HostStorage::from_values(values)?, shape, T::DTYPE, false, None)
    }

    pub fn to_vec<T: HostElement>(&self) -> Result<Vec<T>, TensorError> {
        if T::DTYPE != self.dtype() {
            return Err(TensorError::WrongDType(T::DTYPE, self.dtype()));
        }
        let data = self
            .storage()
            .data()
            .ok_or(TensorError::MissingData(self.id()))?;
        Ok(data.to_typed_vec()?)
    }

    pub fn to_ndarray<T: HostElement>(&self) -> Result<Array<T, R::NDArrayDim>, TensorError> {
        let values = self.to_vec::<T>()?;
        Ok(Array::from_shape_vec(self.shape().to_ndarray_dim()?, values)?)
    }
}

impl<B: Backend, R: Rank> Clone for Tensor<B, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend, R: Rank> PartialEq for Tensor<B, R> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<B: Backend, R: Rank> Eq for Tensor<B, R> {}

impl<B: Backend, R: Rank> Hash for Tensor<B, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state)
    }
}

impl<B: Backend, R: Rank> Debug for Tensor<B, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.inner.id)
            .field("backend", &B::KIND)
            .field("op", &self.inner.op)
            .field("dtype", &self.inner.dtype)
            .field("shape", &self.inner.shape)
            .field("requires_grad", &self.inner.requires_grad)
            .field("name", &self.inner.name)
            .field(
                "inputs",
                &self.inner.inputs.iter().map(|x| x.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::cpu::Cpu;
    use crate::backends::host::HostBuffer;
    use typenum::{P1, P2};

    #[test]
    fn test_leaf_has_no_inputs() {
        let t = Tensor::<Cpu, P2>::leaf(
            HostStorage::from_values(&[1i32, 2, 3, 4, 5, 6]).unwrap(),
            Shape::new([2, 3]),
            DType::I32,
            true,
            Some("weights".to_string()),
        )
        .unwrap();
        assert!(t.inputs().is_empty());
        assert!(t.is_leaf());
        assert_eq!(t.op(), OpKind::Identity);
        assert_eq!(t.name(), Some("weights"));
        assert!(t.requires_grad());
        assert_eq!(t.num_elements(), 6);
        assert_eq!(t.byte_size(), 24);
        assert_eq!(t.rank(), 2);
    }

    #[test]
    fn test_storage_size_must_match() {
        let err = Tensor::<Cpu, P1>::leaf(
            HostStorage::from_values(&[1.0f32, 2.0, 3.0]).unwrap(),
            Shape::new([2]),
            DType::F32,
            false,
            None,
        );
        assert!(matches!(
            err,
            Err(TensorError::BackendError(BackendError::StorageSizeMismatch {
                expected: 8,
                actual: 12
            }))
        ));
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let err = Tensor::<Cpu, P2>::leaf(
            HostStorage::unmaterialized(),
            Shape::new([u64::MAX, 2]),
            DType::F32,
            false,
            None,
        );
        assert!(matches!(err, Err(TensorError::SizeOverflow)));

        // The element count fits in u64 but the byte length does not.
        let err = Tensor::<Cpu, P1>::leaf(
            HostStorage::unmaterialized(),
            Shape::new([u64::MAX / 4]),
            DType::F64,
            false,
            None,
        );
        assert!(matches!(err, Err(TensorError::SizeOverflow)));
    }

    #[test]
    fn test_dropping_long_chain() {
        let one = Tensor::<Cpu, P1>::from_values(&[1i32], Shape::new([1])).unwrap();
        let mut x = one.clone();
        for _ in 0..100_000 {
            x = x.add(&one).unwrap();
        }
        assert_eq!(x.to_vec::<i32>().unwrap(), vec![100_001]);
        drop(x);
        assert_eq!(one.to_vec::<i32>().unwrap(), vec![1]);
    }

    #[test]
    fn test_shared_ancestor_survives_drop() {
        let one = Tensor::<Cpu, P1>::from_values(&[1i32], Shape::new([1])).unwrap();
        let mut x = one.clone();
        let mut kept = None;
        for i in 0..1000 {
            x = x.add(&one).unwrap();
            if i == 500 {
                kept = Some(x.clone());
            }
        }
        drop(x);
        let kept = kept.unwrap();
        assert_eq!(kept.inputs().len(), 2);
        assert_eq!(crate::graph::node_count(&kept.to_any()), 502);
        assert_eq!(kept.to_vec::<i32>().unwrap(), vec![502]);
    }

    #[test]
    fn test_unmaterialized_leaf_is_allowed() {
        let t = Tensor::<Cpu, P1>::leaf(
            HostStorage::unmaterialized(),
            Shape::new([4]),
            DType::F32,
            false,
            None,
        )
        .unwrap();
        assert!(!t.is_materialized());
        assert!(matches!(t.to_vec::<f32>(), Err(TensorError::MissingData(_))));
    }

    #[test]
    fn test_arity_is_enforced() {
        let err = Tensor::<Cpu, P1>::from_op(
            HostStorage::from_values(&[1.0f32]).unwrap(),
            Shape::new([1]),
            DType::F32,
            OpKind::Add,
            false,
            vec![],
        );
        assert!(matches!(
            err,
            Err(TensorError::ArityMismatch {
                op: OpKind::Add,
                expected: 2,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_identity_equality() {
        let a = Tensor::<Cpu, P1>::from_values(&[1.0f32, 2.0], Shape::new([2])).unwrap();
        let b = Tensor::<Cpu, P1>::from_values(&[1.0f32, 2.0], Shape::new([2])).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_gradient_buffer_is_carried() {
        let storage = HostStorage::from_values(&[1.0f64, 2.0])
            .unwrap()
            .with_gradient(HostBuffer::allocate_for(DType::F64, 2).unwrap())
            .unwrap();
        let t = Tensor::<Cpu, P1>::leaf(storage, Shape::new([2]), DType::F64, true, None).unwrap();
        let gradient = t.storage().gradient().unwrap();
        assert_eq!(gradient.to_typed_vec::<f64>().unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_to_ndarray_and_wrong_dtype() {
        let t = Tensor::<Cpu, P2>::from_values(&[1u16, 2, 3, 4, 5, 6], Shape::new([3, 2])).unwrap();
        let array = t.to_ndarray::<u16>().unwrap();
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array[[2, 1]], 6);
        assert!(matches!(
            t.to_vec::<f32>(),
            Err(TensorError::WrongDType(DType::F32, DType::U16))
        ));
    }
}
