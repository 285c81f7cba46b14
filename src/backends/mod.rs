use crate::dtype::DType;
use crate::op_kind::BinaryOp;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod accelerated;
pub mod cpu;
pub mod graph;
pub mod host;

use graph::GraphError;
use host::{HostKernel, HostStorage, KernelError};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    KernelError(#[from] KernelError),
    #[error(transparent)]
    GraphError(#[from] GraphError),
    #[error("Operand storage is not materialized")]
    Unmaterialized,
    #[error("Storage holds {actual} bytes but shape and dtype require {expected}")]
    StorageSizeMismatch { expected: usize, actual: usize },
    #[error("Storage size overflows the address space")]
    SizeOverflow,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum BackendKind {
    Cpu,
    Accelerated,
    Graph,
}

/// A storage strategy for tensor values.
pub trait Backend: Debug + Clone + Copy + Send + Sync + 'static {
    type Storage: Debug + Send + Sync;
    const KIND: BackendKind;

    fn is_materialized(storage: &Self::Storage) -> bool;

    /// Checks that materialized storage holds `num_elements` values of `dtype`.
    /// Unmaterialized storage always passes.
    fn check_storage(
        storage: &Self::Storage,
        dtype: DType,
        num_elements: u64,
    ) -> Result<(), BackendError>;

    /// Produces fresh storage holding `op(left, right)`. Operands are never modified.
    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &Self::Storage,
        right: &Self::Storage,
    ) -> Result<Self::Storage, BackendError>;
}

/// Backends whose storage is a [`HostStorage`] computed on by a [`HostKernel`].
pub trait HostBackend: Backend<Storage = HostStorage> + HostKernel {}

pub(crate) fn host_check_storage(
    storage: &HostStorage,
    dtype: DType,
    num_elements: u64,
) -> Result<(), BackendError> {
    let Some(data) = storage.data() else {
        return Ok(());
    };
    let expected = dtype
        .buffer_byte_len(num_elements)
        .ok_or(BackendError::SizeOverflow)?;
    if data.len() != expected {
        return Err(BackendError::StorageSizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

pub(crate) fn host_elementwise_binary<K: HostKernel>(
    op: BinaryOp,
    dtype: DType,
    left: &HostStorage,
    right: &HostStorage,
) -> Result<HostStorage, BackendError> {
    let (Some(left), Some(right)) = (left.data(), right.data()) else {
        return Err(BackendError::Unmaterialized);
    };
    Ok(HostStorage::new(K::elementwise_binary(op, dtype, left, right)?))
}
