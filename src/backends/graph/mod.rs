use crate::backends::host::{HostBufferError, KernelError};
use crate::backends::{Backend, BackendError, BackendKind};
use crate::dtype::DType;
use crate::op_kind::BinaryOp;

pub mod context;
pub mod observer;
pub mod session;
pub mod symbolic;

pub use context::GraphContext;
pub use session::{GraphSession, GraphSessionConfig};
pub use symbolic::{Executable, SymbolicGraph, SymbolicTensorId, SymbolicTensorInfo};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown symbolic tensor {0}")]
    UnknownTensor(SymbolicTensorId),
    #[error("Operands belong to different graph sessions")]
    SessionMismatch,
    #[error("Symbolic operands have dtypes {0} and {1}")]
    DTypeMismatch(DType, DType),
    #[error("Symbolic operands have {0} and {1} elements")]
    ElementCountMismatch(u64, u64),
    #[error("Expected a value of {expected} bytes, got {actual}")]
    ValueSizeMismatch { expected: usize, actual: usize },
    #[error("No value fed for placeholder {0}")]
    MissingFeed(SymbolicTensorId),
    #[error("Executable needs {required} bytes but the heap holds {capacity}")]
    HeapExhausted { required: usize, capacity: usize },
    #[error("Context has no compiled executable")]
    NoExecutable,
    #[error("Tensor has no symbolic data")]
    Unmaterialized,
    #[error("Symbolic graph lock was poisoned")]
    Poisoned,
    #[error("Symbolic tensor size overflows the address space")]
    SizeOverflow,
    #[error("Gradient {gradient:?} does not match data {data:?}")]
    GradientMismatch {
        data: SymbolicTensorInfo,
        gradient: SymbolicTensorInfo,
    },
    #[error(transparent)]
    KernelError(#[from] KernelError),
    #[error(transparent)]
    HostBufferError(#[from] HostBufferError),
}

/// Accelerator backend: tensors are symbolic handles into a session graph
/// that is executed later by a [`GraphSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Graph;

#[derive(Debug)]
pub struct GraphStorage {
    data: Option<SymbolicTensorId>,
    gradient: Option<SymbolicTensorId>,
    context: GraphContext,
}

impl GraphStorage {
    pub fn new(data: SymbolicTensorId, context: GraphContext) -> Self {
        Self {
            data: Some(data),
            gradient: None,
            context,
        }
    }

    pub fn unmaterialized(context: GraphContext) -> Self {
        Self {
            data: None,
            gradient: None,
            context,
        }
    }

    /// Attaches a gradient, which must have the same dtype and element count
    /// as the data.
    pub fn with_gradient(mut self, gradient: SymbolicTensorId) -> Result<Self, GraphError> {
        let gradient_info = self.context.info(gradient)?;
        if let Some(data) = self.data {
            let data_info = self.context.info(data)?;
            if data_info != gradient_info {
                return Err(GraphError::GradientMismatch {
                    data: data_info,
                    gradient: gradient_info,
                });
            }
        }
        self.gradient = Some(gradient);
        Ok(self)
    }

    pub fn data(&self) -> Option<SymbolicTensorId> {
        self.data
    }

    pub fn gradient(&self) -> Option<SymbolicTensorId> {
        self.gradient
    }

    pub fn context(&self) -> &GraphContext {
        &self.context
    }
}

impl Backend for Graph {
    type Storage = GraphStorage;
    const KIND: BackendKind = BackendKind::Graph;

    fn is_materialized(storage: &GraphStorage) -> bool {
        storage.data.is_some()
    }

    fn check_storage(
        storage: &GraphStorage,
        dtype: DType,
        num_elements: u64,
    ) -> Result<(), BackendError> {
        let Some(id) = storage.data else {
            return Ok(());
        };
        let info = storage.context.info(id)?;
        if info.dtype != dtype {
            return Err(GraphError::DTypeMismatch(info.dtype, dtype).into());
        }
        if info.num_elements != num_elements {
            return Err(GraphError::ElementCountMismatch(info.num_elements, num_elements).into());
        }
        Ok(())
    }

    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &GraphStorage,
        right: &GraphStorage,
    ) -> Result<GraphStorage, BackendError> {
        if !left.context.same_session(&right.context) {
            return Err(GraphError::SessionMismatch.into());
        }
        let (Some(a), Some(b)) = (left.data, right.data) else {
            return Err(BackendError::Unmaterialized);
        };
        let info = left.context.info(a)?;
        if info.dtype != dtype {
            return Err(GraphError::DTypeMismatch(info.dtype, dtype).into());
        }
        let out = left.context.emit_symbolic_binary(op, a, b)?;
        Ok(GraphStorage::new(out, GraphContext::derive(&left.context)))
    }
}
