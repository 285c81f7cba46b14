use crate::backends::host::{
    HostBuffer, HostElement, HostKernel, HostStorage, KernelError, match_host_element,
};
use crate::backends::{
    Backend, BackendError, BackendKind, HostBackend, host_check_storage, host_elementwise_binary,
};
use crate::dtype::DType;
use crate::op_kind::BinaryOp;

/// Plain host memory, computed one element at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu;

fn cpu_binary<T: HostElement>(
    op: BinaryOp,
    left: &HostBuffer,
    right: &HostBuffer,
) -> Result<HostBuffer, KernelError> {
    let a = left.try_as_typed::<T>()?;
    let b = right.try_as_typed::<T>()?;
    if a.len() != b.len() {
        return Err(KernelError::LengthMismatch(a.len(), b.len()));
    }
    let mut out = HostBuffer::allocate_elements::<T>(a.len())?;
    let o = out.try_as_typed_mut::<T>()?;
    for ((o, &a), &b) in o.iter_mut().zip(a).zip(b) {
        *o = T::apply_binary(op, a, b);
    }
    Ok(out)
}

impl HostKernel for Cpu {
    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &HostBuffer,
        right: &HostBuffer,
    ) -> Result<HostBuffer, KernelError> {
        log::trace!("cpu {op} over {} bytes of {dtype}", left.len());
        match_host_element!(dtype, op, cpu_binary(op, left, right))
    }
}

impl Backend for Cpu {
    type Storage = HostStorage;
    const KIND: BackendKind = BackendKind::Cpu;

    fn is_materialized(storage: &HostStorage) -> bool {
        storage.is_materialized()
    }

    fn check_storage(
        storage: &HostStorage,
        dtype: DType,
        num_elements: u64,
    ) -> Result<(), BackendError> {
        host_check_storage(storage, dtype, num_elements)
    }

    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &HostStorage,
        right: &HostStorage,
    ) -> Result<HostStorage, BackendError> {
        host_elementwise_binary::<Self>(op, dtype, left, right)
    }
}

impl HostBackend for Cpu {}
