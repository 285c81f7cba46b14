use crate::backends::host::{
    HostBuffer, HostElement, HostKernel, HostStorage, KernelError, match_host_element,
};
use crate::backends::{
    Backend, BackendError, BackendKind, HostBackend, host_check_storage, host_elementwise_binary,
};
use crate::dtype::DType;
use crate::op_kind::BinaryOp;
use ndarray::{ArrayView1, ArrayViewMut1, Zip};

/// Host memory computed with vectorized `ndarray` passes over the contiguous buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accelerated;

#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 1 << 16;

#[cfg(feature = "parallel")]
fn zip_apply<T: HostElement>(
    op: BinaryOp,
    out: ArrayViewMut1<T>,
    a: ArrayView1<T>,
    b: ArrayView1<T>,
) {
    let parallel = out.len() >= PARALLEL_THRESHOLD;
    let zip = Zip::from(out).and(a).and(b);
    if parallel {
        zip.par_for_each(|o, &a, &b| *o = T::apply_binary(op, a, b));
    } else {
        zip.for_each(|o, &a, &b| *o = T::apply_binary(op, a, b));
    }
}

#[cfg(not(feature = "parallel"))]
fn zip_apply<T: HostElement>(
    op: BinaryOp,
    out: ArrayViewMut1<T>,
    a: ArrayView1<T>,
    b: ArrayView1<T>,
) {
    Zip::from(out)
        .and(a)
        .and(b)
        .for_each(|o, &a, &b| *o = T::apply_binary(op, a, b));
}

fn accelerated_binary<T: HostElement>(
    op: BinaryOp,
    left: &HostBuffer,
    right: &HostBuffer,
) -> Result<HostBuffer, KernelError> {
    let a = ArrayView1::from(left.try_as_typed::<T>()?);
    let b = ArrayView1::from(right.try_as_typed::<T>()?);
    if a.len() != b.len() {
        return Err(KernelError::LengthMismatch(a.len(), b.len()));
    }
    let mut out = HostBuffer::allocate_elements::<T>(a.len())?;
    zip_apply(op, ArrayViewMut1::from(out.try_as_typed_mut::<T>()?), a, b);
    Ok(out)
}

impl HostKernel for Accelerated {
    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &HostBuffer,
        right: &HostBuffer,
    ) -> Result<HostBuffer, KernelError> {
        log::trace!("vectorized {op} over {} bytes of {dtype}", left.len());
        match_host_element!(dtype, op, accelerated_binary(op, left, right))
    }
}

impl Backend for Accelerated {
    type Storage = HostStorage;
    const KIND: BackendKind = BackendKind::Accelerated;

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

impl HostBackend for Accelerated {}
