//! Raw host memory shared by the [`Cpu`](super::cpu::Cpu) and
//! [`Accelerated`](super::accelerated::Accelerated) backends.
//!
//! A [`HostBuffer`] is the only owner of its allocation and releases it in
//! `Drop`. It is deliberately not `Clone`: copying a buffer is an explicit
//! [`HostBuffer::from_bytes`] call.

use crate::dtype::{DType, DTypeOfPrimitive};
use crate::op_kind::BinaryOp;
use bytemuck::Pod;
use half::{bf16, f16};
use num_traits::{Float, PrimInt, WrappingAdd, WrappingMul, WrappingSub};
use std::alloc::Layout;
use std::fmt::{Debug, Formatter};
use std::ptr::NonNull;

/// Alignment used for buffers this crate allocates itself.
pub const HOST_BUFFER_ALIGN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HostBufferError {
    #[error("Invalid buffer layout: {0}")]
    InvalidLayout(#[from] std::alloc::LayoutError),
    #[error("Failed to allocate {0} bytes")]
    AllocationFailed(usize),
    #[error("Buffer of {len} bytes is not a multiple of the {stride} byte element stride")]
    LengthNotMultipleOfStride { len: usize, stride: usize },
    #[error("Buffer cannot be viewed as the requested element type: {0:?}")]
    Cast(bytemuck::PodCastError),
    #[error("Gradient buffer holds {gradient} bytes but data holds {data}")]
    GradientLayoutMismatch { data: usize, gradient: usize },
    #[error("Buffer size overflows the address space")]
    SizeOverflow,
}

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("Operation {0} is not supported for dtype {1}")]
    UnsupportedDType(BinaryOp, DType),
    #[error("Operand buffers hold {0} and {1} elements")]
    LengthMismatch(usize, usize),
    #[error(transparent)]
    HostBufferError(#[from] HostBufferError),
}

pub struct HostBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// The allocation is exclusively owned and only reachable through `&self`/`&mut self`.
unsafe impl Send for HostBuffer {}
unsafe impl Sync for HostBuffer {}

impl HostBuffer {
    /// Zero-initialised buffer of `byte_len` bytes aligned to `align`.
    pub fn allocate(byte_len: usize, align: usize) -> Result<Self, HostBufferError> {
        let layout = Layout::from_size_align(byte_len, align)?;
        let ptr = if layout.size() == 0 {
            NonNull::new(std::ptr::without_provenance_mut::<u8>(layout.align()))
        } else {
            // SAFETY: layout has a non-zero size.
            NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
        }
        .ok_or(HostBufferError::AllocationFailed(byte_len))?;
        log::trace!("Allocated host buffer of {} bytes", byte_len);
        Ok(Self {
            ptr,
            len: byte_len,
            layout,
        })
    }

    pub fn allocate_for(dtype: DType, num_elements: u64) -> Result<Self, HostBufferError> {
        let byte_len = dtype
            .buffer_byte_len(num_elements)
            .ok_or(HostBufferError::SizeOverflow)?;
        Self::allocate(byte_len, HOST_BUFFER_ALIGN)
    }

    pub(crate) fn allocate_elements<T: Pod>(num_elements: usize) -> Result<Self, HostBufferError> {
        let byte_len = num_elements
            .checked_mul(size_of::<T>())
            .ok_or(HostBufferError::SizeOverflow)?;
        Self::allocate(byte_len, HOST_BUFFER_ALIGN.max(align_of::<T>()))
    }

    /// Takes ownership of a typed vector and exposes its memory as raw bytes without copying.
    pub fn wrap<T: Pod>(values: Vec<T>) -> Result<Self, HostBufferError> {
        let mut values = std::mem::ManuallyDrop::new(values);
        let layout = Layout::array::<T>(values.capacity())?;
        let len = values.len() * size_of::<T>();
        let ptr = NonNull::new(values.as_mut_ptr() as *mut u8)
            .ok_or(HostBufferError::AllocationFailed(len))?;
        Ok(Self { ptr, len, layout })
    }

    pub fn from_values<T: Pod>(values: &[T]) -> Result<Self, HostBufferError> {
        let mut buffer = Self::allocate_elements::<T>(values.len())?;
        buffer
            .as_bytes_mut()
            .copy_from_slice(bytemuck::cast_slice(values));
        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8], align: usize) -> Result<Self, HostBufferError> {
        let mut buffer = Self::allocate(bytes.len(), align)?;
        buffer.as_bytes_mut().copy_from_slice(bytes);
        Ok(buffer)
    }

    pub fn try_clone(&self) -> Result<Self, HostBufferError> {
        Self::from_bytes(self.as_bytes(), self.layout.align())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes (or dangling and aligned with len == 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn check_stride<T>(&self) -> Result<(), HostBufferError> {
        let stride = size_of::<T>();
        if stride == 0 || self.len % stride != 0 {
            return Err(HostBufferError::LengthNotMultipleOfStride {
                len: self.len,
                stride,
            });
        }
        Ok(())
    }

    pub fn try_as_typed<T: Pod>(&self) -> Result<&[T], HostBufferError> {
        self.check_stride::<T>()?;
        bytemuck::try_cast_slice(self.as_bytes()).map_err(HostBufferError::Cast)
    }

    pub fn try_as_typed_mut<T: Pod>(&mut self) -> Result<&mut [T], HostBufferError> {
        self.check_stride::<T>()?;
        bytemuck::try_cast_slice_mut(self.as_bytes_mut()).map_err(HostBufferError::Cast)
    }

    /// Copies the buffer out as typed values. Works regardless of the buffer's alignment.
    pub fn to_typed_vec<T: Pod>(&self) -> Result<Vec<T>, HostBufferError> {
        self.check_stride::<T>()?;
        let mut out = vec![T::zeroed(); self.len / size_of::<T>()];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(self.as_bytes());
        Ok(out)
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: ptr was allocated (by us or by a Vec) with exactly this layout.
            unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) }
        }
    }
}

impl Debug for HostBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}

/// Primary buffer plus an optional gradient buffer of identical layout.
#[derive(Debug, Default)]
pub struct HostStorage {
    data: Option<HostBuffer>,
    gradient: Option<HostBuffer>,
}

impl HostStorage {
    pub fn new(data: HostBuffer) -> Self {
        Self {
            data: Some(data),
            gradient: None,
        }
    }

    pub fn unmaterialized() -> Self {
        Self::default()
    }

    pub fn from_values<T: Pod>(values: &[T]) -> Result<Self, HostBufferError> {
        Ok(Self::new(HostBuffer::from_values(values)?))
    }

    pub fn with_gradient(mut self, gradient: HostBuffer) -> Result<Self, HostBufferError> {
        if let Some(data) = &self.data {
            if data.len() != gradient.len() {
                return Err(HostBufferError::GradientLayoutMismatch {
                    data: data.len(),
                    gradient: gradient.len(),
                });
            }
        }
        self.gradient = Some(gradient);
        Ok(self)
    }

    pub fn data(&self) -> Option<&HostBuffer> {
        self.data.as_ref()
    }

    pub fn gradient(&self) -> Option<&HostBuffer> {
        self.gradient.as_ref()
    }

    pub fn is_materialized(&self) -> bool {
        self.data.is_some()
    }
}

/// Element types the host kernels can compute on.
pub trait HostElement: Pod + Send + Sync + DTypeOfPrimitive {
    fn apply_binary(op: BinaryOp, a: Self, b: Self) -> Self;
}

fn apply_float<T: Float>(op: BinaryOp, a: T, b: T) -> T {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Max => a.max(b),
        BinaryOp::Min => a.min(b),
    }
}

// Integer arithmetic wraps on overflow.
fn apply_int<T: PrimInt + WrappingAdd + WrappingSub + WrappingMul>(op: BinaryOp, a: T, b: T) -> T {
    match op {
        BinaryOp::Add => a.wrapping_add(&b),
        BinaryOp::Sub => a.wrapping_sub(&b),
        BinaryOp::Mul => a.wrapping_mul(&b),
        BinaryOp::Max => a.max(b),
        BinaryOp::Min => a.min(b),
    }
}

macro_rules! impl_host_element {
    ($apply:ident, $($t:ty),*) => {
        $(
            impl HostElement for $t {
                fn apply_binary(op: BinaryOp, a: Self, b: Self) -> Self {
                    $apply(op, a, b)
                }
            }
        )*
    };
}

impl_host_element!(apply_float, f64, f32, bf16, f16);
impl_host_element!(apply_int, u64, i64, u32, i32, u16, i16, u8, i8);

/// Calls `$func::<T>($args)` with `T` the element type for `$dtype`.
macro_rules! match_host_element {
    ($dtype:expr, $op:expr, $func:ident ( $($arg:expr),* )) => {
        match $dtype {
            $crate::dtype::DType::F64 => $func::<f64>($($arg),*),
            $crate::dtype::DType::F32 => $func::<f32>($($arg),*),
            $crate::dtype::DType::BF16 => $func::<half::bf16>($($arg),*),
            $crate::dtype::DType::F16 => $func::<half::f16>($($arg),*),
            $crate::dtype::DType::U64 => $func::<u64>($($arg),*),
            $crate::dtype::DType::I64 => $func::<i64>($($arg),*),
            $crate::dtype::DType::U32 => $func::<u32>($($arg),*),
            $crate::dtype::DType::I32 => $func::<i32>($($arg),*),
            $crate::dtype::DType::U16 => $func::<u16>($($arg),*),
            $crate::dtype::DType::I16 => $func::<i16>($($arg),*),
            $crate::dtype::DType::U8 => $func::<u8>($($arg),*),
            $crate::dtype::DType::I8 => $func::<i8>($($arg),*),
            $crate::dtype::DType::BOOL => Err($crate::backends::host::KernelError::UnsupportedDType($op, $dtype)),
        }
    };
}
pub(crate) use match_host_element;

/// Kernel contract for backends that compute directly on host buffers.
pub trait HostKernel {
    /// Computes `op` elementwise over two equally sized buffers into a fresh buffer.
    fn elementwise_binary(
        op: BinaryOp,
        dtype: DType,
        left: &HostBuffer,
        right: &HostBuffer,
    ) -> Result<HostBuffer, KernelError>;
}
