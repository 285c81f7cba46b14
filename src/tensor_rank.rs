use ndarray::{Dimension, Ix1, Ix2, Ix3, Ix4, Ix5};
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Index;
use typenum::{P1, P2, P3, P4, P5};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    #[error("Expected {expected} dimensions, got {actual}")]
    RankMismatch { expected: usize, actual: usize },
    #[error("Dimension {0} does not fit in usize")]
    DimOverflow(u64),
}

pub trait DimContainer<T: Clone> {
    fn as_slice(&self) -> &[T];
    fn try_from_slice(value: &[T]) -> Result<Self, RankError>
    where
        Self: Sized;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

impl<T: Clone, const L: usize> DimContainer<T> for [T; L] {
    fn as_slice(&self) -> &[T] {
        self.as_slice()
    }
    fn try_from_slice(value: &[T]) -> Result<Self, RankError> {
        if value.len() != L {
            return Err(RankError::RankMismatch {
                expected: L,
                actual: value.len(),
            });
        }
        Ok(core::array::from_fn(|x| value[x].clone()))
    }
    fn len(&self) -> usize {
        L
    }
    fn is_empty(&self) -> bool {
        L == 0
    }
}

/// Product of all dimensions, `None` on overflow.
pub trait DimProduct {
    fn dim_product(&self) -> Option<u64>;
}

impl DimProduct for [u64] {
    fn dim_product(&self) -> Option<u64> {
        self.iter().try_fold(1u64, |acc, &x| acc.checked_mul(x))
    }
}

impl<const L: usize> DimProduct for [u64; L] {
    fn dim_product(&self) -> Option<u64> {
        self.as_slice().dim_product()
    }
}

/// Compile-time rank tag. Implemented for `P1` through `P5`.
pub trait Rank: Debug + Clone + Copy + Send + Sync + 'static {
    type NDArrayDim: Dimension;
    const KNOWN_LEN: usize;

    type KnownDims: Debug
        + Clone
        + PartialEq
        + Eq
        + Hash
        + Send
        + Sync
        + DimContainer<u64>
        + Index<usize, Output = u64>
        + DimProduct;

    fn try_cast_to_dim(dims: &[usize]) -> Result<Self::NDArrayDim, RankError>;
    fn cast_to_ndarray_dim(dims: &Self::KnownDims) -> Result<Self::NDArrayDim, RankError>;
}

macro_rules! impl_known_rank {
    ($rank:ty, $dim:ty, $len:literal) => {
        impl Rank for $rank {
            type NDArrayDim = $dim;
            const KNOWN_LEN: usize = $len;
            type KnownDims = [u64; $len];

            fn try_cast_to_dim(dims: &[usize]) -> Result<Self::NDArrayDim, RankError> {
                let dims: [usize; $len] =
                    dims.try_into().map_err(|_| RankError::RankMismatch {
                        expected: $len,
                        actual: dims.len(),
                    })?;
                Ok(ndarray::Dim(dims))
            }

            fn cast_to_ndarray_dim(dims: &Self::KnownDims) -> Result<Self::NDArrayDim, RankError> {
                let mut out = [0usize; $len];
                for (o, &x) in out.iter_mut().zip(dims) {
                    *o = usize::try_from(x).map_err(|_| RankError::DimOverflow(x))?;
                }
                Ok(ndarray::Dim(out))
            }
        }
    };
}

impl_known_rank!(P1, Ix1, 1);
impl_known_rank!(P2, Ix2, 2);
impl_known_rank!(P3, Ix3, 3);
impl_known_rank!(P4, Ix4, 4);
impl_known_rank!(P5, Ix5, 5);
