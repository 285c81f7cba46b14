use crate::tensor_rank::{DimContainer, DimProduct, Rank, RankError};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// An immutable, rank-tagged list of dimension sizes.
pub struct Shape<R: Rank> {
    dims: R::KnownDims,
}

impl<R: Rank> Shape<R> {
    pub fn new(dims: R::KnownDims) -> Self {
        Self { dims }
    }

    /// Fails when `dims` does not hold exactly `R::KNOWN_LEN` entries.
    pub fn try_new(dims: &[u64]) -> Result<Self, RankError> {
        Ok(Self {
            dims: R::KnownDims::try_from_slice(dims)?,
        })
    }

    pub fn dims(&self) -> &R::KnownDims {
        &self.dims
    }

    pub fn as_slice(&self) -> &[u64] {
        self.dims.as_slice()
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.as_slice().to_vec()
    }

    pub fn rank(&self) -> usize {
        R::KNOWN_LEN
    }

    /// Element count, or `None` when the product overflows `u64`.
    pub fn num_elements(&self) -> Option<u64> {
        self.dims.dim_product()
    }

    pub fn to_ndarray_dim(&self) -> Result<R::NDArrayDim, RankError> {
        R::cast_to_ndarray_dim(&self.dims)
    }
}

impl<R: Rank> Clone for Shape<R> {
    fn clone(&self) -> Self {
        Self {
            dims: self.dims.clone(),
        }
    }
}

impl<R: Rank> PartialEq for Shape<R> {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
    }
}

impl<R: Rank> Eq for Shape<R> {}

impl<R: Rank> Hash for Shape<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dims.hash(state)
    }
}

impl<R: Rank> Debug for Shape<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Shape").field(&self.as_slice()).finish()
    }
}

impl<R: Rank> Display for Shape<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}
