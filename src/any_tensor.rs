use crate::backends::BackendKind;
use crate::backends::accelerated::Accelerated;
use crate::backends::cpu::Cpu;
use crate::backends::graph::Graph;
use crate::dtype::DType;
use crate::op_kind::OpKind;
use crate::tensor::{Tensor, TensorError, TensorId};
use typenum::{P1, P2, P3, P4, P5};

/// A graph node of any supported backend and rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyTensor {
    CpuR1(Tensor<Cpu, P1>),
    CpuR2(Tensor<Cpu, P2>),
    CpuR3(Tensor<Cpu, P3>),
    CpuR4(Tensor<Cpu, P4>),
    CpuR5(Tensor<Cpu, P5>),
    AcceleratedR1(Tensor<Accelerated, P1>),
    AcceleratedR2(Tensor<Accelerated, P2>),
    AcceleratedR3(Tensor<Accelerated, P3>),
    AcceleratedR4(Tensor<Accelerated, P4>),
    AcceleratedR5(Tensor<Accelerated, P5>),
    GraphR1(Tensor<Graph, P1>),
    GraphR2(Tensor<Graph, P2>),
    GraphR3(Tensor<Graph, P3>),
    GraphR4(Tensor<Graph, P4>),
    GraphR5(Tensor<Graph, P5>),
}

macro_rules! dispatch {
    ($value:expr, $x:ident => $body:expr) => {
        match $value {
            AnyTensor::CpuR1($x) => $body,
            AnyTensor::CpuR2($x) => $body,
            AnyTensor::CpuR3($x) => $body,
            AnyTensor::CpuR4($x) => $body,
            AnyTensor::CpuR5($x) => $body,
            AnyTensor::AcceleratedR1($x) => $body,
            AnyTensor::AcceleratedR2($x) => $body,
            AnyTensor::AcceleratedR3($x) => $body,
            AnyTensor::AcceleratedR4($x) => $body,
            AnyTensor::AcceleratedR5($x) => $body,
            AnyTensor::GraphR1($x) => $body,
            AnyTensor::GraphR2($x) => $body,
            AnyTensor::GraphR3($x) => $body,
            AnyTensor::GraphR4($x) => $body,
            AnyTensor::GraphR5($x) => $body,
        }
    };
}

impl AnyTensor {
    pub fn id(&self) -> TensorId {
        dispatch!(self, x => x.id())
    }

    pub fn dtype(&self) -> DType {
        dispatch!(self, x => x.dtype())
    }

    pub fn shape(&self) -> Vec<u64> {
        dispatch!(self, x => x.shape().to_vec())
    }

    pub fn rank(&self) -> usize {
        dispatch!(self, x => x.rank())
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self {
            AnyTensor::CpuR1(_)
            | AnyTensor::CpuR2(_)
            | AnyTensor::CpuR3(_)
            | AnyTensor::CpuR4(_)
            | AnyTensor::CpuR5(_) => BackendKind::Cpu,
            AnyTensor::AcceleratedR1(_)
            | AnyTensor::AcceleratedR2(_)
            | AnyTensor::AcceleratedR3(_)
            | AnyTensor::AcceleratedR4(_)
            | AnyTensor::AcceleratedR5(_) => BackendKind::Accelerated,
            AnyTensor::GraphR1(_)
            | AnyTensor::GraphR2(_)
            | AnyTensor::GraphR3(_)
            | AnyTensor::GraphR4(_)
            | AnyTensor::GraphR5(_) => BackendKind::Graph,
        }
    }

    pub fn num_elements(&self) -> u64 {
        dispatch!(self, x => x.num_elements())
    }

    pub fn byte_size(&self) -> usize {
        dispatch!(self, x => x.byte_size())
    }

    pub fn op(&self) -> OpKind {
        dispatch!(self, x => x.op())
    }

    pub fn requires_grad(&self) -> bool {
        dispatch!(self, x => x.requires_grad())
    }

    pub fn name(&self) -> Option<&str> {
        dispatch!(self, x => x.name())
    }

    pub fn inputs(&self) -> &[AnyTensor] {
        dispatch!(self, x => x.inputs())
    }

    pub fn is_leaf(&self) -> bool {
        dispatch!(self, x => x.is_leaf())
    }

    pub fn is_materialized(&self) -> bool {
        dispatch!(self, x => x.is_materialized())
    }

    pub(crate) fn into_detached_inputs(self) -> Vec<AnyTensor> {
        dispatch!(self, x => x.into_detached_inputs())
    }

    /// Borrows the wrapped tensor as `T` when the variant matches.
    pub fn downcast<'a, T>(&'a self) -> Result<&'a T, TensorError>
    where
        &'a T: TryFrom<&'a AnyTensor, Error = TensorError>,
    {
        <&'a T>::try_from(self)
    }
}

macro_rules! impl_any_tensor_variant {
    ($variant:ident, $backend:ty, $rank:ty) => {
        impl From<Tensor<$backend, $rank>> for AnyTensor {
            fn from(value: Tensor<$backend, $rank>) -> Self {
                AnyTensor::$variant(value)
            }
        }

        impl From<&Tensor<$backend, $rank>> for AnyTensor {
            fn from(value: &Tensor<$backend, $rank>) -> Self {
                AnyTensor::$variant(value.clone())
            }
        }

        impl TryFrom<AnyTensor> for Tensor<$backend, $rank> {
            type Error = TensorError;
            fn try_from(value: AnyTensor) -> Result<Self, Self::Error> {
                match value {
                    AnyTensor::$variant(x) => Ok(x),
                    other => Err(TensorError::VariantMismatch(
                        <$backend as $crate::backends::Backend>::KIND,
                        <$rank as $crate::tensor_rank::Rank>::KNOWN_LEN,
                        other.backend_kind(),
                        other.rank(),
                    )),
                }
            }
        }

        impl<'a> TryFrom<&'a AnyTensor> for &'a Tensor<$backend, $rank> {
            type Error = TensorError;
            fn try_from(value: &'a AnyTensor) -> Result<Self, Self::Error> {
                match value {
                    AnyTensor::$variant(x) => Ok(x),
                    other => Err(TensorError::VariantMismatch(
                        <$backend as $crate::backends::Backend>::KIND,
                        <$rank as $crate::tensor_rank::Rank>::KNOWN_LEN,
                        other.backend_kind(),
                        other.rank(),
                    )),
                }
            }
        }
    };
}

impl_any_tensor_variant!(CpuR1, Cpu, P1);
impl_any_tensor_variant!(CpuR2, Cpu, P2);
impl_any_tensor_variant!(CpuR3, Cpu, P3);
impl_any_tensor_variant!(CpuR4, Cpu, P4);
impl_any_tensor_variant!(CpuR5, Cpu, P5);
impl_any_tensor_variant!(AcceleratedR1, Accelerated, P1);
impl_any_tensor_variant!(AcceleratedR2, Accelerated, P2);
impl_any_tensor_variant!(AcceleratedR3, Accelerated, P3);
impl_any_tensor_variant!(AcceleratedR4, Accelerated, P4);
impl_any_tensor_variant!(AcceleratedR5, Accelerated, P5);
impl_any_tensor_variant!(GraphR1, Graph, P1);
impl_any_tensor_variant!(GraphR2, Graph, P2);
impl_any_tensor_variant!(GraphR3, Graph, P3);
impl_any_tensor_variant!(GraphR4, Graph, P4);
impl_any_tensor_variant!(GraphR5, Graph, P5);
