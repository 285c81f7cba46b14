use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PadStyle {
    Explicit,
    Valid,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PadMode {
    Zero,
    Reflect,
    Symmetric,
    Clamp,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvDataLayout {
    NHWC,
    NCHW,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvWeightLayout {
    OIHW,
    HWIO,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conv2dParams {
    pub pad_style: PadStyle,
    pub pad_mode: PadMode,
    pub data_layout: ConvDataLayout,
    pub weight_layout: ConvWeightLayout,
}

/// The elementwise binary family that every backend implements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Max,
    Min,
}

/// Tag recorded on every graph node naming the operator that produced it.
///
/// `MatMul`, `Relu`, `Softmax` and `Conv2d` are declared so graph consumers can
/// refer to them; no backend in this crate implements their kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum OpKind {
    Identity,
    Add,
    Sub,
    Mul,
    Max,
    Min,
    MatMul,
    Relu,
    Softmax { axis: i64 },
    Conv2d(Conv2dParams),
}

impl OpKind {
    /// Number of input tensors a node with this tag must record.
    pub fn arity(&self) -> usize {
        match self {
            OpKind::Identity => 0,
            OpKind::Relu | OpKind::Softmax { .. } => 1,
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::Max
            | OpKind::Min
            | OpKind::MatMul
            | OpKind::Conv2d(_) => 2,
        }
    }

    pub fn as_binary(&self) -> Option<BinaryOp> {
        match self {
            OpKind::Add => Some(BinaryOp::Add),
            OpKind::Sub => Some(BinaryOp::Sub),
            OpKind::Mul => Some(BinaryOp::Mul),
            OpKind::Max => Some(BinaryOp::Max),
            OpKind::Min => Some(BinaryOp::Min),
            _ => None,
        }
    }
}

impl From<BinaryOp> for OpKind {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => OpKind::Add,
            BinaryOp::Sub => OpKind::Sub,
            BinaryOp::Mul => OpKind::Mul,
            BinaryOp::Max => OpKind::Max,
            BinaryOp::Min => OpKind::Min,
        }
    }
}
