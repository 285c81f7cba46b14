use half::{bf16, f16};
use serde::{Deserialize, Serialize};

#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Serialize, Deserialize, strum_macros::EnumIter,
)]
pub enum DType {
    F64,
    F32,
    BF16,
    F16,
    U64,
    I64,
    U32,
    I32,
    U16,
    I16,
    U8,
    I8,
    BOOL,
}

impl DType {
    /// Bytes per element. Every kind has exactly one size; keep this match free of wildcards.
    pub fn size(&self) -> usize {
        match self {
            DType::F64 => 8,
            DType::F32 => 4,
            DType::BF16 => 2,
            DType::F16 => 2,
            DType::U64 => 8,
            DType::I64 => 8,
            DType::U32 => 4,
            DType::I32 => 4,
            DType::U16 => 2,
            DType::I16 => 2,
            DType::U8 => 1,
            DType::I8 => 1,
            DType::BOOL => 1,
        }
    }

    /// Bytes needed for `num_elements` values, `None` if that does not fit in `usize`.
    pub fn buffer_byte_len(&self, num_elements: u64) -> Option<usize> {
        usize::try_from(num_elements)
            .ok()?
            .checked_mul(self.size())
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F64 | DType::F32 | DType::BF16 | DType::F16)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DType::U64
                | DType::I64
                | DType::U32
                | DType::I32
                | DType::U16
                | DType::I16
                | DType::U8
                | DType::I8
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DType::I64 | DType::I32 | DType::I16 | DType::I8
        ) || self.is_float()
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F64 => write!(f, "Float64"),
            DType::F32 => write!(f, "Float32"),
            DType::BF16 => write!(f, "BFloat16"),
            DType::F16 => write!(f, "Float16"),
            DType::I64 => write!(f, "Int64"),
            DType::I32 => write!(f, "Int32"),
            DType::U64 => write!(f, "UInt64"),
            DType::U32 => write!(f, "UInt32"),
            DType::I16 => write!(f, "Int16"),
            DType::U16 => write!(f, "UInt16"),
            DType::U8 => write!(f, "UInt8"),
            DType::I8 => write!(f, "Int8"),
            DType::BOOL => write!(f, "Bool"),
        }
    }
}

pub trait DTypeOfPrimitive {
    const DTYPE: DType;
}

impl DTypeOfPrimitive for f64 { const DTYPE: DType = DType::F64; }
impl DTypeOfPrimitive for f32 { const DTYPE: DType = DType::F32; }
impl DTypeOfPrimitive for bf16 { const DTYPE: DType = DType::BF16; }
impl DTypeOfPrimitive for f16 { const DTYPE: DType = DType::F16; }
impl DTypeOfPrimitive for i64 { const DTYPE: DType = DType::I64; }
impl DTypeOfPrimitive for u64 { const DTYPE: DType = DType::U64; }
impl DTypeOfPrimitive for i32 { const DTYPE: DType = DType::I32; }
impl DTypeOfPrimitive for u32 { const DTYPE: DType = DType::U32; }
impl DTypeOfPrimitive for i16 { const DTYPE: DType = DType::I16; }
impl DTypeOfPrimitive for u16 { const DTYPE: DType = DType::U16; }
impl DTypeOfPrimitive for i8 { const DTYPE: DType = DType::I8; }
impl DTypeOfPrimitive for u8 { const DTYPE: DType = DType::U8; }
impl DTypeOfPrimitive for bool { const DTYPE: DType = DType::BOOL; }
