pub mod any_tensor;
pub mod backends;
pub mod dtype;
pub mod graph;
pub mod op_kind;
pub mod ops;
pub mod shape;
pub mod tensor;
pub mod tensor_rank;

pub use any_tensor::AnyTensor;
pub use dtype::DType;
pub use shape::Shape;
pub use tensor::{Tensor, TensorError, TensorId};
pub use tensor_rank::Rank;
pub use typenum::{P1, P2, P3, P4, P5};
