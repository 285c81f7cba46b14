use std::collections::HashMap;
use weave_tensor::backends::Backend;
use weave_tensor::backends::graph::{Graph, GraphSession};
use weave_tensor::backends::host::HostElement;
use weave_tensor::backends::HostBackend;
use weave_tensor::{AnyTensor, Rank, Shape, Tensor, TensorError};

pub mod binary_ops;
pub mod graph_structure;

/// Creates tensors on one backend and reads their values back.
pub trait TestRunner {
    type B: Backend;

    fn tensor<T: HostElement, R: Rank>(&mut self, values: &[T], shape: Shape<R>)
    -> Tensor<Self::B, R>;

    fn read<T: HostElement, R: Rank>(&mut self, tensor: &Tensor<Self::B, R>) -> Vec<T>;
}

pub struct HostRunner<B: HostBackend> {
    _backend: std::marker::PhantomData<B>,
}

impl<B: HostBackend> HostRunner<B> {
    pub fn new() -> Self {
        Self {
            _backend: std::marker::PhantomData,
        }
    }
}

impl<B: HostBackend> TestRunner for HostRunner<B> {
    type B = B;

    fn tensor<T: HostElement, R: Rank>(&mut self, values: &[T], shape: Shape<R>) -> Tensor<B, R> {
        Tensor::from_values(values, shape).unwrap()
    }

    fn read<T: HostElement, R: Rank>(&mut self, tensor: &Tensor<B, R>) -> Vec<T> {
        tensor.to_vec().unwrap()
    }
}

pub struct GraphRunner {
    pub session: GraphSession,
}

impl TestRunner for GraphRunner {
    type B = Graph;

    fn tensor<T: HostElement, R: Rank>(&mut self, values: &[T], shape: Shape<R>) -> Tensor<Graph, R> {
        self.session.constant_tensor(values, shape).unwrap()
    }

    fn read<T: HostElement, R: Rank>(&mut self, tensor: &Tensor<Graph, R>) -> Vec<T> {
        assert_eq!(tensor.dtype(), T::DTYPE);
        self.session
            .evaluate(tensor, &HashMap::new())
            .unwrap()
            .to_typed_vec()
            .unwrap()
    }
}

/// Concrete tensor types that have a variant in [`AnyTensor`].
pub trait Variant: Into<AnyTensor> + TryFrom<AnyTensor, Error = TensorError> {}
impl<T: Into<AnyTensor> + TryFrom<AnyTensor, Error = TensorError>> Variant for T {}

fn assert_close(value: &[f64], correct: &[f64], atol: f64, rtol: f64) {
    assert_eq!(value.len(), correct.len());
    for (a, b) in value.iter().zip(correct) {
        let err = (a - b).abs();
        let limit = atol + rtol * a.abs().max(b.abs());
        assert!(err <= limit, "{a} != {b}: {err} > {limit}");
    }
}

pub fn assert_close_f16(value: Vec<half::f16>, correct: &[f32]) {
    let value = value.iter().map(|x| x.to_f64()).collect::<Vec<_>>();
    let correct = correct.iter().map(|x| *x as f64).collect::<Vec<_>>();
    assert_close(&value, &correct, 1e-3, 1e-3);
}

pub fn assert_close_bf16(value: Vec<half::bf16>, correct: &[f32]) {
    let value = value.iter().map(|x| x.to_f64()).collect::<Vec<_>>();
    let correct = correct.iter().map(|x| *x as f64).collect::<Vec<_>>();
    assert_close(&value, &correct, 1e-2, 1e-2);
}
