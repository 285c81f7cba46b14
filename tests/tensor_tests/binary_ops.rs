use crate::tensor_tests::{TestRunner, Variant, assert_close_bf16, assert_close_f16};
use half::{bf16, f16};
use weave_tensor::dtype::DType;
use weave_tensor::op_kind::OpKind;
use weave_tensor::{P1, P2, P5, Shape, Tensor, TensorError};

pub fn test_add_fp32<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1.0f32, 2.0], Shape::<P1>::new([2]));
    let b = runner.tensor(&[2.0f32, 3.0], Shape::<P1>::new([2]));
    let c = a.add(&b).unwrap();
    assert_eq!(runner.read::<f32, P1>(&c), vec![3.0, 5.0]);
    assert_eq!(c.op(), OpKind::Add);
    assert_eq!(c.dtype(), DType::F32);
    assert_eq!(c.shape(), a.shape());
    assert_eq!(c.inputs(), &[a.to_any(), b.to_any()]);
    assert_eq!(runner.read::<f32, P1>(&a), vec![1.0, 2.0]);
    assert_eq!(runner.read::<f32, P1>(&b), vec![2.0, 3.0]);
}

pub fn test_add_i8_wraps<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[127i8, -128, 5], Shape::<P1>::new([3]));
    let b = runner.tensor(&[1i8, -1, -7], Shape::<P1>::new([3]));
    let c = a.add(&b).unwrap();
    assert_eq!(runner.read::<i8, P1>(&c), vec![-128, 127, -2]);
}

pub fn test_sub_u8_wraps<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[0u8, 10], Shape::<P1>::new([2]));
    let b = runner.tensor(&[1u8, 3], Shape::<P1>::new([2]));
    let c = a.sub(&b).unwrap();
    assert_eq!(c.op(), OpKind::Sub);
    assert_eq!(runner.read::<u8, P1>(&c), vec![255, 7]);
}

pub fn test_mul_f16<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(
        &[f16::from_f32(0.5), f16::from_f32(2.0), f16::from_f32(-3.0)],
        Shape::<P1>::new([3]),
    );
    let b = runner.tensor(
        &[f16::from_f32(4.0), f16::from_f32(0.25), f16::from_f32(2.0)],
        Shape::<P1>::new([3]),
    );
    let c = a.mul(&b).unwrap();
    assert_eq!(c.op(), OpKind::Mul);
    assert_close_f16(runner.read::<f16, P1>(&c), &[2.0, 0.5, -6.0]);
}

pub fn test_max_min_bf16<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(
        &[bf16::from_f32(1.5), bf16::from_f32(-2.0), bf16::from_f32(3.0)],
        Shape::<P1>::new([3]),
    );
    let b = runner.tensor(
        &[bf16::from_f32(0.5), bf16::from_f32(4.0), bf16::from_f32(3.0)],
        Shape::<P1>::new([3]),
    );
    let max = a.max(&b).unwrap();
    let min = a.min(&b).unwrap();
    assert_eq!(max.op(), OpKind::Max);
    assert_eq!(min.op(), OpKind::Min);
    assert_close_bf16(runner.read::<bf16, P1>(&max), &[1.5, 4.0, 3.0]);
    assert_close_bf16(runner.read::<bf16, P1>(&min), &[0.5, -2.0, 3.0]);
}

pub fn test_sub_rank2_fp64<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P2>: Variant,
{
    let a = runner.tensor(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::<P2>::new([2, 3]));
    let b = runner.tensor(&[6.0f64, 5.0, 4.0, 3.0, 2.0, 1.0], Shape::<P2>::new([2, 3]));
    let c = a.sub(&b).unwrap();
    assert_eq!(c.shape().dims(), &[2, 3]);
    assert_eq!(c.num_elements(), 6);
    assert_eq!(c.byte_size(), 48);
    assert_eq!(
        runner.read::<f64, P2>(&c),
        vec![-5.0, -3.0, -1.0, 1.0, 3.0, 5.0]
    );
}

pub fn test_add_rank5_u32<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P5>: Variant,
{
    let shape = Shape::<P5>::new([1, 2, 1, 2, 1]);
    let a = runner.tensor(&[1u32, 2, 3, 4], shape.clone());
    let b = runner.tensor(&[10u32, 20, 30, u32::MAX], shape);
    let c = a.add(&b).unwrap();
    assert_eq!(c.rank(), 5);
    assert_eq!(runner.read::<u32, P5>(&c), vec![11, 22, 33, 3]);
}

pub fn test_chained_ops<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1i32, -2, 3], Shape::<P1>::new([3]));
    let b = runner.tensor(&[4i32, 5, -6], Shape::<P1>::new([3]));
    let c = (&a + &b).unwrap();
    let d = (&c * &b).unwrap();
    let e = (&d - &a).unwrap();
    assert_eq!(runner.read::<i32, P1>(&e), vec![19, 17, 15]);
    assert_eq!(e.inputs(), &[d.to_any(), a.to_any()]);
    assert_eq!(d.inputs(), &[c.to_any(), b.to_any()]);
}

pub fn test_dtype_mismatch<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1.0f32, 2.0], Shape::<P1>::new([2]));
    let b = runner.tensor(&[1i32, 2], Shape::<P1>::new([2]));
    assert!(matches!(
        a.add(&b),
        Err(TensorError::DTypeMismatch(DType::F32, DType::I32))
    ));
}

pub fn test_shape_mismatch<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P2>: Variant,
{
    let a = runner.tensor(&[0.0f32; 6], Shape::<P2>::new([2, 3]));
    let b = runner.tensor(&[0.0f32; 6], Shape::<P2>::new([3, 2]));
    match a.mul(&b) {
        Err(TensorError::ShapeMismatch(left, right)) => {
            assert_eq!(left, vec![2, 3]);
            assert_eq!(right, vec![3, 2]);
        }
        other => panic!("expected a shape mismatch, got {other:?}"),
    }
}
