use crate::tensor_tests::{TestRunner, Variant};
use weave_tensor::backends::Backend;
use weave_tensor::dtype::DType;
use weave_tensor::graph::{leaves, node_count, topo_order};
use weave_tensor::op_kind::OpKind;
use weave_tensor::{P1, P2, P3, P4, P5, Rank, Shape, Tensor};

pub fn test_leaf_has_no_inputs<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1.0f32, 2.0, 3.0], Shape::<P1>::new([3]));
    assert!(a.is_leaf());
    assert!(a.inputs().is_empty());
    assert_eq!(a.op(), OpKind::Identity);
    assert!(!a.requires_grad());
    assert!(a.is_materialized());
}

pub fn test_identity_edges<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1.0f32, 2.0], Shape::<P1>::new([2]));
    let twin = runner.tensor(&[1.0f32, 2.0], Shape::<P1>::new([2]));
    assert_ne!(a, twin);

    let doubled = a.add(&a).unwrap();
    assert_eq!(doubled.inputs()[0].id(), a.id());
    assert_eq!(doubled.inputs()[1].id(), a.id());
    assert_ne!(doubled.inputs()[0].id(), twin.id());
    assert_eq!(runner.read::<f32, P1>(&doubled), vec![2.0, 4.0]);

    let mixed = a.add(&twin).unwrap();
    assert_ne!(mixed.inputs()[0], mixed.inputs()[1]);
}

pub fn test_topo_order<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
{
    let a = runner.tensor(&[1.0f32, 2.0], Shape::<P1>::new([2]));
    let b = runner.tensor(&[3.0f32, 4.0], Shape::<P1>::new([2]));
    let c = a.add(&b).unwrap();
    let d = c.mul(&a).unwrap();
    let root = d.to_any();

    let order = topo_order(&root).iter().map(|x| x.id()).collect::<Vec<_>>();
    assert_eq!(order, vec![a.id(), b.id(), c.id(), d.id()]);
    assert_eq!(node_count(&root), 4);
    assert_eq!(leaves(&root), vec![a.to_any(), b.to_any()]);
    assert_eq!(runner.read::<f32, P1>(&d), vec![4.0, 12.0]);
}

fn check_round_trip<T: TestRunner, R: Rank>(runner: &mut T, shape: Shape<R>)
where
    Tensor<T::B, R>: Variant,
{
    let num_elements = shape.num_elements().unwrap();
    let values = vec![1.0f32; num_elements as usize];
    let tensor = runner.tensor(&values, shape.clone());
    let any = tensor.to_any();
    assert_eq!(any.id(), tensor.id());
    assert_eq!(any.shape(), shape.to_vec());
    assert_eq!(any.rank(), R::KNOWN_LEN);
    assert_eq!(any.dtype(), DType::F32);
    assert_eq!(any.backend_kind(), T::B::KIND);
    assert_eq!(any.num_elements(), num_elements);
    let back = Tensor::<T::B, R>::try_from(any).unwrap();
    assert_eq!(back, tensor);
}

pub fn test_union_round_trip<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
    Tensor<T::B, P2>: Variant,
    Tensor<T::B, P3>: Variant,
    Tensor<T::B, P4>: Variant,
    Tensor<T::B, P5>: Variant,
{
    check_round_trip(runner, Shape::<P1>::new([3]));
    check_round_trip(runner, Shape::<P2>::new([2, 2]));
    check_round_trip(runner, Shape::<P3>::new([1, 2, 3]));
    check_round_trip(runner, Shape::<P4>::new([2, 1, 1, 2]));
    check_round_trip(runner, Shape::<P5>::new([1, 1, 2, 1, 1]));
}

pub fn test_union_rejects_wrong_rank<T: TestRunner>(runner: &mut T)
where
    Tensor<T::B, P1>: Variant,
    Tensor<T::B, P2>: Variant,
{
    let a = runner.tensor(&[1u16, 2], Shape::<P1>::new([2]));
    assert!(Tensor::<T::B, P2>::try_from(a.to_any()).is_err());
}
