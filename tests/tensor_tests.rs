use ffnet::approx::{all_close, approx_eq};
use ffnet::ops::{
    add_bias, cross_entropy_loss, matmul, matmul_backward, relu, relu_backward, softmax,
};
use ffnet::tensors::Tensor;
use ffnet::{Error, tensor};
use rand::{SeedableRng, rngs::StdRng};

#[test]
fn test_tensor_creation() {
    let t = Tensor::from_vec(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0], false).unwrap();
    assert_eq!(t.shape(), &[2, 2]);
    assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
    assert!(t.grad().is_none());

    assert!(matches!(
        Tensor::from_vec(vec![2, 2], vec![1.0, 2.0, 3.0], false),
        Err(Error::Shape { .. })
    ));
}

#[test]
fn test_tensor_macro() {
    let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(t.shape(), &[2, 2]);
    assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!((t.rows(), t.cols()), (2, 2));
}

#[test]
fn test_shape_invariant_holds_for_every_factory() {
    let mut rng = StdRng::seed_from_u64(9);
    let tensors = [
        Tensor::new(vec![3, 5], true).unwrap(),
        Tensor::zeros(vec![7]).unwrap(),
        Tensor::ones(vec![2, 2]).unwrap(),
        Tensor::random_with(&mut rng, vec![4, 3], true, -1.0, 1.0).unwrap(),
        Tensor::ones(vec![2, 6]).unwrap().reshape(vec![3, 4]).unwrap(),
        tensor!([1.0, 2.0]).snapshot().unwrap(),
    ];

    for t in &tensors {
        assert_eq!(t.len(), t.shape().iter().product::<usize>());
        if let Some(g) = t.grad() {
            assert_eq!(g.len(), t.len());
        }
    }
}

#[test]
fn test_reshape_is_a_deep_copy() {
    let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let mut b = a.reshape(vec![3, 2]).unwrap();
    b.set(&[0, 0], 100.0).unwrap();
    assert_eq!(a.get(&[0, 0]).unwrap(), 1.0);
    assert!(matches!(a.reshape(vec![4, 2]), Err(Error::Shape { .. })));
}

#[test]
fn test_index_errors() {
    let t = Tensor::zeros(vec![2, 3]).unwrap();
    assert!(matches!(
        t.get(&[2, 0]),
        Err(Error::Range { dim: 0, index: 2, size: 2 })
    ));
    assert!(matches!(t.get(&[0]), Err(Error::Shape { .. })));
}

#[test]
fn test_random_bounds_are_validated() {
    assert!(matches!(
        Tensor::random(vec![2], false, 1.0, 1.0),
        Err(Error::InvalidBounds { .. })
    ));
    let t = Tensor::random(vec![50], false, 0.0, 0.5).unwrap();
    assert!(t.data().iter().all(|x| (0.0..0.5).contains(x)));
}

#[test]
fn test_linear_forward_by_hand() {
    let x = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let w = tensor!([[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
    let b = tensor!([0.5, -0.5]);

    let y = add_bias(&matmul(&x, &w).unwrap(), &b).unwrap();
    assert_eq!(y.data(), &[4.5, 4.5, 10.5, 10.5]);
}

#[test]
fn test_matmul_backprop() {
    let mut a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).snapshot().unwrap();
    let mut b = tensor!([[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]).snapshot().unwrap();

    let mut out = matmul(&a, &b).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    out.grad_mut().unwrap().fill(1.0);

    matmul_backward(&mut a, &mut b, &out).unwrap();
    // dA = 1 · Bᵗ, dB = Aᵗ · 1
    assert_eq!(a.grad().unwrap(), &[15.0, 19.0, 23.0, 15.0, 19.0, 23.0]);
    assert_eq!(b.grad().unwrap(), &[5.0, 5.0, 7.0, 7.0, 9.0, 9.0]);
}

#[test]
fn test_relu_backprop() {
    let mut input = tensor!([-1.0, 0.0, 2.0]).snapshot().unwrap();
    let mut out = relu(&input).unwrap();
    assert_eq!(out.data(), &[0.0, 0.0, 2.0]);

    out.grad_mut().unwrap().fill(1.0);
    relu_backward(&mut input, &out).unwrap();
    assert_eq!(input.grad().unwrap(), &[0.0, 0.0, 1.0]);
}

#[test]
fn test_softmax_rows_are_distributions() {
    let s = softmax(&tensor!([[1000.0, 1001.0, 1002.0], [-3.0, 0.0, 3.0]])).unwrap();
    for row in s.data().chunks(3) {
        assert!(approx_eq(row.iter().sum::<f64>(), 1.0, 1e-9));
        assert!(row.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    let shifted = softmax(&tensor!([[0.0, 1.0, 2.0]])).unwrap();
    assert!(all_close(&s.data()[..3], shifted.data(), 1e-12));
}

#[test]
fn test_cross_entropy_sanity() {
    let loss = cross_entropy_loss(&tensor!([[0.9, 0.1]]), &tensor!([[0.0]])).unwrap();
    assert!(approx_eq(loss, -(0.9f64).ln(), 1e-12));
    assert!(approx_eq(loss, 0.1054, 1e-4));
}
