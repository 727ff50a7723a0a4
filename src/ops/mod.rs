//! Differentiable primitives.
//!
//! # Operations
//!
//! Every forward primitive is a pure function from tensors to a freshly
//! allocated tensor. Its backward rule is a separate function that reads the
//! upstream gradient from `upstream.grad` and writes into the `grad` buffers
//! of its operands. There is no tape: the model's layers call these rules in
//! reverse order by hand.
//!
//! ## Implemented Ops
//!
//! - `matmul` / `matmul_backward`: 2-D product; backward *accumulates*
//! - `add_bias` / `bias_backward`: row-wise bias; backward *accumulates*
//! - `relu` / `relu_backward`: backward *overwrites*
//! - `softmax` / `softmax_backward`: row-wise; backward *overwrites*
//! - `cross_entropy_loss` / `softmax_cross_entropy_grad`: loss and the fused
//!   softmax + cross-entropy gradient seed
//!
//! ## Shape Rules
//!
//! - No broadcasting other than the documented bias row broadcast
//! - Shapes are checked before any output is written; violations are
//!   [`Error::Shape`](crate::Error::Shape)

mod bias;
pub use self::bias::{add_bias, bias_backward};

mod loss;
pub use self::loss::{LOG_FLOOR, argmax_rows, cross_entropy_loss, softmax_cross_entropy_grad};

mod matmul;
pub use self::matmul::{matmul, matmul_backward};

mod relu;
pub use self::relu::{relu, relu_backward};

mod softmax;
pub use self::softmax::{softmax, softmax_backward};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::{all_close, approx_eq};
    use crate::tensors::Tensor;
    use crate::{Error, tensor};

    fn tracked(t: Tensor) -> Tensor {
        t.snapshot().unwrap()
    }

    fn with_grad(shape: &[usize], grad: &[f64]) -> Tensor {
        let mut t = Tensor::new(shape, true).unwrap();
        t.grad_mut().unwrap().copy_from_slice(grad);
        t
    }

    #[test]
    fn matmul_forward_matches_hand_computation() {
        let a = tensor!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let b = tensor!([[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);

        let c = matmul(&a, &b).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.data(), &[4.0, 5.0, 10.0, 11.0]);
        assert!(!c.requires_grad());

        let c = matmul(&tracked(a), &b).unwrap();
        assert!(c.requires_grad());
    }

    #[test]
    fn matmul_rejects_mismatched_inner_dimensions() {
        let a = Tensor::ones(vec![2, 3]).unwrap();
        let b = Tensor::ones(vec![4, 2]).unwrap();
        assert!(matches!(matmul(&a, &b), Err(Error::Shape { .. })));

        let v = Tensor::ones(vec![3]).unwrap();
        assert!(matches!(matmul(&v, &b), Err(Error::Shape { .. })));
    }

    #[test]
    fn matmul_backward_accumulates_both_gradients() {
        let mut a = tracked(tensor!([[1.0, 2.0], [3.0, 4.0]]));
        let mut b = tracked(tensor!([[5.0, 6.0], [7.0, 8.0]]));
        let up = with_grad(&[2, 2], &[1.0, 0.0, 0.0, 1.0]);

        matmul_backward(&mut a, &mut b, &up).unwrap();
        // identity upstream: dA = Bᵗ, dB = Aᵗ
        assert_eq!(a.grad().unwrap(), &[5.0, 7.0, 6.0, 8.0]);
        assert_eq!(b.grad().unwrap(), &[1.0, 3.0, 2.0, 4.0]);

        matmul_backward(&mut a, &mut b, &up).unwrap();
        assert_eq!(a.grad().unwrap(), &[10.0, 14.0, 12.0, 16.0]);
        assert_eq!(b.grad().unwrap(), &[2.0, 6.0, 4.0, 8.0]);
    }

    #[test]
    fn matmul_backward_checks_before_writing() {
        let mut a = tracked(tensor!([[1.0, 2.0], [3.0, 4.0]]));
        let mut b = tensor!([[5.0, 6.0], [7.0, 8.0]]);
        let up = with_grad(&[2, 2], &[1.0; 4]);

        assert!(matches!(
            matmul_backward(&mut a, &mut b, &up),
            Err(Error::GradNotTracked { .. })
        ));
        assert_eq!(a.grad().unwrap(), &[0.0; 4]);

        let mut b = tracked(b);
        let wrong = with_grad(&[2, 3], &[1.0; 6]);
        assert!(matches!(
            matmul_backward(&mut a, &mut b, &wrong),
            Err(Error::Shape { .. })
        ));
        assert_eq!(a.grad().unwrap(), &[0.0; 4]);
    }

    #[test]
    fn add_bias_broadcasts_over_rows() {
        let a = tensor!([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let bias = tensor!([10.0, 20.0]);
        let out = add_bias(&a, &bias).unwrap();
        assert_eq!(out.data(), &[11.0, 22.0, 13.0, 24.0, 15.0, 26.0]);

        let wrong = tensor!([1.0, 2.0, 3.0]);
        assert!(matches!(add_bias(&a, &wrong), Err(Error::Shape { .. })));
    }

    #[test]
    fn bias_backward_sums_over_batch() {
        let mut bias = tracked(tensor!([0.0, 0.0]));
        let up = with_grad(&[3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        bias_backward(&mut bias, &up).unwrap();
        bias_backward(&mut bias, &up).unwrap();
        assert_eq!(bias.grad().unwrap(), &[18.0, 24.0]);
    }

    #[test]
    fn relu_forward_and_backward() {
        let input = tracked(tensor!([-1.0, 0.0, 1.0]));
        let out = relu(&input).unwrap();
        assert_eq!(out.data(), &[0.0, 0.0, 1.0]);

        let mut input = input;
        let up = with_grad(&[3], &[1.0, 1.0, 1.0]);
        relu_backward(&mut input, &up).unwrap();
        // strict mask: zero input gets zero gradient
        assert_eq!(input.grad().unwrap(), &[0.0, 0.0, 1.0]);

        // overwrite, not accumulate
        relu_backward(&mut input, &up).unwrap();
        assert_eq!(input.grad().unwrap(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn softmax_rows_are_distributions() {
        let x = tensor!([[1.0, 2.0, 3.0], [-5.0, 0.0, 5.0], [1000.0, 1000.0, 999.0]]);
        let y = softmax(&x).unwrap();
        for row in y.data().chunks(3) {
            assert!(approx_eq(row.iter().sum::<f64>(), 1.0, 1e-9));
            assert!(row.iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let x = tensor!([[0.5, -1.5, 2.0, 0.0]]);
        let shifted = Tensor::from_vec(
            vec![1, 4],
            x.data().iter().map(|v| v + 123.25).collect(),
            false,
        )
        .unwrap();
        let a = softmax(&x).unwrap();
        let b = softmax(&shifted).unwrap();
        assert!(all_close(a.data(), b.data(), 1e-12));
    }

    #[test]
    fn softmax_backward_matches_finite_differences() {
        let x = tensor!([[0.2, -0.4, 1.1]]);
        let y = softmax(&x).unwrap();
        let dy = [0.3, -1.0, 0.5];

        let mut input = tracked(x.clone());
        let up = with_grad(&[1, 3], &dy);
        softmax_backward(&mut input, &y, &up).unwrap();

        let eps = 1e-6;
        for j in 0..3 {
            let mut plus = x.clone();
            plus.data_mut()[j] += eps;
            let mut minus = x.clone();
            minus.data_mut()[j] -= eps;
            let fp = softmax(&plus).unwrap();
            let fm = softmax(&minus).unwrap();
            let numeric: f64 = (0..3)
                .map(|i| dy[i] * (fp.data()[i] - fm.data()[i]) / (2.0 * eps))
                .sum();
            assert!(approx_eq(input.grad().unwrap()[j], numeric, 1e-6));
        }
    }

    #[test]
    fn cross_entropy_of_confident_prediction() {
        let pred = tensor!([[0.9, 0.1]]);
        let labels = tensor!([[0.0]]);
        let loss = cross_entropy_loss(&pred, &labels).unwrap();
        assert!(approx_eq(loss, -(0.9f64).ln(), 1e-12));
        assert!(approx_eq(loss, 0.1054, 1e-4));
    }

    #[test]
    fn cross_entropy_floors_zero_probability() {
        let pred = tensor!([[1.0, 0.0]]);
        let labels = tensor!([[1.0]]);
        let loss = cross_entropy_loss(&pred, &labels).unwrap();
        assert!(approx_eq(loss, -LOG_FLOOR.ln(), 1e-9));
    }

    #[test]
    fn cross_entropy_validates_labels() {
        let pred = tensor!([[0.5, 0.5], [0.5, 0.5]]);
        assert!(matches!(
            cross_entropy_loss(&pred, &tensor!([[0.0]])),
            Err(Error::Shape { .. })
        ));
        assert!(matches!(
            cross_entropy_loss(&pred, &tensor!([[0.0], [2.0]])),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            cross_entropy_loss(&pred, &tensor!([[0.5], [1.0]])),
            Err(Error::Shape { .. })
        ));
        // one label per row, as a column
        assert!(matches!(
            cross_entropy_loss(&pred, &tensor!([[0.0, 1.0]])),
            Err(Error::Shape { .. })
        ));
        assert!(matches!(
            cross_entropy_loss(&pred, &tensor!([0.0, 1.0])),
            Err(Error::Shape { .. })
        ));
    }

    #[test]
    fn fused_gradient_seed() {
        let mut pred = tracked(tensor!([[0.7, 0.2, 0.1], [0.1, 0.1, 0.8]]));
        let labels = tensor!([[0.0], [1.0]]);
        softmax_cross_entropy_grad(&mut pred, &labels).unwrap();
        let expected = [-0.15, 0.1, 0.05, 0.05, -0.45, 0.4];
        assert!(all_close(pred.grad().unwrap(), &expected, 1e-12));

        let mut untracked = tensor!([[0.5, 0.5]]);
        assert!(matches!(
            softmax_cross_entropy_grad(&mut untracked, &tensor!([[1.0]])),
            Err(Error::GradNotTracked { .. })
        ));
    }

    #[test]
    fn argmax_picks_first_maximum() {
        let pred = tensor!([[0.1, 0.7, 0.2], [0.4, 0.4, 0.2]]);
        assert_eq!(argmax_rows(&pred).unwrap(), vec![1, 0]);
    }
}
