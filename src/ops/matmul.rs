use crate::tensors::Tensor;
use crate::{Error, Result};

/// Performs a matrix multiplication `C = A × B` on two 2D tensors (`A: m×n`, `B: n×p`).
///
/// The product is the plain triple loop; `C` tracks gradients if either
/// operand does.
///
/// # Returns
///
/// - Output tensor of shape `[m, p]`
///
/// # Errors
///
/// - [`Error::Shape`] if either operand is not 2-D or the inner dimensions differ.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (m, n) = a.matrix_dims("matmul")?;
    let (k, p) = b.matrix_dims("matmul")?;
    if n != k {
        return Err(Error::shape(
            "matmul",
            format!("inner dimensions differ: {m}x{n} * {k}x{p}"),
        ));
    }

    let mut out = Tensor::new(vec![m, p], a.requires_grad() || b.requires_grad())?;
    let (a_data, b_data) = (a.data(), b.data());
    let c = out.data_mut();

    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0;
            for l in 0..n {
                sum += a_data[i * n + l] * b_data[l * p + j];
            }
            c[i * p + j] = sum;
        }
    }

    Ok(out)
}

/// Backward rule of [`matmul`].
///
/// Given the gradient of the product held in `upstream.grad` (shape `[m, p]`),
/// accumulates
///
/// - `upstream · Bᵗ` into `a.grad`
/// - `Aᵗ · upstream` into `b.grad`
///
/// Both are `+=`: a tensor used by several products sums their contributions.
///
/// # Errors
///
/// - [`Error::Shape`] if `a`, `b` and `upstream` do not form an `[m,n]·[n,p] = [m,p]` product
/// - [`Error::GradNotTracked`] if any of the three lacks a gradient buffer
///
/// Nothing is written unless every check passes.
pub fn matmul_backward(a: &mut Tensor, b: &mut Tensor, upstream: &Tensor) -> Result<()> {
    const OP: &str = "matmul_backward";

    let (m, n) = a.matrix_dims(OP)?;
    let (k, p) = b.matrix_dims(OP)?;
    let (um, up) = upstream.matrix_dims(OP)?;
    if n != k || um != m || up != p {
        return Err(Error::shape(
            OP,
            format!("{m}x{n} * {k}x{p} cannot produce an upstream gradient of {um}x{up}"),
        ));
    }
    if !a.requires_grad() || !b.requires_grad() {
        return Err(Error::GradNotTracked { op: OP });
    }
    let g = upstream.tracked_grad(OP)?;

    // dA[i, j] += sum_k g[i, k] * B[j, k]
    {
        let b_data = b.data();
        let a_grad = a.tracked_grad_mut(OP)?;
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..p {
                    sum += g[i * p + l] * b_data[j * p + l];
                }
                a_grad[i * n + j] += sum;
            }
        }
    }

    // dB[j, k] += sum_i A[i, j] * g[i, k]
    let a_data = a.data();
    let b_grad = b.tracked_grad_mut(OP)?;
    for j in 0..n {
        for l in 0..p {
            let mut sum = 0.0;
            for i in 0..m {
                sum += a_data[i * n + j] * g[i * p + l];
            }
            b_grad[j * p + l] += sum;
        }
    }

    Ok(())
}
