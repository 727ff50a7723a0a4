use crate::tensors::Tensor;
use crate::{Error, Result};

/// Softmax along each row of a 2-D tensor (one row = one example).
///
/// The row maximum is subtracted before exponentiating, so the result is
/// unchanged by adding a constant to a row and never overflows.
pub fn softmax(input: &Tensor) -> Result<Tensor> {
    let (_, cols) = input.matrix_dims("softmax")?;
    let mut out = Tensor::new(input.shape(), input.requires_grad())?;

    out.data_mut()
        .chunks_mut(cols)
        .zip(input.data().chunks(cols))
        .for_each(|(y, x)| {
            let max_val = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut exp_sum = 0.0;
            for (yi, &xi) in y.iter_mut().zip(x) {
                *yi = (xi - max_val).exp();
                exp_sum += *yi;
            }
            for yi in y.iter_mut() {
                *yi /= exp_sum;
            }
        });

    Ok(out)
}

/// Generic softmax backward rule, overwriting `input.grad` with the
/// Jacobian-vector product `y * (dy - <y, dy>)` per row.
///
/// `output` must be the result of `softmax(input)`. A softmax feeding straight
/// into cross-entropy should be seeded with
/// [`softmax_cross_entropy_grad`](super::softmax_cross_entropy_grad) instead.
pub fn softmax_backward(input: &mut Tensor, output: &Tensor, upstream: &Tensor) -> Result<()> {
    const OP: &str = "softmax_backward";

    let (_, cols) = output.matrix_dims(OP)?;
    if input.shape() != output.shape() || upstream.shape() != output.shape() {
        return Err(Error::shape(
            OP,
            format!(
                "input {:?}, output {:?} and upstream {:?} must agree",
                input.shape(),
                output.shape(),
                upstream.shape()
            ),
        ));
    }
    let g = upstream.tracked_grad(OP)?;
    let grad = input.tracked_grad_mut(OP)?;

    for ((dx, y), dy) in grad
        .chunks_mut(cols)
        .zip(output.data().chunks(cols))
        .zip(g.chunks(cols))
    {
        let dot: f64 = y.iter().zip(dy).map(|(&yi, &dyi)| yi * dyi).sum();
        for ((dxj, &yj), &dyj) in dx.iter_mut().zip(y).zip(dy) {
            *dxj = yj * (dyj - dot);
        }
    }

    Ok(())
}
