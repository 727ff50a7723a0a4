use crate::tensors::Tensor;
use crate::{Error, Result};

/// Adds a 1-D `bias` to every row of a 2-D tensor.
///
/// # Errors
///
/// [`Error::Shape`] unless `a` is `[rows, cols]` and `bias` is `[cols]`.
pub fn add_bias(a: &Tensor, bias: &Tensor) -> Result<Tensor> {
    let (rows, cols) = a.matrix_dims("add_bias")?;
    if bias.shape() != [cols] {
        return Err(Error::shape(
            "add_bias",
            format!("bias {:?} does not match row width {cols}", bias.shape()),
        ));
    }

    let mut out = Tensor::new(vec![rows, cols], a.requires_grad() || bias.requires_grad())?;
    out.data_mut()
        .chunks_mut(cols)
        .zip(a.data().chunks(cols))
        .for_each(|(out_row, in_row)| {
            for ((y, &x), &b) in out_row.iter_mut().zip(in_row).zip(bias.data()) {
                *y = x + b;
            }
        });

    Ok(out)
}

/// Backward rule of [`add_bias`]: accumulates the column sums of
/// `upstream.grad` over the batch into `bias.grad`.
pub fn bias_backward(bias: &mut Tensor, upstream: &Tensor) -> Result<()> {
    const OP: &str = "bias_backward";

    let (_, cols) = upstream.matrix_dims(OP)?;
    if bias.shape() != [cols] {
        return Err(Error::shape(
            OP,
            format!("bias {:?} does not match gradient width {cols}", bias.shape()),
        ));
    }
    let g = upstream.tracked_grad(OP)?;
    let bias_grad = bias.tracked_grad_mut(OP)?;

    for row in g.chunks(cols) {
        for (acc, &dy) in bias_grad.iter_mut().zip(row) {
            *acc += dy;
        }
    }

    Ok(())
}
