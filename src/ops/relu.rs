use crate::tensors::Tensor;
use crate::{Error, Result};

/// Applies a `ReLU` activation function element-wise on the input tensor:
/// `$$ f(x) = \\max(0, x) $$`
///
/// # Returns
///
/// - Output tensor of same shape, tracking gradients iff `input` does
pub fn relu(input: &Tensor) -> Result<Tensor> {
    let mut out = Tensor::new(input.shape(), input.requires_grad())?;
    out.data_mut()
        .iter_mut()
        .zip(input.data())
        .for_each(|(y, &x)| *y = x.max(0.0));
    Ok(out)
}

/// Propagates `upstream.grad` through `ReLU`, overwriting `input.grad`:
/// `$$ \\frac{\\partial f}{\\partial x} = 1 \\text{ if } x > 0 \\text{ else } 0 $$`
///
/// # Notes
///
/// - The mask comes from `input.data`; the comparison is strict, so the
///   gradient at exactly zero is zero.
pub fn relu_backward(input: &mut Tensor, upstream: &Tensor) -> Result<()> {
    const OP: &str = "relu_backward";

    if input.shape() != upstream.shape() {
        return Err(Error::shape(
            OP,
            format!("input {:?} vs upstream {:?}", input.shape(), upstream.shape()),
        ));
    }
    let g = upstream.tracked_grad(OP)?;
    let (data, grad) = input.split_mut();
    let grad = grad.ok_or(Error::GradNotTracked { op: OP })?;

    grad.iter_mut()
        .zip(data.iter())
        .zip(g)
        .for_each(|((dx, &x), &dy)| {
            *dx = if x > 0.0 { dy } else { 0.0 };
        });

    Ok(())
}
