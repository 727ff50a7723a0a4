//! Parameter updates.
//!
//! Updates and gradient resets are separate calls. [`sgd`] leaves the
//! gradient in place; [`zero_grad`] must follow once per optimizer step or
//! the next backward call accumulates on top of the old gradient.

use crate::model::Model;
use crate::tensors::Tensor;

/// In-place SGD on one tensor: `param -= lr * grad`.
///
/// Untracked tensors are left unchanged.
pub fn sgd(w: &mut Tensor, lr: f64) {
    if let (data, Some(grad)) = w.split_mut() {
        for (param, g) in data.iter_mut().zip(grad.iter()) {
            *param -= lr * *g;
        }
    }
}

/// Applies [`sgd`] to the weights and bias of every Linear layer.
/// ReLU and Softmax layers own no parameters and are skipped.
pub fn sgd_step(model: &mut Model, learning_rate: f64) {
    for linear in model
        .layers_mut()
        .iter_mut()
        .filter_map(|l| l.linear_params_mut())
    {
        for param in linear.params_mut() {
            sgd(param, learning_rate);
        }
    }
}

/// Resets every Linear layer's weight and bias gradients to zero.
pub fn zero_grad(model: &mut Model) {
    for linear in model
        .layers_mut()
        .iter_mut()
        .filter_map(|l| l.linear_params_mut())
    {
        for param in linear.params_mut() {
            param.zero_grad();
        }
    }
}
