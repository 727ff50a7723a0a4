//! Free-function surface for the per-batch training cycle.
//!
//! # Cycle
//!
//! A driver builds a model once, then repeats for every batch:
//!
//! 1. [`forward`] the `[batch, features]` inputs to get a prediction
//! 2. [`cross_entropy_loss`] against `[batch, 1]` class labels
//! 3. [`backward`] to seed and propagate gradients
//! 4. [`sgd_step`] to update Linear parameters
//! 5. [`zero_grad`] before the next batch
//!
//! Skipping step 5 makes the next backward call accumulate on top of the
//! current gradients. That is the intended way to sum gradients over several
//! micro-batches, and a bug everywhere else.
//!
//! ```rust
//! use ffnet::backprop::{backward, cross_entropy_loss, forward, new_model, sgd_step, zero_grad};
//! use ffnet::layers::LayerType;
//! use ffnet::tensor;
//!
//! let mut model = new_model(3);
//! model.add_layer(LayerType::Linear, 2, 3)?;
//! model.add_layer(LayerType::ReLU, 3, 3)?;
//! model.add_layer(LayerType::Softmax, 3, 3)?;
//!
//! let x = tensor!([[1.0, 0.0], [0.0, 1.0]]);
//! let y = tensor!([[2.0], [0.0]]);
//!
//! let mut pred = forward(&mut model, &x)?;
//! let loss = cross_entropy_loss(&pred, &y)?;
//! assert!(loss > 0.0);
//! backward(&mut model, &mut pred, &y)?;
//! sgd_step(&mut model, 0.01);
//! zero_grad(&mut model);
//! # Ok::<(), ffnet::Error>(())
//! ```

use crate::Result;
use crate::model::Model;
use crate::tensors::Tensor;

pub use crate::ops::cross_entropy_loss;
pub use crate::optim::{sgd_step, zero_grad};

/// An empty model accepting at most `max_layers` layers.
pub fn new_model(max_layers: usize) -> Model {
    Model::new(max_layers)
}

/// See [`Model::forward`].
pub fn forward(model: &mut Model, input: &Tensor) -> Result<Tensor> {
    model.forward(input)
}

/// See [`Model::backward`].
pub fn backward(model: &mut Model, prediction: &mut Tensor, actual: &Tensor) -> Result<()> {
    model.backward(prediction, actual)
}
