//! ffnet: a minimal feed-forward neural network engine.
//!
//! Tensors with optional gradient buffers, three layer kinds (linear, ReLU,
//! softmax) with hand-derived backward rules, cross-entropy loss and plain
//! SGD. Everything runs single-threaded on `f64`.
//!
//! # Features
//!
//! - Row-major tensors with explicit deep copies and checked indexing.
//! - Manual backpropagation: one forward and one backward rule per layer kind,
//!   no tape or graph.
//! - A fused softmax + cross-entropy gradient seed for the output layer.
//! - Dataset parsing, a mini-batch trainer and a binary model format.
//!
//! # Modules
//!
//! - [`tensors`]: the tensor container and the [`tensor!`] literal macro.
//! - [`ops`]: differentiable primitives and their backward rules.
//! - [`layers`], [`model`]: the layer chain and its forward/backward driver.
//! - [`backprop`]: free-function form of the per-batch cycle.
//! - [`optim`]: SGD and gradient reset.
//! - [`data`], [`train`], [`config`]: datasets, training loop, settings.
//! - [`modelio`]: saving and loading trained models.
//!
//! # Example
//!
//! ```rust
//! use ffnet::layers::LayerType;
//! use ffnet::model::Model;
//! use ffnet::{ops, tensor};
//!
//! let mut model = Model::new(2);
//! model.add_layer(LayerType::Linear, 3, 2)?;
//! model.add_layer(LayerType::Softmax, 2, 2)?;
//!
//! let x = tensor!([[0.1, 0.2, 0.3]]);
//! let y = tensor!([[1.0]]);
//! let before = ops::cross_entropy_loss(&model.forward(&x)?, &y)?;
//!
//! for _ in 0..20 {
//!     let mut pred = model.forward(&x)?;
//!     model.backward(&mut pred, &y)?;
//!     model.sgd_step(0.5);
//!     model.zero_grad();
//! }
//!
//! let after = ops::cross_entropy_loss(&model.forward(&x)?, &y)?;
//! assert!(after < before);
//! # Ok::<(), ffnet::Error>(())
//! ```

pub mod approx;
pub mod backprop;
pub mod config;
pub mod data;
pub mod layers;
pub mod model;
pub mod modelio;
pub mod ops;
pub mod optim;
pub mod tensors;
pub mod train;

mod error;
pub use error::{Error, Result};
