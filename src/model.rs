//! The layer chain and its forward/backward driver.
//!
//! # Model
//!
//! A [`Model`] is an ordered, fixed-capacity sequence of [`Layer`]s. Forward
//! visits them first to last, backward last to first; there is no branching.
//!
//! ## Per-batch cycle
//!
//! ```rust
//! use ffnet::layers::LayerType;
//! use ffnet::model::Model;
//! use ffnet::{ops, tensor};
//!
//! let mut model = Model::new(2);
//! model.add_layer(LayerType::Linear, 2, 2)?;
//! model.add_layer(LayerType::Softmax, 2, 2)?;
//!
//! let x = tensor!([[0.5, -1.0], [1.0, 0.25]]);
//! let y = tensor!([[1.0], [0.0]]);
//!
//! let mut pred = model.forward(&x)?;
//! let _loss = ops::cross_entropy_loss(&pred, &y)?;
//! model.backward(&mut pred, &y)?;
//! model.sgd_step(0.01);
//! model.zero_grad();
//! # Ok::<(), ffnet::Error>(())
//! ```
//!
//! ## Gradient accumulation
//!
//! Parameter gradients are accumulated with `+=`. Two backward calls without
//! an intervening [`Model::zero_grad`] leave exactly twice the gradient of
//! one. Callers that do not want accumulation must zero after every step.

use log::{debug, trace};
use rand::Rng;

use crate::layers::{Layer, LayerType};
use crate::ops::softmax_cross_entropy_grad;
use crate::optim;
use crate::tensors::Tensor;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    layers: Vec<Layer>,
    capacity: usize,
}

impl Model {
    /// An empty model that will accept at most `max_layers` layers.
    pub fn new(max_layers: usize) -> Self {
        Self {
            layers: Vec::new(),
            capacity: max_layers,
        }
    }

    /// Appends a freshly initialised layer.
    ///
    /// # Errors
    /// - [`Error::Capacity`] if the model is full; existing layers are untouched.
    /// - [`Error::Allocation`] for a zero Linear width.
    pub fn add_layer(
        &mut self,
        layer_type: LayerType,
        in_width: usize,
        out_width: usize,
    ) -> Result<()> {
        self.add_layer_with(&mut rand::rng(), layer_type, in_width, out_width)
    }

    /// [`Model::add_layer`] drawing Linear weights from `rng`.
    pub fn add_layer_with<R: Rng>(
        &mut self,
        rng: &mut R,
        layer_type: LayerType,
        in_width: usize,
        out_width: usize,
    ) -> Result<()> {
        self.ensure_room()?;
        let layer = Layer::new_with(rng, layer_type, in_width, out_width)?;
        self.push(layer)
    }

    /// Appends an already built layer.
    pub fn push(&mut self, layer: Layer) -> Result<()> {
        self.ensure_room()?;
        debug!(
            "layer {}: {} {}x{}",
            self.layers.len(),
            layer.layer_type(),
            layer.widths().0,
            layer.widths().1
        );
        self.layers.push(layer);
        Ok(())
    }

    fn ensure_room(&self) -> Result<()> {
        if self.layers.len() >= self.capacity {
            return Err(Error::Capacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of trainable scalars across all Linear layers.
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .filter_map(Layer::linear_params)
            .map(|p| p.weights().len() + p.bias().len())
            .sum()
    }

    /// Runs `input` (`[batch, features]`) through every layer.
    ///
    /// Each layer stores a tracked snapshot of its input and its output,
    /// replacing what the previous call left there.
    ///
    /// # Returns
    /// A copy of the last layer's output; mutating it does not touch the model.
    ///
    /// # Errors
    /// - [`Error::EmptyModel`] if no layers were added.
    /// - [`Error::Shape`] if `input` is not 2-D or widths do not chain.
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        if self.layers.is_empty() {
            return Err(Error::EmptyModel);
        }
        input.matrix_dims("forward")?;
        trace!("forward on batch {:?}", input.shape());

        let mut x = input;
        for layer in self.layers.iter_mut() {
            x = layer.forward(x)?;
        }

        Ok(x.clone())
    }

    /// Backpropagates the softmax + cross-entropy gradient of `prediction`
    /// against `actual` (`[batch, 1]` class indices) through the chain.
    ///
    /// `prediction.grad` is overwritten with the seed. Every layer's
    /// `input.grad` is overwritten with the gradient at that point of the
    /// chain, while weight and bias gradients accumulate.
    ///
    /// # Errors
    /// - [`Error::EmptyModel`] if no layers were added.
    /// - [`Error::UnsupportedLayer`] unless the last layer is Softmax.
    /// - [`Error::MissingActivations`] if some layer has not seen a forward pass.
    /// - [`Error::Shape`] / [`Error::Range`] for inconsistent labels or a
    ///   prediction that does not match the last forward output.
    pub fn backward(&mut self, prediction: &mut Tensor, actual: &Tensor) -> Result<()> {
        let last = self.layers.len().checked_sub(1).ok_or(Error::EmptyModel)?;
        let tail = self.layers[last].layer_type();
        if tail != LayerType::Softmax {
            return Err(Error::UnsupportedLayer(format!(
                "backward needs a softmax output layer, found {tail}"
            )));
        }
        if let Some(layer) = self.layers.iter().position(|l| !l.has_activations()) {
            return Err(Error::MissingActivations { layer });
        }

        softmax_cross_entropy_grad(prediction, actual)?;

        let mut upstream: &Tensor = prediction;
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            layer.backward(i, upstream, i == last)?;
            upstream = layer.input().ok_or(Error::MissingActivations { layer: i })?;
        }

        Ok(())
    }

    /// Plain SGD over every Linear layer's parameters.
    pub fn sgd_step(&mut self, learning_rate: f64) {
        optim::sgd_step(self, learning_rate);
    }

    /// Clears every Linear layer's parameter gradients.
    pub fn zero_grad(&mut self) {
        optim::zero_grad(self);
    }
}
