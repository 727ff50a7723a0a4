//! Layer primitives.
//!
//! A [`Layer`] is one stage of the model's chain. Its kind is a closed set
//! ([`LayerKind`]): an affine `Linear` map owning trainable weights and bias,
//! or one of the parameter-free `ReLU` / `Softmax` activations.
//!
//! Every layer also keeps the activations of the most recent forward call:
//! `input`, a gradient-tracked deep copy of what it was fed, and `output`, what
//! it produced. Each forward call replaces both; backward reads them and
//! leaves the gradient that flows out of the layer in `input.grad`.

use core::fmt;

use log::trace;
use rand::Rng;

use crate::ops::{
    add_bias, bias_backward, matmul, matmul_backward, relu, relu_backward, softmax,
    softmax_backward,
};
use crate::tensors::{DEFAULT_RAND_HIGH, DEFAULT_RAND_LOW, Tensor};
use crate::{Error, Result};

/// The tag of a layer, as passed to [`Model::add_layer`](crate::model::Model::add_layer).
///
/// The numeric values are the tags written by [`modelio`](crate::modelio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LayerType {
    Linear = 1,
    ReLU = 2,
    Softmax = 3,
}

impl TryFrom<u8> for LayerType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Linear),
            2 => Ok(Self::ReLU),
            3 => Ok(Self::Softmax),
            _ => Err(Error::UnsupportedLayer(format!("unknown layer tag {value}"))),
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::ReLU => "relu",
            Self::Softmax => "softmax",
        })
    }
}

/// Trainable parameters of an affine layer: `y = x · W + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// Shape `[in, out]`.
    pub(crate) weights: Tensor,
    /// Shape `[out]`.
    pub(crate) bias: Tensor,
}

impl Linear {
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Mutable parameter pair, weights first.
    pub fn params_mut(&mut self) -> [&mut Tensor; 2] {
        [&mut self.weights, &mut self.bias]
    }
}

/// What a layer computes.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Linear(Linear),
    ReLU,
    Softmax,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    kind: LayerKind,
    in_width: usize,
    out_width: usize,
    input: Option<Tensor>,
    output: Option<Tensor>,
}

impl Layer {
    /// Builds a layer, drawing Linear weights from the thread-local generator.
    pub fn new(layer_type: LayerType, in_width: usize, out_width: usize) -> Result<Self> {
        Self::new_with(&mut rand::rng(), layer_type, in_width, out_width)
    }

    /// Builds a layer. Linear weights are uniform in `[-1, 1)` and the bias
    /// starts at zero, both gradient-tracked; activations own no parameters.
    ///
    /// # Errors
    /// [`Error::Allocation`] if a Linear width is zero.
    pub fn new_with<R: Rng>(
        rng: &mut R,
        layer_type: LayerType,
        in_width: usize,
        out_width: usize,
    ) -> Result<Self> {
        let kind = match layer_type {
            LayerType::Linear => LayerKind::Linear(Linear {
                weights: Tensor::random_with(
                    rng,
                    vec![in_width, out_width],
                    true,
                    DEFAULT_RAND_LOW,
                    DEFAULT_RAND_HIGH,
                )?,
                bias: Tensor::new(vec![out_width], true)?,
            }),
            LayerType::ReLU => LayerKind::ReLU,
            LayerType::Softmax => LayerKind::Softmax,
        };

        Ok(Self {
            kind,
            in_width,
            out_width,
            input: None,
            output: None,
        })
    }

    /// Builds a Linear layer around existing parameters.
    ///
    /// Untracked tensors are given a zeroed gradient buffer.
    ///
    /// # Errors
    /// [`Error::Shape`] unless `weights` is `[in, out]` and `bias` is `[out]`.
    pub fn linear(weights: Tensor, bias: Tensor) -> Result<Self> {
        let (in_width, out_width) = weights.matrix_dims("Layer::linear")?;
        if bias.shape() != [out_width] {
            return Err(Error::shape(
                "Layer::linear",
                format!(
                    "bias {:?} does not match weights {:?}",
                    bias.shape(),
                    weights.shape()
                ),
            ));
        }
        let track = |t: Tensor| if t.requires_grad() { Ok(t) } else { t.snapshot() };

        Ok(Self {
            kind: LayerKind::Linear(Linear {
                weights: track(weights)?,
                bias: track(bias)?,
            }),
            in_width,
            out_width,
            input: None,
            output: None,
        })
    }

    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::Linear(_) => LayerType::Linear,
            LayerKind::ReLU => LayerType::ReLU,
            LayerKind::Softmax => LayerType::Softmax,
        }
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// `(in_width, out_width)` as declared at construction.
    pub fn widths(&self) -> (usize, usize) {
        (self.in_width, self.out_width)
    }

    pub fn linear_params(&self) -> Option<&Linear> {
        match &self.kind {
            LayerKind::Linear(linear) => Some(linear),
            _ => None,
        }
    }

    pub fn linear_params_mut(&mut self) -> Option<&mut Linear> {
        match &mut self.kind {
            LayerKind::Linear(linear) => Some(linear),
            _ => None,
        }
    }

    pub fn weights(&self) -> Option<&Tensor> {
        self.linear_params().map(Linear::weights)
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.linear_params().map(Linear::bias)
    }

    /// Snapshot of the input seen by the latest forward call.
    pub fn input(&self) -> Option<&Tensor> {
        self.input.as_ref()
    }

    /// Output produced by the latest forward call.
    pub fn output(&self) -> Option<&Tensor> {
        self.output.as_ref()
    }

    pub(crate) fn has_activations(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }

    /// Runs the layer on `x`, replacing the cached activations, and returns
    /// the new output.
    pub(crate) fn forward(&mut self, x: &Tensor) -> Result<&Tensor> {
        // drop the previous pair first so a failing call leaves no stale state
        self.input = None;
        self.output = None;

        let input = x.snapshot()?;
        let output = match &self.kind {
            LayerKind::Linear(linear) => {
                add_bias(&matmul(&input, &linear.weights)?, &linear.bias)?
            }
            LayerKind::ReLU => relu(&input)?,
            LayerKind::Softmax => softmax(&input)?,
        };
        trace!(
            "{} forward {:?} -> {:?}",
            self.layer_type(),
            input.shape(),
            output.shape()
        );

        self.input = Some(input);
        let output = &*self.output.insert(output);
        Ok(output)
    }

    /// Propagates `upstream.grad` (the gradient at this layer's output) back
    /// to `input.grad`, accumulating parameter gradients on the way.
    ///
    /// `fused_softmax` marks a trailing softmax whose gradient has already
    /// been seeded through [`softmax_cross_entropy_grad`](crate::ops::softmax_cross_entropy_grad);
    /// it then passes the gradient through unchanged.
    pub(crate) fn backward(
        &mut self,
        index: usize,
        upstream: &Tensor,
        fused_softmax: bool,
    ) -> Result<()> {
        trace!("{} backward at layer {index}", self.layer_type());
        let (Some(input), Some(output)) = (self.input.as_mut(), self.output.as_ref()) else {
            return Err(Error::MissingActivations { layer: index });
        };
        if upstream.shape() != output.shape() {
            return Err(Error::shape(
                "backward",
                format!(
                    "layer {index} produced {:?} but received a gradient of {:?}",
                    output.shape(),
                    upstream.shape()
                ),
            ));
        }

        match &mut self.kind {
            LayerKind::Linear(linear) => {
                input.zero_grad();
                matmul_backward(input, &mut linear.weights, upstream)?;
                bias_backward(&mut linear.bias, upstream)?;
            }
            LayerKind::ReLU => relu_backward(input, upstream)?,
            LayerKind::Softmax if fused_softmax => {
                let g = upstream.tracked_grad("backward")?;
                input.tracked_grad_mut("backward")?.copy_from_slice(g);
            }
            LayerKind::Softmax => softmax_backward(input, output, upstream)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor;

    #[test]
    fn tags_round_trip_through_u8() {
        for ty in [LayerType::Linear, LayerType::ReLU, LayerType::Softmax] {
            assert_eq!(LayerType::try_from(ty as u8).unwrap(), ty);
        }
        assert!(matches!(
            LayerType::try_from(0),
            Err(Error::UnsupportedLayer(_))
        ));
        assert!(matches!(
            LayerType::try_from(4),
            Err(Error::UnsupportedLayer(_))
        ));
    }

    #[test]
    fn linear_owns_tracked_parameters() {
        let layer = Layer::new(LayerType::Linear, 4, 3).unwrap();
        let w = layer.weights().unwrap();
        let b = layer.bias().unwrap();
        assert_eq!(w.shape(), &[4, 3]);
        assert_eq!(b.shape(), &[3]);
        assert!(w.requires_grad() && b.requires_grad());
        assert!(w.data().iter().all(|x| (-1.0..1.0).contains(x)));
        assert!(b.data().iter().all(|&x| x == 0.0));

        let relu = Layer::new(LayerType::ReLU, 3, 3).unwrap();
        assert!(relu.weights().is_none());
    }

    #[test]
    fn forward_replaces_cached_activations() {
        let mut layer = Layer::linear(tensor!([[1.0], [2.0]]), tensor!([0.5])).unwrap();
        let out = layer.forward(&tensor!([[1.0, 1.0]])).unwrap().clone();
        assert_eq!(out.data(), &[3.5]);

        layer.forward(&tensor!([[2.0, 0.0], [0.0, 1.0]])).unwrap();
        assert_eq!(layer.input().unwrap().shape(), &[2, 2]);
        assert_eq!(layer.output().unwrap().data(), &[2.5, 2.5]);
        assert!(layer.input().unwrap().requires_grad());
    }

    #[test]
    fn backward_without_forward_is_an_error() {
        let mut layer = Layer::new(LayerType::ReLU, 2, 2).unwrap();
        let up = Tensor::new(vec![1, 2], true).unwrap();
        assert!(matches!(
            layer.backward(3, &up, false),
            Err(Error::MissingActivations { layer: 3 })
        ));
    }

    #[test]
    fn linear_rejects_mismatched_parts() {
        assert!(matches!(
            Layer::linear(tensor!([[1.0, 2.0]]), tensor!([1.0])),
            Err(Error::Shape { .. })
        ));
    }
}
