//! Error taxonomy for the engine.
//!
//! Every fallible operation checks its preconditions before it writes to any
//! output buffer, so an `Err` never leaves a tensor half-updated.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by tensors, operations, the model and its file format.
#[derive(Debug, Error)]
pub enum Error {
    /// Operand shapes violate an operation's precondition.
    #[error("shape mismatch in {op}: {detail}")]
    Shape { op: &'static str, detail: String },

    /// A multi-index component falls outside its dimension.
    #[error("index {index} out of range for dimension {dim} of size {size}")]
    Range { dim: usize, index: usize, size: usize },

    /// Appending a layer to a model that is already full.
    #[error("model already holds its maximum of {capacity} layers")]
    Capacity { capacity: usize },

    /// The requested shape has a zero dimension, overflows, or storage could
    /// not be reserved.
    #[error("cannot allocate tensor of shape {shape:?}: {reason}")]
    Allocation { shape: Vec<usize>, reason: &'static str },

    /// A layer tag outside {Linear, ReLU, Softmax}, or a layer used where its
    /// kind has no defined rule.
    #[error("unsupported layer: {0}")]
    UnsupportedLayer(String),

    /// A gradient was written to a tensor without a gradient buffer.
    #[error("{op} needs a gradient-tracked tensor")]
    GradNotTracked { op: &'static str },

    /// Uniform bounds are empty or not finite.
    #[error("invalid uniform bounds [{low}, {high})")]
    InvalidBounds { low: f64, high: f64 },

    /// Forward or backward on a model without layers.
    #[error("model has no layers")]
    EmptyModel,

    /// Backward reached a layer that has no cached forward activations.
    #[error("layer {layer} has no activations; run forward first")]
    MissingActivations { layer: usize },

    /// A dataset row could not be parsed.
    #[error("line {line}: {reason}")]
    Data { line: usize, reason: String },

    /// An environment override could not be parsed or is out of range.
    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    /// A model file is malformed.
    #[error("corrupt model file: {0}")]
    CorruptModel(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn shape(op: &'static str, detail: impl Into<String>) -> Self {
        Self::Shape {
            op,
            detail: detail.into(),
        }
    }
}
