//! Saving and loading trained models.
//!
//! # `.ffnt` Model Format
//!
//! A little-endian binary layout holding the layer chain and the Linear
//! parameters. Cached activations and gradients are not stored; a loaded
//! model has zeroed gradient buffers.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────┐
//! │ Header       │ Layer N …                                     │
//! ├──────────────┼───────────────────────────────────────────────┤
//! │ "ffnt"[4]    │ u8: tag (1 linear, 2 relu, 3 softmax)         │
//! │ u8: count    │ u64: in width, u64: out width                 │
//! │              │ linear only: weights record, bias record      │
//! └──────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! ## Tensor Records
//! - `ndim` (`u64`), 1 or 2
//! - `shape` (`u64 * ndim`)
//! - `data` (`f64 * prod(shape)`), row-major
//!
//! Records pass through `briny`'s [`TrustedData`] before they become
//! parameters, so a shape that disagrees with its data never reaches a
//! [`Tensor`].
//!
//! ## Limitations
//! - At most 255 layers per file (`u8` count).
//!
//! # Example
//!
//! ```rust
//! use ffnet::layers::LayerType;
//! use ffnet::model::Model;
//! use ffnet::modelio::{load_model, save_model};
//!
//! let mut model = Model::new(2);
//! model.add_layer(LayerType::Linear, 4, 3)?;
//! model.add_layer(LayerType::Softmax, 3, 3)?;
//!
//! let path = std::env::temp_dir().join("ffnet-doc-example.ffnt");
//! save_model(&path, &model)?;
//! let restored = load_model(&path)?;
//! assert_eq!(restored.layers()[0].weights(), model.layers()[0].weights());
//! # std::fs::remove_file(&path)?;
//! # Ok::<(), ffnet::Error>(())
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use briny::prelude::{TrustedData, Validate, ValidationError};
use log::debug;

use crate::layers::{Layer, LayerType};
use crate::model::Model;
use crate::tensors::Tensor;
use crate::{Error, Result};

const FFNT_MAGIC: &[u8; 4] = b"ffnt";

/// A tensor record as read from disk, before validation.
struct PackedTensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Validate for PackedTensor {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        if !(1..=2).contains(&self.shape.len()) || self.shape.contains(&0) {
            return Err(ValidationError);
        }
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(ValidationError)?;
        if self.data.len() != expected {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Saves `model` to `path`, replacing any existing file.
///
/// # Errors
/// - [`Error::Io`] if the file cannot be written.
/// - [`Error::Capacity`] if the model holds more than 255 layers.
pub fn save_model(path: impl AsRef<Path>, model: &Model) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufWriter::new(File::create(path)?);
    write_model(&mut file, model)?;
    file.flush()?;
    debug!("saved {} layers to {}", model.len(), path.display());
    Ok(())
}

/// Loads a model saved with [`save_model`].
///
/// # Errors
/// - [`Error::Io`] if the file cannot be read.
/// - [`Error::CorruptModel`] if it is truncated or malformed.
/// - [`Error::UnsupportedLayer`] for an unknown layer tag.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let model = read_model(&mut BufReader::new(File::open(path)?))?;
    debug!("loaded {} layers from {}", model.len(), path.display());
    Ok(model)
}

/// Writes `model` in the `.ffnt` layout to any writer.
pub fn write_model<W: Write>(w: &mut W, model: &Model) -> Result<()> {
    let count = u8::try_from(model.len()).map_err(|_| Error::Capacity {
        capacity: u8::MAX as usize,
    })?;

    w.write_all(FFNT_MAGIC)?;
    w.write_all(&[count])?;

    for layer in model.layers() {
        let (in_width, out_width) = layer.widths();
        w.write_all(&[layer.layer_type() as u8])?;
        w.write_all(&(in_width as u64).to_le_bytes())?;
        w.write_all(&(out_width as u64).to_le_bytes())?;

        if let Some(linear) = layer.linear_params() {
            write_tensor(w, linear.weights())?;
            write_tensor(w, linear.bias())?;
        }
    }

    Ok(())
}

/// Reads a model in the `.ffnt` layout from any reader. The stream must end
/// right after the last layer.
pub fn read_model<R: Read>(r: &mut R) -> Result<Model> {
    let mut magic = [0u8; 4];
    read_exact(r, &mut magic)?;
    if &magic != FFNT_MAGIC {
        return Err(Error::CorruptModel("invalid magic header"));
    }

    let mut count = [0u8; 1];
    read_exact(r, &mut count)?;
    let count = count[0] as usize;
    let mut model = Model::new(count);

    for _ in 0..count {
        let mut tag = [0u8; 1];
        read_exact(r, &mut tag)?;
        let layer_type = LayerType::try_from(tag[0])?;
        let in_width = read_usize(r)?;
        let out_width = read_usize(r)?;

        let layer = match layer_type {
            LayerType::Linear => {
                let weights = read_tensor(r)?;
                let bias = read_tensor(r)?;
                if weights.shape() != [in_width, out_width] || bias.shape() != [out_width] {
                    return Err(Error::CorruptModel(
                        "linear parameters disagree with layer widths",
                    ));
                }
                Layer::linear(weights, bias)?
            }
            _ => Layer::new(layer_type, in_width, out_width)?,
        };
        model.push(layer)?;
    }

    let mut rest = [0u8; 1];
    if r.read(&mut rest)? != 0 {
        return Err(Error::CorruptModel("trailing bytes after last layer"));
    }

    Ok(model)
}

fn write_tensor<W: Write>(w: &mut W, tensor: &Tensor) -> Result<()> {
    w.write_all(&(tensor.ndim() as u64).to_le_bytes())?;
    for &dim in tensor.shape() {
        w.write_all(&(dim as u64).to_le_bytes())?;
    }
    for &val in tensor.data() {
        w.write_all(&val.to_le_bytes())?;
    }
    Ok(())
}

fn read_tensor<R: Read>(r: &mut R) -> Result<Tensor> {
    let ndim = read_usize(r)?;
    if !(1..=2).contains(&ndim) {
        return Err(Error::CorruptModel("tensor rank must be 1 or 2"));
    }

    let mut shape = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        shape.push(read_usize(r)?);
    }

    let size = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(Error::CorruptModel("tensor size overflows"))?;
    let mut data = Vec::new();
    let mut buf8 = [0u8; 8];
    for _ in 0..size {
        read_exact(r, &mut buf8)?;
        data.push(f64::from_le_bytes(buf8));
    }

    let trusted = TrustedData::new(PackedTensor { shape, data })
        .map_err(|_| Error::CorruptModel("tensor shape does not match its data"))?;
    let inner = trusted.into_inner();
    Tensor::from_vec(inner.shape, inner.data, true)
}

fn read_usize<R: Read>(r: &mut R) -> Result<usize> {
    let mut buf8 = [0u8; 8];
    read_exact(r, &mut buf8)?;
    usize::try_from(u64::from_le_bytes(buf8))
        .map_err(|_| Error::CorruptModel("dimension does not fit in usize"))
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::CorruptModel("unexpected end of file"),
        _ => Error::Io(e),
    })
}
