//! Mini-batch training and evaluation loops.
//!
//! Every batch runs the same cycle: forward, loss, backward, SGD step, zero
//! gradients. Zeroing after each step keeps batches independent.

use log::{debug, info};

use crate::config::{BATCH_SIZE_VAR, TrainConfig};
use crate::data::Dataset;
use crate::model::Model;
use crate::ops::{argmax_rows, cross_entropy_loss};
use crate::tensors::Tensor;
use crate::{Error, Result};

/// Rows per forward call during evaluation.
const EVAL_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based.
    pub epoch: usize,
    /// Mean of the per-batch cross-entropy losses.
    pub mean_loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub examples: usize,
    /// Mean cross-entropy per example.
    pub loss: f64,
    /// Fraction of examples whose arg-max class matches the label.
    pub accuracy: f64,
}

/// One forward/backward/update cycle on a single batch.
///
/// # Returns
/// The batch loss measured before the update.
pub fn train_step(
    model: &mut Model,
    inputs: &Tensor,
    labels: &Tensor,
    learning_rate: f64,
) -> Result<f64> {
    let mut pred = model.forward(inputs)?;
    let loss = cross_entropy_loss(&pred, labels)?;
    model.backward(&mut pred, labels)?;
    model.sgd_step(learning_rate);
    model.zero_grad();
    Ok(loss)
}

#[derive(Debug, Clone, Copy)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    /// # Errors
    /// [`Error::Config`] if `config` fails validation.
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Trains `model` on every full batch of `dataset` for the configured
    /// number of epochs, in dataset order.
    ///
    /// # Errors
    /// - [`Error::Config`] if the dataset holds less than one batch.
    /// - Anything raised by the model on the first failing batch.
    pub fn fit(&self, model: &mut Model, dataset: &Dataset) -> Result<Vec<EpochReport>> {
        let TrainConfig {
            epochs,
            batch_size,
            learning_rate,
        } = self.config;

        let batches = dataset.num_batches(batch_size);
        if batches == 0 {
            return Err(Error::Config {
                key: BATCH_SIZE_VAR,
                reason: format!(
                    "batch size {batch_size} exceeds the {} available examples",
                    dataset.len()
                ),
            });
        }
        debug!(
            "training {} parameters: {epochs} epochs x {batches} batches of {batch_size}, \
             lr {learning_rate}",
            model.num_parameters()
        );

        let mut reports = Vec::with_capacity(epochs);
        for epoch in 1..=epochs {
            let mut total = 0.0;
            for b in 0..batches {
                let (x, y) = dataset.batch(b, batch_size)?;
                total += train_step(model, &x, &y, learning_rate)?;
            }

            let mean_loss = total / batches as f64;
            info!("epoch {epoch}/{epochs}, average loss: {mean_loss:.6}");
            reports.push(EpochReport { epoch, mean_loss });
        }

        Ok(reports)
    }
}

/// Measures loss and accuracy of `model` over all of `dataset`.
///
/// Runs forward only; parameter gradients are untouched, but the layers'
/// cached activations are replaced.
pub fn evaluate(model: &mut Model, dataset: &Dataset) -> Result<EvalReport> {
    let mut loss_sum = 0.0;
    let mut correct = 0usize;

    let mut start = 0;
    while start < dataset.len() {
        let count = EVAL_CHUNK.min(dataset.len() - start);
        let (x, y) = dataset.slice(start, count)?;

        let pred = model.forward(&x)?;
        loss_sum += cross_entropy_loss(&pred, &y)? * count as f64;
        correct += argmax_rows(&pred)?
            .into_iter()
            .zip(y.data())
            .filter(|&(class, &label)| class as f64 == label)
            .count();

        start += count;
    }

    let examples = dataset.len();
    let report = if examples == 0 {
        EvalReport {
            examples,
            loss: 0.0,
            accuracy: 0.0,
        }
    } else {
        EvalReport {
            examples,
            loss: loss_sum / examples as f64,
            accuracy: correct as f64 / examples as f64,
        }
    };
    info!(
        "evaluated {examples} examples: loss {:.6}, accuracy {:.2}%",
        report.loss,
        report.accuracy * 100.0
    );
    Ok(report)
}
