//! Trains the reference 784-500-100-10 classifier on MNIST text dumps.
//!
//! ```text
//! FFNET_TRAIN=data/train_dataset.txt FFNET_TEST=data/test_dataset.txt \
//!     RUST_LOG=info cargo run --release --example mnist
//! ```
//!
//! Rows are `pixel,pixel,...;label` with pixels already scaled to `[0, 1]`.
//! `FFNET_EPOCHS`, `FFNET_BATCH_SIZE` and `FFNET_LEARNING_RATE` override the
//! training defaults; `FFNET_MODEL_OUT` names the saved model file.

use std::env;

use ffnet::config::TrainConfig;
use ffnet::data::Dataset;
use ffnet::layers::LayerType;
use ffnet::model::Model;
use ffnet::modelio::save_model;
use ffnet::train::{Trainer, evaluate};
use ffnet::{Error, Result};
use log::info;

const FEATURES: usize = 28 * 28;
const CLASSES: usize = 10;
const DEFAULT_MODEL_OUT: &str = "mnist.ffnt";

fn required_var(key: &'static str) -> Result<String> {
    env::var(key).map_err(|e| Error::Config {
        key,
        reason: e.to_string(),
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let config = TrainConfig::from_env()?;
    let train_set = Dataset::open(required_var("FFNET_TRAIN")?, FEATURES, None)?;
    let test_set = Dataset::open(required_var("FFNET_TEST")?, FEATURES, None)?;
    info!(
        "loaded {} training and {} test examples",
        train_set.len(),
        test_set.len()
    );

    let mut model = Model::new(6);
    model.add_layer(LayerType::Linear, FEATURES, 500)?;
    model.add_layer(LayerType::ReLU, 500, 500)?;
    model.add_layer(LayerType::Linear, 500, 100)?;
    model.add_layer(LayerType::ReLU, 100, 100)?;
    model.add_layer(LayerType::Linear, 100, CLASSES)?;
    model.add_layer(LayerType::Softmax, CLASSES, CLASSES)?;

    Trainer::new(config)?.fit(&mut model, &train_set)?;

    let report = evaluate(&mut model, &test_set)?;
    println!(
        "test accuracy: {:.2}% ({} examples, loss {:.4})",
        report.accuracy * 100.0,
        report.examples,
        report.loss
    );

    let out = env::var("FFNET_MODEL_OUT").unwrap_or_else(|_| DEFAULT_MODEL_OUT.to_owned());
    save_model(&out, &model)?;
    info!("model saved to {out}");

    Ok(())
}
