use crate::tensors::Tensor;
use crate::{Error, Result};

/// Probabilities are floored here before `ln` so a confident wrong answer
/// costs `-ln(1e-7)` instead of infinity.
pub const LOG_FLOOR: f64 = 1e-7;

/// Reads the class index stored (as a float) in `labels[row]`.
fn class_index(label: f64, classes: usize) -> Result<usize> {
    if !label.is_finite() || label < 0.0 || label.fract() != 0.0 {
        return Err(Error::shape(
            "labels",
            format!("{label} is not a class index"),
        ));
    }
    let class = label as usize;
    if class >= classes {
        return Err(Error::Range {
            dim: 1,
            index: class,
            size: classes,
        });
    }
    Ok(class)
}

/// Checks `pred` is `[batch, classes]` with one label per row and decodes the
/// labels.
fn decode_labels(op: &'static str, pred: &Tensor, actual: &Tensor) -> Result<Vec<usize>> {
    let (batch, classes) = pred.matrix_dims(op)?;
    if actual.shape() != [batch, 1] {
        return Err(Error::shape(
            op,
            format!("{batch} predictions need labels [{batch}, 1], got {:?}", actual.shape()),
        ));
    }
    actual
        .data()
        .iter()
        .map(|&label| class_index(label, classes))
        .collect()
}

/// Mean cross-entropy of row-wise class probabilities against integer labels.
///
/// # Formula
///
/// $$ L = -\\frac{1}{B} \\sum_b \\ln(\\max(p_{b, y_b}, 10^{-7})) $$
///
/// # Arguments
///
/// - `pred`: probabilities, shape `[batch, classes]`
/// - `actual`: class indices stored as floats, shape `[batch, 1]`
///
/// # Errors
///
/// - [`Error::Shape`] if `actual` does not hold exactly one label per row, or a
///   label is not a non-negative integer
/// - [`Error::Range`] if a label names a class `>= classes`
pub fn cross_entropy_loss(pred: &Tensor, actual: &Tensor) -> Result<f64> {
    let labels = decode_labels("cross_entropy_loss", pred, actual)?;
    let classes = pred.shape()[1];

    let total: f64 = labels
        .iter()
        .enumerate()
        .map(|(b, &class)| -pred.data()[b * classes + class].max(LOG_FLOOR).ln())
        .sum();

    Ok(total / labels.len() as f64)
}

/// Seeds `pred.grad` with the combined softmax + cross-entropy gradient
/// `(p - onehot(y)) / batch`.
///
/// Only valid when `pred` is the output of a softmax that feeds straight into
/// [`cross_entropy_loss`]; the gradient is with respect to the softmax
/// *input*. Existing gradient values are overwritten.
pub fn softmax_cross_entropy_grad(pred: &mut Tensor, actual: &Tensor) -> Result<()> {
    const OP: &str = "softmax_cross_entropy_grad";

    let labels = decode_labels(OP, pred, actual)?;
    let batch = labels.len() as f64;
    let classes = pred.shape()[1];

    let (data, grad) = pred.split_mut();
    let grad = grad.ok_or(Error::GradNotTracked { op: OP })?;

    for (b, &class) in labels.iter().enumerate() {
        let row = b * classes;
        for i in 0..classes {
            let target = if i == class { 1.0 } else { 0.0 };
            grad[row + i] = (data[row + i] - target) / batch;
        }
    }

    Ok(())
}

/// Index of the largest entry in each row; ties go to the lowest index.
pub fn argmax_rows(pred: &Tensor) -> Result<Vec<usize>> {
    let (_, cols) = pred.matrix_dims("argmax_rows")?;
    Ok(pred
        .data()
        .chunks(cols)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &x)| {
                    if x > best.1 { (i, x) } else { best }
                })
                .0
        })
        .collect())
}
