//! Labelled datasets in the text row format used by the MNIST dumps.
//!
//! Each line holds one example: comma-separated features, a semicolon, then
//! the integer class label.
//!
//! ```text
//! 0.0,0.5,1.0;7
//! ```
//!
//! Rows that fail to parse are logged and skipped; blank lines are ignored.
//! Features past the declared count are dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::tensors::Tensor;
use crate::{Error, Result};

/// Examples stored row-major, `feature_count` values per example.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Vec<f64>,
    labels: Vec<f64>,
    feature_count: usize,
}

impl Dataset {
    /// Wraps already decoded examples.
    ///
    /// # Errors
    /// [`Error::Shape`] unless `features.len() == labels.len() * feature_count`
    /// and `feature_count > 0`.
    pub fn from_parts(features: Vec<f64>, labels: Vec<f64>, feature_count: usize) -> Result<Self> {
        if feature_count == 0 || features.len() != labels.len() * feature_count {
            return Err(Error::shape(
                "Dataset::from_parts",
                format!(
                    "{} features for {} labels of width {feature_count}",
                    features.len(),
                    labels.len()
                ),
            ));
        }
        Ok(Self {
            features,
            labels,
            feature_count,
        })
    }

    /// Reads up to `limit` well-formed rows from `reader`.
    ///
    /// # Errors
    /// [`Error::Io`] if reading fails. Malformed rows are not errors; they
    /// are reported with `warn!` and skipped.
    pub fn parse<R: BufRead>(
        reader: R,
        feature_count: usize,
        limit: Option<usize>,
    ) -> Result<Self> {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut skipped = 0usize;

        for (i, line) in reader.lines().enumerate() {
            if limit.is_some_and(|n| labels.len() >= n) {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_row(&line, i + 1, feature_count) {
                Ok((row, label)) => {
                    features.extend_from_slice(&row);
                    labels.push(label);
                }
                Err(e) => {
                    warn!("skipping row: {e}");
                    skipped += 1;
                }
            }
        }

        debug!(
            "parsed {} examples of width {feature_count} ({skipped} skipped)",
            labels.len()
        );
        Self::from_parts(features, labels, feature_count)
    }

    /// [`Dataset::parse`] over a file.
    pub fn open(
        path: impl AsRef<Path>,
        feature_count: usize,
        limit: Option<usize>,
    ) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading dataset from {}", path.display());
        Self::parse(BufReader::new(File::open(path)?), feature_count, limit)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Number of full batches; a trailing partial batch is not counted.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.len().checked_div(batch_size).unwrap_or(0)
    }

    /// The `index`-th full batch as `(inputs [B, F], labels [B, 1])`.
    ///
    /// # Errors
    /// [`Error::Range`] if `index >= num_batches(batch_size)`.
    pub fn batch(&self, index: usize, batch_size: usize) -> Result<(Tensor, Tensor)> {
        let batches = self.num_batches(batch_size);
        if index >= batches {
            return Err(Error::Range {
                dim: 0,
                index,
                size: batches,
            });
        }
        self.slice(index * batch_size, batch_size)
    }

    /// `count` consecutive examples starting at `start`.
    ///
    /// # Errors
    /// - [`Error::Range`] if the window runs past the end.
    /// - [`Error::Allocation`] if `count` is zero.
    pub fn slice(&self, start: usize, count: usize) -> Result<(Tensor, Tensor)> {
        let end = start.saturating_add(count);
        if end > self.len() {
            return Err(Error::Range {
                dim: 0,
                index: end.saturating_sub(1),
                size: self.len(),
            });
        }

        let f = self.feature_count;
        let inputs = Tensor::from_vec(
            vec![count, f],
            self.features[start * f..end * f].to_vec(),
            false,
        )?;
        let labels = Tensor::from_vec(vec![count, 1], self.labels[start..end].to_vec(), false)?;
        Ok((inputs, labels))
    }
}

fn parse_row(line: &str, line_no: usize, feature_count: usize) -> Result<(Vec<f64>, f64)> {
    let bad = |reason: String| Error::Data {
        line: line_no,
        reason,
    };

    let (input, label) = line
        .split_once(';')
        .ok_or_else(|| bad("missing ';' label separator".to_owned()))?;

    let row = input
        .split(',')
        .take(feature_count)
        .map(|tok| {
            tok.trim()
                .parse::<f64>()
                .map_err(|e| bad(format!("feature {tok:?}: {e}")))
        })
        .collect::<Result<Vec<f64>>>()?;
    if row.len() < feature_count {
        return Err(bad(format!(
            "expected {feature_count} features, found {}",
            row.len()
        )));
    }

    let label: f64 = label
        .trim()
        .parse()
        .map_err(|e| bad(format!("label {label:?}: {e}")))?;
    if !(label.is_finite() && label >= 0.0 && label.fract() == 0.0) {
        return Err(bad(format!("label {label} is not a class index")));
    }

    Ok((row, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ROWS: &str = "\
0.0,0.5,1.0;2
1,2,3,99;0

bad,1,2;1
0.1,0.2;1
0.3,0.3,0.3
0.4,0.4,0.4;-1
0.9,0.8,0.7;1
";

    #[test]
    fn malformed_rows_are_skipped() {
        let ds = Dataset::parse(Cursor::new(ROWS), 3, None).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.labels(), &[2.0, 0.0, 1.0]);
        assert_eq!(ds.features, vec![0.0, 0.5, 1.0, 1.0, 2.0, 3.0, 0.9, 0.8, 0.7]);
    }

    #[test]
    fn limit_caps_accepted_rows() {
        let ds = Dataset::parse(Cursor::new(ROWS), 3, Some(2)).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn row_errors_carry_line_numbers() {
        let err = parse_row("0.1,x;3", 12, 2).unwrap_err();
        assert!(matches!(err, Error::Data { line: 12, .. }));
    }

    #[test]
    fn batches_drop_the_trailing_partial() {
        let labels = vec![0.0, 1.0, 0.0, 1.0, 1.0];
        let ds = Dataset::from_parts((0..10).map(f64::from).collect(), labels, 2).unwrap();
        assert_eq!(ds.num_batches(2), 2);
        assert_eq!(ds.num_batches(0), 0);

        let (x, y) = ds.batch(1, 2).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x.data(), &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(y.shape(), &[2, 1]);
        assert_eq!(y.data(), &[0.0, 1.0]);

        assert!(matches!(ds.batch(2, 2), Err(Error::Range { .. })));
        assert!(ds.slice(4, 1).is_ok());
        assert!(matches!(ds.slice(4, 2), Err(Error::Range { .. })));
    }

    #[test]
    fn inconsistent_parts_are_rejected() {
        assert!(matches!(
            Dataset::from_parts(vec![1.0; 5], vec![0.0, 1.0], 2),
            Err(Error::Shape { .. })
        ));
    }
}
