//! Core tensor container.
//!
//! # Tensor Storage
//!
//! A [`Tensor`] owns one flat, row-major `Vec<f64>` plus its shape, and an
//! optional gradient buffer of exactly the same length. The gradient buffer is
//! present iff the tensor was created with `requires_grad`.
//!
//! ## Layout
//! - Element `(i, j)` of a `[R, C]` tensor lives at flat offset `i * C + j`.
//! - All index arithmetic goes through [`Tensor::offset`], which is the only
//!   place bounds are checked.
//!
//! ## Limitations
//! - Only 1-D and 2-D tensors are used by the engine; higher ranks can be
//!   stored and indexed but no operation accepts them.
//! - No broadcasting, slicing or views. Copies are always deep.
//!
//! ## Example
//!
//! ```rust
//! use ffnet::tensors::Tensor;
//!
//! let mut t = Tensor::new(vec![2, 3], true)?;
//! t.set(&[1, 2], 4.0)?;
//! assert_eq!(t.data()[5], 4.0);
//! assert_eq!(t.grad().map(<[f64]>::len), Some(6));
//! # Ok::<(), ffnet::Error>(())
//! ```

use core::fmt;

use rand::Rng;

use crate::{Error, Result};

/// Lower bound used by parameter initialisation.
pub const DEFAULT_RAND_LOW: f64 = -1.0;

/// Upper bound (exclusive) used by parameter initialisation.
pub const DEFAULT_RAND_HIGH: f64 = 1.0;

/// A fixed-shape buffer of `f64` with an optional same-shaped gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
    grad: Option<Vec<f64>>,
}

/// Number of elements described by `shape`, rejecting empty shapes, zero
/// dimensions and overflow.
fn element_count(shape: &[usize]) -> Result<usize> {
    let fail = |reason| Error::Allocation {
        shape: shape.to_vec(),
        reason,
    };

    if shape.is_empty() {
        return Err(fail("shape has no dimensions"));
    }
    if shape.contains(&0) {
        return Err(fail("shape has a zero-sized dimension"));
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| fail("element count overflows usize"))
}

/// Reserves exactly `len` slots and fills them with `value`.
fn filled(shape: &[usize], len: usize, value: f64) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::Allocation {
        shape: shape.to_vec(),
        reason: "storage could not be reserved",
    })?;
    buf.resize(len, value);
    Ok(buf)
}

impl Tensor {
    /// Allocates a zero-filled tensor, with a zeroed gradient iff
    /// `requires_grad`.
    ///
    /// # Errors
    /// [`Error::Allocation`] if the shape is empty, has a zero dimension, or
    /// storage cannot be obtained.
    pub fn new(shape: impl Into<Vec<usize>>, requires_grad: bool) -> Result<Self> {
        Self::filled_with(shape.into(), 0.0, requires_grad)
    }

    /// Zero-filled tensor without gradient tracking.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Result<Self> {
        Self::new(shape, false)
    }

    /// One-filled tensor without gradient tracking.
    pub fn ones(shape: impl Into<Vec<usize>>) -> Result<Self> {
        Self::filled_with(shape.into(), 1.0, false)
    }

    fn filled_with(shape: Vec<usize>, value: f64, requires_grad: bool) -> Result<Self> {
        let len = element_count(&shape)?;
        let data = filled(&shape, len, value)?;
        let grad = if requires_grad {
            Some(filled(&shape, len, 0.0)?)
        } else {
            None
        };
        Ok(Self { shape, data, grad })
    }

    /// Wraps existing row-major data.
    ///
    /// # Errors
    /// [`Error::Allocation`] for an invalid shape, [`Error::Shape`] if
    /// `data.len()` differs from the shape's element count.
    pub fn from_vec(
        shape: impl Into<Vec<usize>>,
        data: Vec<f64>,
        requires_grad: bool,
    ) -> Result<Self> {
        let shape = shape.into();
        let len = element_count(&shape)?;
        if data.len() != len {
            return Err(Error::shape(
                "from_vec",
                format!("shape {shape:?} needs {len} elements, got {}", data.len()),
            ));
        }
        let grad = if requires_grad {
            Some(filled(&shape, len, 0.0)?)
        } else {
            None
        };
        Ok(Self { shape, data, grad })
    }

    /// Tensor whose data are independent uniform draws in `[low, high)` from
    /// the thread-local generator.
    pub fn random(
        shape: impl Into<Vec<usize>>,
        requires_grad: bool,
        low: f64,
        high: f64,
    ) -> Result<Self> {
        Self::random_with(&mut rand::rng(), shape, requires_grad, low, high)
    }

    /// Like [`Tensor::random`] but draws from the supplied generator.
    ///
    /// # Errors
    /// [`Error::InvalidBounds`] unless `low < high` and both are finite.
    pub fn random_with<R: Rng>(
        rng: &mut R,
        shape: impl Into<Vec<usize>>,
        requires_grad: bool,
        low: f64,
        high: f64,
    ) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::InvalidBounds { low, high });
        }
        let mut t = Self::new(shape, requires_grad)?;
        for x in &mut t.data {
            *x = rng.random_range(low..high);
        }
        Ok(t)
    }

    /// Returns a deep copy with a new shape of the same element count.
    ///
    /// # Errors
    /// [`Error::Shape`] if the element counts differ.
    pub fn reshape(&self, new_shape: impl Into<Vec<usize>>) -> Result<Self> {
        let new_shape = new_shape.into();
        let len = element_count(&new_shape)?;
        if len != self.data.len() {
            return Err(Error::shape(
                "reshape",
                format!(
                    "cannot view {:?} ({} elements) as {new_shape:?} ({len} elements)",
                    self.shape,
                    self.data.len()
                ),
            ));
        }
        Ok(Self {
            shape: new_shape,
            data: self.data.clone(),
            grad: self.grad.clone(),
        })
    }

    /// Deep copy of the data with a fresh, zeroed gradient buffer.
    pub fn snapshot(&self) -> Result<Self> {
        Self::from_vec(self.shape.clone(), self.data.clone(), true)
    }

    /// Flat row-major offset of a multi-index.
    ///
    /// # Errors
    /// [`Error::Shape`] if the index arity differs from [`Tensor::ndim`],
    /// [`Error::Range`] if a component is outside its dimension.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(Error::shape(
                "index",
                format!(
                    "{}-component index into a {}-D tensor",
                    index.len(),
                    self.shape.len()
                ),
            ));
        }
        let mut offset = 0;
        for (dim, (&i, &size)) in index.iter().zip(&self.shape).enumerate() {
            if i >= size {
                return Err(Error::Range {
                    dim,
                    index: i,
                    size,
                });
            }
            offset = offset * size + i;
        }
        Ok(offset)
    }

    /// Reads one element.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        Ok(self.data[self.offset(index)?])
    }

    /// Mutable access to one element.
    pub fn get_mut(&mut self, index: &[usize]) -> Result<&mut f64> {
        let at = self.offset(index)?;
        Ok(&mut self.data[at])
    }

    /// Writes one element.
    pub fn set(&mut self, index: &[usize], value: f64) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Leading dimension (the batch dimension for 2-D activations).
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Second dimension; a 1-D tensor reads as a single column.
    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`: zero-sized shapes are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn requires_grad(&self) -> bool {
        self.grad.is_some()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn grad(&self) -> Option<&[f64]> {
        self.grad.as_deref()
    }

    pub fn grad_mut(&mut self) -> Option<&mut [f64]> {
        self.grad.as_deref_mut()
    }

    /// Data and gradient borrowed together, for in-place updates.
    pub fn split_mut(&mut self) -> (&mut [f64], Option<&mut [f64]>) {
        (&mut self.data, self.grad.as_deref_mut())
    }

    pub(crate) fn tracked_grad(&self, op: &'static str) -> Result<&[f64]> {
        self.grad.as_deref().ok_or(Error::GradNotTracked { op })
    }

    pub(crate) fn tracked_grad_mut(&mut self, op: &'static str) -> Result<&mut [f64]> {
        self.grad.as_deref_mut().ok_or(Error::GradNotTracked { op })
    }

    /// Resets the gradient buffer to zeros in place (no-op when untracked).
    pub fn zero_grad(&mut self) {
        if let Some(grad) = &mut self.grad {
            grad.fill(0.0);
        }
    }

    /// `(rows, cols)` of a 2-D tensor.
    ///
    /// # Errors
    /// [`Error::Shape`] for any other rank.
    pub fn matrix_dims(&self, op: &'static str) -> Result<(usize, usize)> {
        match *self.shape.as_slice() {
            [rows, cols] => Ok((rows, cols)),
            _ => Err(Error::shape(
                op,
                format!("expected a 2-D tensor, got shape {:?}", self.shape),
            )),
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(ToString::to_string).collect();
        writeln!(f, "Tensor shape: ({})", dims.join(", "))?;

        if let [rows, cols] = *self.shape.as_slice() {
            writeln!(f, "[")?;
            for row in self.data.chunks(cols).take(rows) {
                write!(f, "  [ ")?;
                for x in row {
                    write!(f, "{x:.6} ")?;
                }
                writeln!(f, "]")?;
            }
            write!(f, "]")
        } else {
            write!(f, "[ ")?;
            for x in &self.data {
                write!(f, "{x:.4} ")?;
            }
            write!(f, "]")
        }
    }
}

/// Builds an untracked 1-D or 2-D tensor from a literal.
///
/// # Panics
/// Panics on ragged rows.
///
/// # Example
/// ```
/// use ffnet::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape(), &[2, 2]);
/// let v = tensor!([1.0, -2.0, 3.0]);
/// assert_eq!(v.shape(), &[3]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $( $x:expr ),+ $(,)? ] ),+ $(,)? ]) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<f64>> = vec![ $( vec![ $( $x as f64 ),+ ] ),+ ];
        let cols = rows[0].len();
        assert!(
            rows.iter().all(|r| r.len() == cols),
            "ragged tensor literal (rows have mismatched lengths)"
        );
        let shape = vec![rows.len(), cols];
        $crate::tensors::Tensor::from_vec(shape, rows.into_iter().flatten().collect(), false)
            .expect("tensor literal has a valid shape")
    }};

    ([ $( $x:expr ),+ $(,)? ]) => {{
        let data: ::std::vec::Vec<f64> = vec![ $( $x as f64 ),+ ];
        $crate::tensors::Tensor::from_vec(vec![data.len()], data, false)
            .expect("tensor literal has a valid shape")
    }};
}
