//! Rank-1 and rank-2 conveniences over contiguous row-major buffers.
//!
//! The free functions take plain slices, so a matrix row (`Matrix::row`) or a
//! tensor slab (`Tensor::slab`) can be fed in as a vector without copying.

use crate::error::{ensure_len, Result, SimError};
use crate::tensor::Tensor;
use crate::traits::Scalar;
use nalgebra::DMatrix;
use std::fmt;
use std::ops::{Deref, DerefMut};

fn try_zeros<T: Scalar>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SimError::AllocationFailure { elements: len })?;
    buffer.resize(len, T::zero());
    Ok(buffer)
}

pub fn dot<T: Scalar>(a: &[T], b: &[T]) -> Result<T> {
    ensure_len("vector_dot_product", a.len(), b.len())?;
    Ok(a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y))
}

/// `dot(v, v)`: the squared Euclidean norm, not its square root.
pub fn squared_norm<T: Scalar>(v: &[T]) -> T {
    v.iter().fold(T::zero(), |acc, &x| acc + x * x)
}

/// `result = a + b`.
pub fn add<T: Scalar>(result: &mut [T], a: &[T], b: &[T]) -> Result<()> {
    ensure_len("vector_add", a.len(), b.len())?;
    ensure_len("vector_add", a.len(), result.len())?;
    for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
        *r = x + y;
    }
    Ok(())
}

/// `a += b`.
pub fn add_assign<T: Scalar>(a: &mut [T], b: &[T]) -> Result<()> {
    ensure_len("vector_add", a.len(), b.len())?;
    for (x, &y) in a.iter_mut().zip(b) {
        *x = *x + y;
    }
    Ok(())
}

pub fn scalar_multiply<T: Scalar>(scalar: T, v: &mut [T]) {
    for x in v.iter_mut() {
        *x = *x * scalar;
    }
}

pub fn scalar_multiply_copy<T: Scalar>(dst: &mut [T], scalar: T, v: &[T]) -> Result<()> {
    ensure_len("vector_scalar_multiply_copy", v.len(), dst.len())?;
    for (d, &x) in dst.iter_mut().zip(v) {
        *d = x * scalar;
    }
    Ok(())
}

/// `result[i] = sum_j matrix[i, j] * vector[j]`.
pub fn matrix_vector_multiply<T: Scalar>(
    result: &mut [T],
    matrix: &Matrix<T>,
    vector: &[T],
) -> Result<()> {
    ensure_len("matrix_vector_multiply", matrix.cols, vector.len())?;
    ensure_len("matrix_vector_multiply", matrix.rows, result.len())?;
    if matrix.cols == 0 {
        result.fill(T::zero());
        return Ok(());
    }
    for (out, row) in result.iter_mut().zip(matrix.elements.chunks_exact(matrix.cols)) {
        *out = row
            .iter()
            .zip(vector)
            .fold(T::zero(), |acc, (&m, &v)| acc + m * v);
    }
    Ok(())
}

/// Owned fixed-length vector. Dereferences to a slice, so it can be passed
/// to every free function in this module.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T = f32> {
    elements: Vec<T>,
}

impl<T: Scalar> Vector<T> {
    pub fn zeros(len: usize) -> Result<Self> {
        Ok(Self {
            elements: try_zeros(len)?,
        })
    }

    pub fn labeled<'a>(&'a self, name: &'a str) -> LabeledVector<'a, T> {
        LabeledVector::new(name, &self.elements)
    }
}

impl<T> From<Vec<T>> for Vector<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements }
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T> {
    fn from(elements: [T; N]) -> Self {
        Self {
            elements: elements.into(),
        }
    }
}

impl<T> Deref for Vector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.elements
    }
}

impl<T> DerefMut for Vector<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.elements
    }
}

/// Row-major `rows x cols` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T = f32> {
    rows: usize,
    cols: usize,
    elements: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or(SimError::AllocationFailure {
                elements: usize::MAX,
            })?;
        Ok(Self {
            rows,
            cols,
            elements: try_zeros(len)?,
        })
    }

    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Self::zeros(n, n)?;
        for i in 0..n {
            m.elements[i * n + i] = T::one();
        }
        Ok(m)
    }

    pub fn from_row_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or(SimError::AllocationFailure {
                elements: usize::MAX,
            })?;
        ensure_len("matrix_from_row_slice", len, data.len())?;
        Ok(Self {
            rows,
            cols,
            elements: data.to_vec(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.elements
    }

    fn check_index(&self, i: usize, j: usize) -> Result<usize> {
        if i >= self.rows {
            return Err(SimError::IndexOutOfRange {
                op: "matrix_get_element",
                index: i,
                bound: self.rows,
            });
        }
        if j >= self.cols {
            return Err(SimError::IndexOutOfRange {
                op: "matrix_get_element",
                index: j,
                bound: self.cols,
            });
        }
        Ok(i * self.cols + j)
    }

    pub fn element(&self, i: usize, j: usize) -> Result<T> {
        let at = self.check_index(i, j)?;
        Ok(self.elements[at])
    }

    pub fn set_element(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        let at = self.check_index(i, j)?;
        self.elements[at] = value;
        Ok(())
    }

    pub fn row(&self, i: usize) -> Result<&[T]> {
        if i >= self.rows {
            return Err(SimError::IndexOutOfRange {
                op: "matrix_row",
                index: i,
                bound: self.rows,
            });
        }
        Ok(&self.elements[i * self.cols..(i + 1) * self.cols])
    }

    pub fn row_mut(&mut self, i: usize) -> Result<&mut [T]> {
        if i >= self.rows {
            return Err(SimError::IndexOutOfRange {
                op: "matrix_row",
                index: i,
                bound: self.rows,
            });
        }
        Ok(&mut self.elements[i * self.cols..(i + 1) * self.cols])
    }

    pub fn column(&self, j: usize) -> Result<Vec<T>> {
        if j >= self.cols {
            return Err(SimError::IndexOutOfRange {
                op: "matrix_column",
                index: j,
                bound: self.cols,
            });
        }
        Ok(self
            .elements
            .iter()
            .skip(j)
            .step_by(self.cols)
            .copied()
            .collect())
    }

    /// Copies `vector` into row `index`. Used to accumulate one state per
    /// time step.
    pub fn place_vector(&mut self, vector: &[T], index: usize) -> Result<()> {
        ensure_len("matrix_place_vector", self.cols, vector.len())?;
        self.row_mut(index)?.copy_from_slice(vector);
        Ok(())
    }

    pub fn labeled<'a>(&'a self, name: &'a str) -> LabeledMatrix<'a, T> {
        LabeledMatrix { name, matrix: self }
    }
}

impl Matrix<f32> {
    pub fn to_dmatrix(&self) -> DMatrix<f32> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.elements)
    }

    /// Rank-2 tensor with shape `[rows, cols]`.
    pub fn to_tensor(&self) -> Result<Tensor> {
        Tensor::from_vec(&[self.rows, self.cols], self.elements.clone())
    }
}

fn fmt_value<T: Scalar>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Labelled dump of a vector, one element per line.
pub struct LabeledVector<'a, T> {
    name: &'a str,
    elements: &'a [T],
}

impl<'a, T> LabeledVector<'a, T> {
    pub fn new(name: &'a str, elements: &'a [T]) -> Self {
        Self { name, elements }
    }
}

impl<T: Scalar> fmt::Display for LabeledVector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} <{}> : [", self.name, self.elements.len())?;
        for &value in self.elements {
            writeln!(f, "  {:.6},", fmt_value(value))?;
        }
        write!(f, "]")
    }
}

/// Labelled dump of a matrix, one tab-separated line per row.
pub struct LabeledMatrix<'a, T> {
    name: &'a str,
    matrix: &'a Matrix<T>,
}

impl<T: Scalar> fmt::Display for LabeledMatrix<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.matrix;
        writeln!(f, "{} <{},{}>: [", self.name, m.rows, m.cols)?;
        if m.cols > 0 {
            for row in m.elements.chunks_exact(m.cols) {
                for &value in row {
                    write!(f, "  {:.6},\t", fmt_value(value))?;
                }
                writeln!(f)?;
            }
        }
        write!(f, "]")
    }
}
