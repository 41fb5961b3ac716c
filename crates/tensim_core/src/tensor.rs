//! Owned, contiguous, row-major N-dimensional `f32` arrays.
//!
//! A [`Tensor`] owns both its shape and its element buffer, and releases them
//! together when dropped. Slabs (sub-arrays with the leading axis fixed) can be
//! borrowed in place with [`Tensor::slab`] or copied out into an independent
//! tensor with [`Tensor::slice`].

use crate::error::{Result, SimError};

/// Row-major strides for `shape` (last axis fastest-varying).
pub(crate) fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut acc = 1;
    for dim in shape.iter().rev() {
        strides.push(acc);
        acc *= *dim;
    }
    strides.reverse();
    strides
}

/// Number of elements described by `shape`, rejecting zero-sized axes and
/// products that overflow `usize`.
fn element_count(shape: &[usize]) -> Result<usize> {
    let mut count = 1usize;
    for (axis, &dim) in shape.iter().enumerate() {
        if dim == 0 {
            return Err(SimError::InvalidShape(format!(
                "axis {axis} of {shape:?} has zero length"
            )));
        }
        count = count
            .checked_mul(dim)
            .ok_or(SimError::AllocationFailure {
                elements: usize::MAX,
            })?;
    }
    Ok(count)
}

pub(crate) fn try_alloc(len: usize) -> Result<Vec<f32>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SimError::AllocationFailure { elements: len })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    elements: Vec<f32>,
}

impl Tensor {
    /// Allocates a tensor with an independent copy of `shape`; every element
    /// starts at zero.
    pub fn new(shape: &[usize]) -> Result<Self> {
        let len = element_count(shape)?;
        let mut owned_shape = Vec::new();
        owned_shape
            .try_reserve_exact(shape.len())
            .map_err(|_| SimError::AllocationFailure {
                elements: shape.len(),
            })?;
        owned_shape.extend_from_slice(shape);
        let elements = try_alloc(len)?;
        Ok(Self {
            shape: owned_shape,
            elements,
        })
    }

    pub fn from_vec(shape: &[usize], elements: Vec<f32>) -> Result<Self> {
        let len = element_count(shape)?;
        if elements.len() != len {
            return Err(SimError::DimensionMismatch {
                op: "tensor_from_vec",
                expected: len,
                actual: elements.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            elements,
        })
    }

    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Product of the shape; always equal to the element buffer length.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.elements
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.elements
    }

    pub fn set_zero(&mut self) {
        self.elements.fill(0.0);
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::new(&self.shape)?;
        copy.elements.copy_from_slice(&self.elements);
        Ok(copy)
    }

    /// Overwrites `self` with the contents of a tensor of identical shape.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<()> {
        if self.ndims() != src.ndims() {
            return Err(SimError::DimensionMismatch {
                op: "tensor_copyto",
                expected: self.ndims(),
                actual: src.ndims(),
            });
        }
        if self.shape != src.shape {
            return Err(SimError::ShapeMismatch {
                op: "tensor_copyto",
                expected: self.shape.clone(),
                actual: src.shape.clone(),
            });
        }
        self.elements.copy_from_slice(&src.elements);
        Ok(())
    }

    /// Length of one slab along the leading axis.
    pub fn slab_len(&self) -> Result<usize> {
        if self.shape.is_empty() {
            return Err(SimError::InvalidShape(
                "a rank-0 tensor has no leading axis".to_string(),
            ));
        }
        Ok(self.shape[1..].iter().product())
    }

    fn slab_range(&self, op: &'static str, index: usize) -> Result<std::ops::Range<usize>> {
        let slab_len = self.slab_len()?;
        if index >= self.shape[0] {
            return Err(SimError::IndexOutOfRange {
                op,
                index,
                bound: self.shape[0],
            });
        }
        let start = index * slab_len;
        Ok(start..start + slab_len)
    }

    /// Borrows slab `index` in place.
    pub fn slab(&self, index: usize) -> Result<&[f32]> {
        let range = self.slab_range("tensor_slab", index)?;
        Ok(&self.elements[range])
    }

    pub fn slab_mut(&mut self, index: usize) -> Result<&mut [f32]> {
        let range = self.slab_range("tensor_slab", index)?;
        Ok(&mut self.elements[range])
    }

    /// Writes all of `src` over slab `index` of `self`.
    ///
    /// `self` must have exactly one more axis than `src`, and its trailing
    /// axes must equal `src`'s shape.
    pub fn copy_into_slab(&mut self, src: &Tensor, index: usize) -> Result<()> {
        if self.ndims() != src.ndims() + 1 {
            return Err(SimError::DimensionMismatch {
                op: "tensor_copyto_index",
                expected: src.ndims() + 1,
                actual: self.ndims(),
            });
        }
        if self.shape[1..] != src.shape[..] {
            return Err(SimError::ShapeMismatch {
                op: "tensor_copyto_index",
                expected: self.shape[1..].to_vec(),
                actual: src.shape.clone(),
            });
        }
        let range = self.slab_range("tensor_copyto_index", index)?;
        self.elements[range].copy_from_slice(&src.elements);
        Ok(())
    }

    /// Copies slab `index` out into a new, independently owned tensor of one
    /// lower rank. Mutating the result never affects `self`.
    pub fn slice(&self, index: usize) -> Result<Tensor> {
        let range = self.slab_range("tensor_slice", index)?;
        let mut out = Tensor::new(&self.shape[1..])?;
        out.elements.copy_from_slice(&self.elements[range]);
        Ok(out)
    }

    /// Non-allocating [`Tensor::slice`] into a pre-sized `dst`.
    pub fn slice_into(&self, dst: &mut Tensor, index: usize) -> Result<()> {
        if self.ndims() != dst.ndims() + 1 {
            return Err(SimError::DimensionMismatch {
                op: "tensor_sliceto",
                expected: dst.ndims() + 1,
                actual: self.ndims(),
            });
        }
        if self.shape[1..] != dst.shape[..] {
            return Err(SimError::ShapeMismatch {
                op: "tensor_sliceto",
                expected: self.shape[1..].to_vec(),
                actual: dst.shape.clone(),
            });
        }
        let range = self.slab_range("tensor_sliceto", index)?;
        dst.elements.copy_from_slice(&self.elements[range]);
        Ok(())
    }

    /// Flat buffer offset of a full multi-index.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndims() {
            return Err(SimError::DimensionMismatch {
                op: "tensor_offset",
                expected: self.ndims(),
                actual: index.len(),
            });
        }
        let strides = contiguous_strides(&self.shape);
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&strides) {
            if i >= dim {
                return Err(SimError::IndexOutOfRange {
                    op: "tensor_offset",
                    index: i,
                    bound: dim,
                });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    pub fn get(&self, index: &[usize]) -> Result<f32> {
        let offset = self.offset(index)?;
        Ok(self.elements[offset])
    }

    pub fn set(&mut self, index: &[usize], value: f32) -> Result<()> {
        let offset = self.offset(index)?;
        self.elements[offset] = value;
        Ok(())
    }

    pub fn scalar_add(&mut self, scalar: f32) {
        for value in &mut self.elements {
            *value += scalar;
        }
    }

    pub fn add_assign(&mut self, other: &Tensor) -> Result<()> {
        if self.shape != other.shape {
            return Err(SimError::ShapeMismatch {
                op: "tensor_add",
                expected: self.shape.clone(),
                actual: other.shape.clone(),
            });
        }
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a += *b;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{contiguous_strides, Tensor};
    use crate::error::SimError;

    fn ramp(shape: &[usize]) -> Tensor {
        let len = shape.iter().product();
        let elements = (0..len).map(|i| i as f32).collect();
        Tensor::from_vec(shape, elements).expect("ramp tensor")
    }

    #[test]
    fn strides_are_row_major() {
        assert_eq!(contiguous_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(contiguous_strides(&[5]), vec![1]);
        assert!(contiguous_strides(&[]).is_empty());
    }

    #[test]
    fn new_tensor_has_product_length_and_owned_shape() {
        let mut shape = vec![2, 3, 4];
        let t = Tensor::new(&shape).expect("tensor");
        shape[0] = 9;
        assert_eq!(t.shape(), &[2, 3, 4]);
        assert_eq!(t.ndims(), 3);
        assert_eq!(t.len(), 24);
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn new_rejects_zero_axis_and_overflow() {
        assert!(matches!(
            Tensor::new(&[3, 0]),
            Err(SimError::InvalidShape(_))
        ));
        assert!(matches!(
            Tensor::new(&[usize::MAX, 2]),
            Err(SimError::AllocationFailure { .. })
        ));
    }

    #[test]
    fn from_vec_checks_length() {
        let err = Tensor::from_vec(&[2, 2], vec![1.0; 3]).expect_err("length mismatch");
        assert!(matches!(
            err,
            SimError::DimensionMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn set_zero_clears_every_element() {
        let mut t = ramp(&[3, 3]);
        t.set_zero();
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(t.len(), 9);
    }

    #[test]
    fn try_clone_is_deep() {
        let t = ramp(&[2, 5]);
        let mut copy = t.try_clone().expect("copy");
        assert_eq!(copy, t);
        copy.as_mut_slice()[0] = 42.0;
        assert_eq!(t.as_slice()[0], 0.0);
    }

    #[test]
    fn copy_from_requires_identical_shape() {
        let src = ramp(&[2, 3]);
        let mut dst = Tensor::new(&[2, 3]).expect("dst");
        dst.copy_from(&src).expect("copyto");
        assert_eq!(dst, src);

        let mut wrong_rank = Tensor::new(&[6]).expect("dst");
        assert!(matches!(
            wrong_rank.copy_from(&src),
            Err(SimError::DimensionMismatch { .. })
        ));
        let mut wrong_shape = Tensor::new(&[3, 2]).expect("dst");
        assert!(matches!(
            wrong_shape.copy_from(&src),
            Err(SimError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn slice_copies_the_indexed_slab() {
        let t = ramp(&[3, 2, 2]);
        let slab = t.slice(2).expect("slice");
        assert_eq!(slab.shape(), &[2, 2]);
        assert_eq!(slab.as_slice(), &[8.0, 9.0, 10.0, 11.0]);

        let mut slab = t.slice(1).expect("slice");
        slab.as_mut_slice()[0] = -1.0;
        assert_eq!(t.as_slice()[4], 4.0);
    }

    #[test]
    fn slice_then_copy_into_slab_round_trips() {
        let t = ramp(&[4, 3]);
        let mut rebuilt = Tensor::new(t.shape()).expect("zeroed");
        for i in 0..4 {
            let slab = t.slice(i).expect("slice");
            rebuilt.copy_into_slab(&slab, i).expect("copyto_index");
            assert_eq!(rebuilt.slab(i).expect("slab"), t.slab(i).expect("slab"));
        }
        assert_eq!(rebuilt, t);
    }

    #[test]
    fn slab_mut_writes_through_to_the_tensor() {
        let mut t = ramp(&[3, 2]);
        t.slab_mut(1).expect("slab").copy_from_slice(&[-1.0, -2.0]);
        assert_eq!(t.as_slice(), &[0.0, 1.0, -1.0, -2.0, 4.0, 5.0]);
        assert!(matches!(
            t.slab_mut(3),
            Err(SimError::IndexOutOfRange { index: 3, bound: 3, .. })
        ));
    }

    #[test]
    fn slice_into_reuses_destination() {
        let t = ramp(&[2, 4]);
        let mut dst = Tensor::new(&[4]).expect("dst");
        t.slice_into(&mut dst, 1).expect("sliceto");
        assert_eq!(dst.as_slice(), &[4.0, 5.0, 6.0, 7.0]);

        let mut wrong = Tensor::new(&[3]).expect("dst");
        assert!(matches!(
            t.slice_into(&mut wrong, 0),
            Err(SimError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn slicing_out_of_range_is_rejected() {
        let t = ramp(&[2, 2]);
        assert!(matches!(
            t.slice(2),
            Err(SimError::IndexOutOfRange { index: 2, bound: 2, .. })
        ));
        let scalar = Tensor::new(&[]).expect("scalar");
        assert_eq!(scalar.len(), 1);
        assert!(matches!(scalar.slice(0), Err(SimError::InvalidShape(_))));
    }

    #[test]
    fn copy_into_slab_checks_rank_and_trailing_shape() {
        let mut dst = Tensor::new(&[5, 2, 3]).expect("dst");
        let same_rank = Tensor::new(&[2, 3, 1]).expect("src");
        assert!(matches!(
            dst.copy_into_slab(&same_rank, 0),
            Err(SimError::DimensionMismatch { .. })
        ));
        let wrong_shape = Tensor::new(&[3, 2]).expect("src");
        assert!(matches!(
            dst.copy_into_slab(&wrong_shape, 0),
            Err(SimError::ShapeMismatch { .. })
        ));
        let src = ramp(&[2, 3]);
        assert!(matches!(
            dst.copy_into_slab(&src, 5),
            Err(SimError::IndexOutOfRange { .. })
        ));
        dst.copy_into_slab(&src, 4).expect("copyto_index");
        assert_eq!(&dst.as_slice()[24..], src.as_slice());
        assert!(dst.as_slice()[..24].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn multi_index_access_is_row_major() {
        let mut t = ramp(&[2, 3, 4]);
        assert_eq!(t.get(&[1, 2, 3]).expect("get"), 23.0);
        assert_eq!(t.offset(&[1, 0, 2]).expect("offset"), 14);
        t.set(&[0, 1, 0], -5.0).expect("set");
        assert_eq!(t.as_slice()[4], -5.0);
        assert!(matches!(
            t.get(&[0, 3, 0]),
            Err(SimError::IndexOutOfRange { index: 3, bound: 3, .. })
        ));
        assert!(matches!(
            t.get(&[0, 0]),
            Err(SimError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn elementwise_add_and_scalar_add() {
        let mut a = ramp(&[2, 2]);
        let b = ramp(&[2, 2]);
        a.add_assign(&b).expect("add");
        assert_eq!(a.as_slice(), &[0.0, 2.0, 4.0, 6.0]);
        a.scalar_add(1.5);
        assert_eq!(a.as_slice(), &[1.5, 3.5, 5.5, 7.5]);

        let c = Tensor::new(&[4]).expect("c");
        assert!(matches!(
            a.add_assign(&c),
            Err(SimError::ShapeMismatch { .. })
        ));
    }
}
