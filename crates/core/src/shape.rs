//! # Shapes
//!
//! Symbolic variables rarely know every dimension: a batch axis is usually
//! left open until the graph is compiled. A [`Shape`] therefore mixes fixed
//! and symbolic dimensions, and a symbolic dimension matches anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    I64,
    Bool,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I64 => "i64",
            DType::Bool => "bool",
        };
        write!(f, "{}", name)
    }
}

/// One axis of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    /// Size known while building the graph.
    Fixed(usize),
    /// Size only known once data flows (e.g. the batch axis).
    Symbolic,
}

impl Dim {
    /// Two dimensions meet if either is symbolic or both sizes agree.
    pub fn is_compatible(&self, other: &Dim) -> bool {
        match (self, other) {
            (Dim::Fixed(a), Dim::Fixed(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{}", n),
            Dim::Symbolic => write!(f, "?"),
        }
    }
}

/// Element type plus per-axis dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub dtype: DType,
    pub dims: Vec<Dim>,
}

impl Shape {
    pub fn new(dtype: DType, dims: Vec<Dim>) -> Self {
        Self { dtype, dims }
    }

    /// A shape whose every axis is fixed.
    pub fn fixed(dtype: DType, dims: &[usize]) -> Self {
        Self {
            dtype,
            dims: dims.iter().map(|&n| Dim::Fixed(n)).collect(),
        }
    }

    /// A shape of the given rank with no size information.
    pub fn symbolic(dtype: DType, rank: usize) -> Self {
        Self {
            dtype,
            dims: vec![Dim::Symbolic; rank],
        }
    }

    /// Convenience: f32 scalar
    pub fn f32_scalar() -> Self {
        Self::fixed(DType::F32, &[])
    }

    /// Convenience: f32 vector
    pub fn f32_vector(len: usize) -> Self {
        Self::fixed(DType::F32, &[len])
    }

    /// Convenience: f32 matrix
    pub fn f32_matrix(rows: usize, cols: usize) -> Self {
        Self::fixed(DType::F32, &[rows, cols])
    }

    /// Convenience: an f32 batch of `features`-wide rows, batch size open.
    pub fn f32_batch(features: usize) -> Self {
        Self::new(DType::F32, vec![Dim::Symbolic, Dim::Fixed(features)])
    }

    /// Number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements, if every axis is fixed.
    pub fn numel(&self) -> Option<usize> {
        self.dims
            .iter()
            .map(|d| match d {
                Dim::Fixed(n) => Some(*n),
                Dim::Symbolic => None,
            })
            .product()
    }

    /// Same dtype, same rank, and every axis pair compatible.
    pub fn is_compatible(&self, other: &Shape) -> bool {
        self.dtype == other.dtype
            && self.rank() == other.rank()
            && self
                .dims
                .iter()
                .zip(&other.dims)
                .all(|(a, b)| a.is_compatible(b))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]",
            self.dtype,
            self.dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::f32_scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.numel(), Some(1));
        assert_eq!(s.to_string(), "f32[]");
    }

    #[test]
    fn test_batch_shape() {
        let b = Shape::f32_batch(10);
        assert_eq!(b.rank(), 2);
        assert_eq!(b.numel(), None);
        assert_eq!(b.to_string(), "f32[?, 10]");
    }

    #[test]
    fn test_symbolic_dims_are_wildcards() {
        let batch = Shape::f32_batch(10);
        assert!(batch.is_compatible(&Shape::f32_matrix(32, 10)));
        assert!(!batch.is_compatible(&Shape::f32_matrix(32, 11)));
        assert!(!batch.is_compatible(&Shape::f32_vector(10)));
    }

    #[test]
    fn test_dtype_must_match() {
        let a = Shape::fixed(DType::F32, &[3]);
        let b = Shape::fixed(DType::I64, &[3]);
        assert!(!a.is_compatible(&b));
    }
}
