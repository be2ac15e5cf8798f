//! Lazily loaded n-dimensional arrays.

use std::fmt;
use std::sync::Arc;

use crate::error::{DatasetError, Result};

/// A materialized row-major array of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ArrayData {
    /// Create an array, checking that the value count matches the shape.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(DatasetError::ShapeMismatch {
                name: "<array>".to_string(),
                expected: shape,
                actual: vec![values.len()],
            });
        }
        Ok(Self { shape, values })
    }

    /// A 1-D array.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a multi-index, `None` when out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            offset = offset * n + i;
        }
        self.values.get(offset).copied()
    }
}

/// Something that can produce array values on demand.
///
/// Implementations are expected to be cheap to hold and to do their I/O
/// only inside [`ArraySource::load`].
pub trait ArraySource: Send + Sync + fmt::Debug {
    /// Shape of the array this source produces.
    fn shape(&self) -> &[usize];

    /// Read all values.
    fn load(&self) -> Result<ArrayData>;
}

/// Array already held in memory.
#[derive(Debug)]
pub struct InMemoryArray {
    data: ArrayData,
}

impl InMemoryArray {
    pub fn new(data: ArrayData) -> Self {
        Self { data }
    }
}

impl ArraySource for InMemoryArray {
    fn shape(&self) -> &[usize] {
        &self.data.shape
    }

    fn load(&self) -> Result<ArrayData> {
        Ok(self.data.clone())
    }
}

/// Shared handle to an array source.
///
/// Cloning is cheap; equality is identity of the underlying source.
#[derive(Clone)]
pub struct LazyArray {
    source: Arc<dyn ArraySource>,
}

impl LazyArray {
    pub fn new<S: ArraySource + 'static>(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_arc(source: Arc<dyn ArraySource>) -> Self {
        Self { source }
    }

    /// Wrap values that are already loaded.
    pub fn from_data(data: ArrayData) -> Self {
        Self::new(InMemoryArray::new(data))
    }

    pub fn shape(&self) -> &[usize] {
        self.source.shape()
    }

    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn load(&self) -> Result<ArrayData> {
        self.source.load()
    }

    /// True when both handles point at the same source.
    pub fn same_source(&self, other: &LazyArray) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.source) as *const (),
            Arc::as_ptr(&other.source) as *const (),
        )
    }
}

impl PartialEq for LazyArray {
    fn eq(&self, other: &Self) -> bool {
        self.same_source(other)
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("shape", &self.shape())
            .finish()
    }
}
