/// A value produced by a field mapping.
///
/// Only [`Value::Sequence`] triggers flattening. A [`Value::Vector`] written to a
/// fixed-vector field is a single cell, not a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
    Sequence(Vec<Value>),
}

impl Value {
    #[inline]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Length of a sequence value, `None` for scalars and vectors.
    #[inline]
    pub fn sequence_len(&self) -> Option<usize> {
        match self {
            Value::Sequence(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Component `i` as written into a cell.
    ///
    /// A scalar only has component 0. Sequences have no components of their own;
    /// the packer writes their elements row by row instead.
    #[inline]
    pub fn component(&self, i: usize) -> Option<f64> {
        match self {
            Value::Scalar(v) => (i == 0).then_some(*v),
            Value::Vector(v) => v.get(i).copied(),
            Value::Sequence(_) => None,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Scalar(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Scalar(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Scalar(v as f64)
    }
}

impl<const N: usize> From<[f32; N]> for Value {
    fn from(v: [f32; N]) -> Self {
        Value::Vector(v.iter().map(|c| *c as f64).collect())
    }
}

impl<const N: usize> From<[u32; N]> for Value {
    fn from(v: [u32; N]) -> Self {
        Value::Vector(v.iter().map(|c| *c as f64).collect())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(v: [u8; N]) -> Self {
        Value::Vector(v.iter().map(|c| *c as f64).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}
