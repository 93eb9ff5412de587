//! Typed column buffers with explicit capacity and copy-on-grow storage.

use serde::{Deserialize, Serialize};

use crate::schema::ColumnKind;
use crate::value::Value;

/// Bit vector backed by u64 words. Holds null flags for every column and
/// the data itself for boolean columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, bit: bool) {
        let word = self.len / 64;
        if word == self.words.len() {
            self.words.push(0);
        }
        if bit {
            self.words[word] |= 1 << (self.len % 64);
        }
        self.len += 1;
    }

    /// Bit at `index`; out-of-range reads are false.
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / 64] >> (index % 64) & 1 == 1
    }

    /// Overwrites a bit inside the current length.
    pub fn set(&mut self, index: usize, bit: bool) {
        debug_assert!(index < self.len);
        let mask = 1u64 << (index % 64);
        if bit {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Fresh vector with room for `capacity` bits, holding the same bits.
    fn copy_with_capacity(&self, capacity: usize) -> Self {
        let mut words = Vec::with_capacity(capacity.div_ceil(64));
        words.extend_from_slice(&self.words);
        Self {
            words,
            len: self.len,
        }
    }
}

/// Storage for one column: a homogeneous native vector plus one null
/// flag per row. Growth never resizes in place; a fresh buffer is
/// allocated, existing values are copied over, and the old one is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnBuffer {
    String { data: Vec<String>, nulls: BitVec },
    Integer { data: Vec<i32>, nulls: BitVec },
    Double { data: Vec<f64>, nulls: BitVec },
    Boolean { data: BitVec, nulls: BitVec },
    Binary { data: Vec<Vec<u8>>, nulls: BitVec },
}

impl ColumnBuffer {
    pub fn with_capacity(kind: ColumnKind, capacity: usize) -> Self {
        let nulls = BitVec::with_capacity(capacity);
        match kind {
            ColumnKind::String => Self::String {
                data: Vec::with_capacity(capacity),
                nulls,
            },
            ColumnKind::Integer => Self::Integer {
                data: Vec::with_capacity(capacity),
                nulls,
            },
            ColumnKind::Double => Self::Double {
                data: Vec::with_capacity(capacity),
                nulls,
            },
            ColumnKind::Boolean => Self::Boolean {
                data: BitVec::with_capacity(capacity),
                nulls,
            },
            ColumnKind::Binary => Self::Binary {
                data: Vec::with_capacity(capacity),
                nulls,
            },
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::String { .. } => ColumnKind::String,
            Self::Integer { .. } => ColumnKind::Integer,
            Self::Double { .. } => ColumnKind::Double,
            Self::Boolean { .. } => ColumnKind::Boolean,
            Self::Binary { .. } => ColumnKind::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::String { data, .. } => data.len(),
            Self::Integer { data, .. } => data.len(),
            Self::Double { data, .. } => data.len(),
            Self::Boolean { data, .. } => data.len(),
            Self::Binary { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.nulls().get(index)
    }

    pub fn null_count(&self) -> usize {
        self.nulls().count_ones()
    }

    fn nulls(&self) -> &BitVec {
        match self {
            Self::String { nulls, .. }
            | Self::Integer { nulls, .. }
            | Self::Double { nulls, .. }
            | Self::Boolean { nulls, .. }
            | Self::Binary { nulls, .. } => nulls,
        }
    }

    /// Appends a decoded value. `Value::Null` stores the kind default and
    /// sets the null flag; the caller guarantees the kind matches.
    pub fn push(&mut self, value: &Value) {
        match (&mut *self, value) {
            (Self::String { data, nulls }, Value::String(v)) => {
                data.push(v.clone());
                nulls.push(false);
            }
            (Self::String { data, nulls }, Value::Null) => {
                data.push(String::new());
                nulls.push(true);
            }
            (Self::Integer { data, nulls }, Value::Integer(v)) => {
                data.push(*v);
                nulls.push(false);
            }
            (Self::Integer { data, nulls }, Value::Null) => {
                data.push(0);
                nulls.push(true);
            }
            (Self::Double { data, nulls }, Value::Double(v)) => {
                data.push(*v);
                nulls.push(false);
            }
            (Self::Double { data, nulls }, Value::Null) => {
                data.push(0.0);
                nulls.push(true);
            }
            (Self::Boolean { data, nulls }, Value::Boolean(v)) => {
                data.push(*v);
                nulls.push(false);
            }
            (Self::Boolean { data, nulls }, Value::Null) => {
                data.push(false);
                nulls.push(true);
            }
            (Self::Binary { data, nulls }, Value::Binary(v)) => {
                data.push(v.clone());
                nulls.push(false);
            }
            (Self::Binary { data, nulls }, Value::Null) => {
                data.push(Vec::new());
                nulls.push(true);
            }
            _ => unreachable!("decoded value does not match column kind"),
        }
    }

    /// Overwrites one cell with a decoded value of the matching kind.
    pub fn set(&mut self, index: usize, value: &Value) {
        match (&mut *self, value) {
            (Self::String { data, nulls }, Value::String(v)) => {
                data[index] = v.clone();
                nulls.set(index, false);
            }
            (Self::String { data, nulls }, Value::Null) => {
                data[index] = String::new();
                nulls.set(index, true);
            }
            (Self::Integer { data, nulls }, Value::Integer(v)) => {
                data[index] = *v;
                nulls.set(index, false);
            }
            (Self::Integer { data, nulls }, Value::Null) => {
                data[index] = 0;
                nulls.set(index, true);
            }
            (Self::Double { data, nulls }, Value::Double(v)) => {
                data[index] = *v;
                nulls.set(index, false);
            }
            (Self::Double { data, nulls }, Value::Null) => {
                data[index] = 0.0;
                nulls.set(index, true);
            }
            (Self::Boolean { data, nulls }, Value::Boolean(v)) => {
                data.set(index, *v);
                nulls.set(index, false);
            }
            (Self::Boolean { data, nulls }, Value::Null) => {
                data.set(index, false);
                nulls.set(index, true);
            }
            (Self::Binary { data, nulls }, Value::Binary(v)) => {
                data[index] = v.clone();
                nulls.set(index, false);
            }
            (Self::Binary { data, nulls }, Value::Null) => {
                data[index] = Vec::new();
                nulls.set(index, true);
            }
            _ => unreachable!("decoded value does not match column kind"),
        }
    }

    /// Decoded value of one cell; `Value::Null` when the null flag is set.
    pub fn get(&self, index: usize) -> Value {
        if self.is_null(index) {
            return Value::Null;
        }
        match self {
            Self::String { data, .. } => Value::String(data[index].clone()),
            Self::Integer { data, .. } => Value::Integer(data[index]),
            Self::Double { data, .. } => Value::Double(data[index]),
            Self::Boolean { data, .. } => Value::Boolean(data.get(index)),
            Self::Binary { data, .. } => Value::Binary(data[index].clone()),
        }
    }

    /// Replaces the backing storage with a fresh allocation able to hold
    /// `capacity` rows, carrying over every value and null flag.
    pub fn grow_to(&mut self, capacity: usize) {
        match self {
            Self::String { data, nulls } => {
                let mut next = Vec::with_capacity(capacity);
                next.append(data);
                *data = next;
                *nulls = nulls.copy_with_capacity(capacity);
            }
            Self::Integer { data, nulls } => {
                let mut next = Vec::with_capacity(capacity);
                next.extend_from_slice(data);
                *data = next;
                *nulls = nulls.copy_with_capacity(capacity);
            }
            Self::Double { data, nulls } => {
                let mut next = Vec::with_capacity(capacity);
                next.extend_from_slice(data);
                *data = next;
                *nulls = nulls.copy_with_capacity(capacity);
            }
            Self::Boolean { data, nulls } => {
                *data = data.copy_with_capacity(capacity);
                *nulls = nulls.copy_with_capacity(capacity);
            }
            Self::Binary { data, nulls } => {
                let mut next = Vec::with_capacity(capacity);
                next.append(data);
                *data = next;
                *nulls = nulls.copy_with_capacity(capacity);
            }
        }
    }
}
