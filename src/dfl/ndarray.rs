//! numpy arrays inside a pickled DFL dictionary
//!
//! numpy pickles an array as `_reconstruct(ndarray, (0,), b'b')` followed
//! by a `BUILD` with `(1, shape, dtype, fortran_order, raw_bytes)`. The
//! dtype is itself `dtype(code, False, True)` built with
//! `(3, byte_order, None, None, None, -1, -1, 0)`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::dfl::constants::numpy;
use crate::dfl::types::MetaValue;

/// A numeric numpy array: dtype, shape and the raw element buffer
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    /// Kind and item size, for example `u1` or `f8`
    pub dtype: String,
    pub big_endian: bool,
    pub shape: Vec<usize>,
    pub fortran_order: bool,
    pub data: Vec<u8>,
}

impl NdArray {
    /// A `uint8` array over `data`
    pub fn uint8(data: Vec<u8>, shape: Vec<usize>) -> Self {
        NdArray {
            dtype: "u1".to_string(),
            big_endian: false,
            shape,
            fortran_order: false,
            data,
        }
    }

    /// A little-endian `float32` array
    pub fn float32(values: &[f32], shape: Vec<usize>) -> Self {
        let mut data = vec![0u8; values.len() * 4];
        LittleEndian::write_f32_into(values, &mut data);
        NdArray {
            dtype: "f4".to_string(),
            big_endian: false,
            shape,
            fortran_order: false,
            data,
        }
    }

    /// Recognizes the pickled form of a numeric array
    ///
    /// Returns `None` for anything else, including object arrays and
    /// buffers whose length does not match the shape.
    pub fn from_value(value: &MetaValue) -> Option<Self> {
        let MetaValue::Build { object, state } = value else {
            return None;
        };
        let MetaValue::Reduce { callable, .. } = object.as_ref() else {
            return None;
        };
        let is_reconstruct = numpy::MULTIARRAY_MODULES
            .iter()
            .any(|module| callable.is_global(module, numpy::RECONSTRUCT));
        if !is_reconstruct {
            return None;
        }

        let (shape, dtype, fortran, data) = match state.as_sequence()? {
            [_, shape, dtype, fortran, data] | [shape, dtype, fortran, data] => {
                (shape, dtype, fortran, data)
            }
            _ => return None,
        };

        let shape = shape
            .as_sequence()?
            .iter()
            .map(|dim| dim.as_i64().and_then(|d| usize::try_from(d).ok()))
            .collect::<Option<Vec<usize>>>()?;
        let (dtype, big_endian) = parse_dtype(dtype)?;
        let fortran_order = matches!(fortran, MetaValue::Bool(true));
        let data = match data {
            MetaValue::Bytes(bytes) => bytes.clone(),
            // Python 2 pickles the buffer as a latin-1 str
            MetaValue::Str(text) => text
                .chars()
                .map(|c| u8::try_from(c as u32).ok())
                .collect::<Option<Vec<u8>>>()?,
            _ => return None,
        };

        let array = NdArray {
            dtype,
            big_endian,
            shape,
            fortran_order,
            data,
        };
        let expected = array.element_count().checked_mul(array.item_size()?)?;
        (expected == array.data.len()).then_some(array)
    }

    /// The pickled form numpy itself writes
    pub fn to_value(&self) -> MetaValue {
        let order = if self.item_size() == Some(1) {
            "|"
        } else if self.big_endian {
            ">"
        } else {
            "<"
        };

        let dtype = MetaValue::Build {
            object: Box::new(MetaValue::Reduce {
                callable: Box::new(global(numpy::MODULE, numpy::DTYPE)),
                args: Box::new(MetaValue::Tuple(vec![
                    MetaValue::str(&self.dtype),
                    MetaValue::Bool(false),
                    MetaValue::Bool(true),
                ])),
            }),
            state: Box::new(MetaValue::Tuple(vec![
                MetaValue::Int(numpy::DTYPE_STATE_VERSION),
                MetaValue::str(order),
                MetaValue::Null,
                MetaValue::Null,
                MetaValue::Null,
                MetaValue::Int(-1),
                MetaValue::Int(-1),
                MetaValue::Int(0),
            ])),
        };

        let shape = self.shape.iter().map(|&dim| MetaValue::Int(dim as i64)).collect();
        MetaValue::Build {
            object: Box::new(MetaValue::Reduce {
                callable: Box::new(global(numpy::MULTIARRAY_MODULES[0], numpy::RECONSTRUCT)),
                args: Box::new(MetaValue::Tuple(vec![
                    global(numpy::MODULE, numpy::NDARRAY),
                    MetaValue::Tuple(vec![MetaValue::Int(0)]),
                    MetaValue::Bytes(b"b".to_vec()),
                ])),
            }),
            state: Box::new(MetaValue::Tuple(vec![
                MetaValue::Int(numpy::ARRAY_STATE_VERSION),
                MetaValue::Tuple(shape),
                dtype,
                MetaValue::Bool(self.fortran_order),
                MetaValue::Bytes(self.data.clone()),
            ])),
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Bytes per element, from the digits of the dtype code
    pub fn item_size(&self) -> Option<usize> {
        self.dtype.get(1..)?.parse().ok().filter(|&size| size > 0)
    }

    /// Elements as `f64` in row-major order
    ///
    /// Supports the integer and float dtypes. Fortran-ordered arrays are
    /// only reordered for one or two dimensions.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let size = self.item_size()?;
        let kind = self.dtype.chars().next()?;
        let values = self
            .data
            .chunks_exact(size)
            .map(|raw| self.element(kind, raw))
            .collect::<Option<Vec<f64>>>()?;

        if !self.fortran_order || self.shape.len() < 2 {
            return Some(values);
        }
        if self.shape.len() > 2 {
            return None;
        }

        let (rows, cols) = (self.shape[0], self.shape[1]);
        let mut ordered = Vec::with_capacity(values.len());
        for row in 0..rows {
            for col in 0..cols {
                ordered.push(values[col * rows + row]);
            }
        }
        Some(ordered)
    }

    fn element(&self, kind: char, raw: &[u8]) -> Option<f64> {
        if self.big_endian {
            decode_element::<BigEndian>(kind, raw)
        } else {
            decode_element::<LittleEndian>(kind, raw)
        }
    }
}

fn decode_element<B: ByteOrder>(kind: char, raw: &[u8]) -> Option<f64> {
    let value = match (kind, raw.len()) {
        ('f', 4) => B::read_f32(raw) as f64,
        ('f', 8) => B::read_f64(raw),
        ('u', 1) => raw[0] as f64,
        ('u', 2) => B::read_u16(raw) as f64,
        ('u', 4) => B::read_u32(raw) as f64,
        ('u', 8) => B::read_u64(raw) as f64,
        ('i', 1) => raw[0] as i8 as f64,
        ('i', 2) => B::read_i16(raw) as f64,
        ('i', 4) => B::read_i32(raw) as f64,
        ('i', 8) => B::read_i64(raw) as f64,
        _ => return None,
    };
    Some(value)
}

fn parse_dtype(value: &MetaValue) -> Option<(String, bool)> {
    let MetaValue::Build { object, state } = value else {
        return None;
    };
    let MetaValue::Reduce { callable, args } = object.as_ref() else {
        return None;
    };
    if !callable.is_global(numpy::MODULE, numpy::DTYPE) {
        return None;
    }

    let code = args.as_sequence()?.first()?.as_str()?;
    // A code may carry its own byte order prefix
    let (code, prefix) = match code.strip_prefix(|c: char| "<>=|".contains(c)) {
        Some(rest) => (rest, code.chars().next()),
        None => (code, None),
    };
    let order = state
        .as_sequence()
        .and_then(|fields| fields.get(1))
        .and_then(MetaValue::as_str)
        .and_then(|order| order.chars().next())
        .or(prefix);

    Some((code.to_string(), order == Some('>')))
}

fn global(module: &str, name: &str) -> MetaValue {
    MetaValue::Global {
        module: module.to_string(),
        name: name.to_string(),
    }
}
