//! Key-value wire format the watch reads incoming messages in.
//!
//! Layout: a `u8` tuple count, then per tuple a `u32` key, a `u8` type tag,
//! a `u16` value length and the value bytes. All integers little-endian.
//! C strings carry their trailing NUL.

use crate::model::{CITY_KEY, TEMPERATURE_KEY, WeatherMessage};

const TYPE_BYTES: u8 = 0;
const TYPE_CSTRING: u8 = 1;
const TYPE_UINT: u8 = 2;
const TYPE_INT: u8 = 3;

const TUPLE_HEADER_LEN: usize = 4 + 1 + 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictionaryError {
    #[error("input ended after {0} bytes")]
    Truncated(usize),
    #[error("unknown tuple type {0}")]
    UnknownType(u8),
    #[error("integer tuple has width {0}, expected 1, 2 or 4")]
    BadIntegerWidth(usize),
    #[error("C string tuple is not NUL-terminated UTF-8")]
    BadCString,
    #[error("too many tuples ({0})")]
    TooManyTuples(usize),
    #[error("tuple value too long ({0} bytes)")]
    ValueTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    Uint(u32),
    Int(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    tuples: Vec<Tuple>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: u32, value: TupleValue) -> &mut Self {
        self.tuples.push(Tuple { key, value });
        self
    }

    pub fn get(&self, key: u32) -> Option<&TupleValue> {
        self.tuples.iter().find(|t| t.key == key).map(|t| &t.value)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DictionaryError> {
        let count = u8::try_from(self.tuples.len())
            .map_err(|_| DictionaryError::TooManyTuples(self.tuples.len()))?;

        let mut out = vec![count];
        for Tuple { key, value } in &self.tuples {
            let (kind, data) = match value {
                TupleValue::Bytes(b) => (TYPE_BYTES, b.clone()),
                TupleValue::CString(s) => {
                    let mut b = s.as_bytes().to_vec();
                    b.push(0);
                    (TYPE_CSTRING, b)
                }
                TupleValue::Uint(v) => (TYPE_UINT, v.to_le_bytes().to_vec()),
                TupleValue::Int(v) => (TYPE_INT, v.to_le_bytes().to_vec()),
            };
            let len =
                u16::try_from(data.len()).map_err(|_| DictionaryError::ValueTooLong(data.len()))?;

            out.extend_from_slice(&key.to_le_bytes());
            out.push(kind);
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&data);
        }
        Ok(out)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DictionaryError> {
        let (&count, mut rest) = buf.split_first().ok_or(DictionaryError::Truncated(0))?;
        let mut tuples = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let offset = buf.len() - rest.len();
            if rest.len() < TUPLE_HEADER_LEN {
                return Err(DictionaryError::Truncated(buf.len()));
            }
            let key = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            let kind = rest[4];
            let len = u16::from_le_bytes([rest[5], rest[6]]) as usize;
            rest = &rest[TUPLE_HEADER_LEN..];

            if rest.len() < len {
                return Err(DictionaryError::Truncated(buf.len()));
            }
            let (data, tail) = rest.split_at(len);
            rest = tail;

            let value = decode_value(kind, data)?;
            tracing::trace!(key, offset, len, "decoded tuple");
            tuples.push(Tuple { key, value });
        }

        Ok(Self { tuples })
    }
}

fn decode_value(kind: u8, data: &[u8]) -> Result<TupleValue, DictionaryError> {
    match kind {
        TYPE_BYTES => Ok(TupleValue::Bytes(data.to_vec())),
        TYPE_CSTRING => {
            let (&last, text) = data.split_last().ok_or(DictionaryError::BadCString)?;
            if last != 0 {
                return Err(DictionaryError::BadCString);
            }
            let text = std::str::from_utf8(text).map_err(|_| DictionaryError::BadCString)?;
            Ok(TupleValue::CString(text.to_string()))
        }
        TYPE_UINT => match *data {
            [a] => Ok(TupleValue::Uint(a.into())),
            [a, b] => Ok(TupleValue::Uint(u16::from_le_bytes([a, b]).into())),
            [a, b, c, d] => Ok(TupleValue::Uint(u32::from_le_bytes([a, b, c, d]))),
            _ => Err(DictionaryError::BadIntegerWidth(data.len())),
        },
        TYPE_INT => match *data {
            [a] => Ok(TupleValue::Int((a as i8).into())),
            [a, b] => Ok(TupleValue::Int(i16::from_le_bytes([a, b]).into())),
            [a, b, c, d] => Ok(TupleValue::Int(i32::from_le_bytes([a, b, c, d]))),
            _ => Err(DictionaryError::BadIntegerWidth(data.len())),
        },
        other => Err(DictionaryError::UnknownType(other)),
    }
}

impl From<&WeatherMessage> for Dictionary {
    fn from(msg: &WeatherMessage) -> Self {
        let mut dict = Dictionary::new();
        dict.push(TEMPERATURE_KEY, TupleValue::CString(msg.temperature.clone()))
            .push(CITY_KEY, TupleValue::CString(msg.city.clone()));
        dict
    }
}
