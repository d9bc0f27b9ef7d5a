//! Storage and wire encodings for ranged values.

use std::fmt;

/// The closed set of representations a control value can have, either in
/// memory (storage type) or on the wire (encoding type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EncodingType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    /// Fixed 406 byte control string.
    String406,
    /// Fixed 64 byte descriptor name string.
    String64,
}

impl EncodingType {
    pub fn is_integer(&self) -> bool {
        !self.is_float() && !self.is_string()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, EncodingType::Float | EncodingType::Double)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, EncodingType::String406 | EncodingType::String64)
    }

    /// Byte capacity of the string encodings.
    pub fn max_string_len(&self) -> Option<usize> {
        match self {
            EncodingType::String406 => Some(406),
            EncodingType::String64 => Some(64),
            _ => None,
        }
    }

    /// Inclusive integer bounds of the integer encodings.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        let bounds = match self {
            EncodingType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            EncodingType::UInt8 => (0, u8::MAX as i128),
            EncodingType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            EncodingType::UInt16 => (0, u16::MAX as i128),
            EncodingType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            EncodingType::UInt32 => (0, u32::MAX as i128),
            EncodingType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            EncodingType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }

    /// Bounds of the numeric encodings as floating point, used for range checks
    /// that happen before rounding.
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        match self {
            EncodingType::Float => Some((f32::MIN as f64, f32::MAX as f64)),
            EncodingType::Double => Some((f64::MIN, f64::MAX)),
            _ => self
                .integer_bounds()
                .map(|(lo, hi)| (lo as f64, hi as f64)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingType::Int8 => "int8",
            EncodingType::UInt8 => "uint8",
            EncodingType::Int16 => "int16",
            EncodingType::UInt16 => "uint16",
            EncodingType::Int32 => "int32",
            EncodingType::UInt32 => "uint32",
            EncodingType::Int64 => "int64",
            EncodingType::UInt64 => "uint64",
            EncodingType::Float => "float",
            EncodingType::Double => "double",
            EncodingType::String406 => "string406",
            EncodingType::String64 => "string64",
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in its wire representation.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl EncodedValue {
    pub fn encoding_type(&self) -> Option<EncodingType> {
        let t = match self {
            EncodedValue::Int8(_) => EncodingType::Int8,
            EncodedValue::UInt8(_) => EncodingType::UInt8,
            EncodedValue::Int16(_) => EncodingType::Int16,
            EncodedValue::UInt16(_) => EncodingType::UInt16,
            EncodedValue::Int32(_) => EncodingType::Int32,
            EncodedValue::UInt32(_) => EncodingType::UInt32,
            EncodedValue::Int64(_) => EncodingType::Int64,
            EncodedValue::UInt64(_) => EncodingType::UInt64,
            EncodedValue::Float(_) => EncodingType::Float,
            EncodedValue::Double(_) => EncodingType::Double,
            // Text carries no capacity of its own
            EncodedValue::Text(_) => return None,
        };
        Some(t)
    }

    /// Integer payload widened to i128, `None` for float and text payloads.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            EncodedValue::Int8(v) => Some(v as i128),
            EncodedValue::UInt8(v) => Some(v as i128),
            EncodedValue::Int16(v) => Some(v as i128),
            EncodedValue::UInt16(v) => Some(v as i128),
            EncodedValue::Int32(v) => Some(v as i128),
            EncodedValue::UInt32(v) => Some(v as i128),
            EncodedValue::Int64(v) => Some(v as i128),
            EncodedValue::UInt64(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Numeric payload as f64, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            EncodedValue::Float(v) => Some(v as f64),
            EncodedValue::Double(v) => Some(v),
            EncodedValue::Text(_) => None,
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    /// Build the wire value of type `encoding` from an integer already known to
    /// fit its bounds.
    pub(crate) fn from_integer(encoding: EncodingType, v: i128) -> Option<Self> {
        let e = match encoding {
            EncodingType::Int8 => EncodedValue::Int8(i8::try_from(v).ok()?),
            EncodingType::UInt8 => EncodedValue::UInt8(u8::try_from(v).ok()?),
            EncodingType::Int16 => EncodedValue::Int16(i16::try_from(v).ok()?),
            EncodingType::UInt16 => EncodedValue::UInt16(u16::try_from(v).ok()?),
            EncodingType::Int32 => EncodedValue::Int32(i32::try_from(v).ok()?),
            EncodingType::UInt32 => EncodedValue::UInt32(u32::try_from(v).ok()?),
            EncodingType::Int64 => EncodedValue::Int64(i64::try_from(v).ok()?),
            EncodingType::UInt64 => EncodedValue::UInt64(u64::try_from(v).ok()?),
            EncodingType::Float => EncodedValue::Float(v as f32),
            EncodingType::Double => EncodedValue::Double(v as f64),
            EncodingType::String406 | EncodingType::String64 => return None,
        };
        Some(e)
    }
}

impl fmt::Display for EncodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodedValue::Int8(v) => write!(f, "{}", v),
            EncodedValue::UInt8(v) => write!(f, "{}", v),
            EncodedValue::Int16(v) => write!(f, "{}", v),
            EncodedValue::UInt16(v) => write!(f, "{}", v),
            EncodedValue::Int32(v) => write!(f, "{}", v),
            EncodedValue::UInt32(v) => write!(f, "{}", v),
            EncodedValue::Int64(v) => write!(f, "{}", v),
            EncodedValue::UInt64(v) => write!(f, "{}", v),
            EncodedValue::Float(v) => write!(f, "{}", v),
            EncodedValue::Double(v) => write!(f, "{}", v),
            EncodedValue::Text(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(EncodingType::Int32.is_integer());
        assert!(!EncodingType::Float.is_integer());
        assert!(EncodingType::Double.is_float());
        assert!(EncodingType::String64.is_string());
        assert_eq!(EncodingType::String406.max_string_len(), Some(406));
        assert_eq!(EncodingType::UInt8.max_string_len(), None);
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(EncodingType::Int8.integer_bounds(), Some((-128, 127)));
        assert_eq!(EncodingType::UInt16.integer_bounds(), Some((0, 65535)));
        assert_eq!(EncodingType::Float.integer_bounds(), None);
    }

    #[test]
    fn test_from_integer_checks_width() {
        assert_eq!(
            EncodedValue::from_integer(EncodingType::Int8, -100),
            Some(EncodedValue::Int8(-100))
        );
        assert_eq!(EncodedValue::from_integer(EncodingType::Int8, 200), None);
        assert_eq!(EncodedValue::from_integer(EncodingType::String64, 1), None);
    }

    #[test]
    fn test_encoded_accessors() {
        assert_eq!(EncodedValue::Int32(-900).as_i128(), Some(-900));
        assert_eq!(EncodedValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(EncodedValue::Text("x".into()).as_f64(), None);
        assert_eq!(EncodedValue::UInt8(255).to_string(), "255");
    }
}
