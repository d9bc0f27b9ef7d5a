//! Error types for values and schema lookups.

use thiserror::Error;

use crate::encoding::EncodingType;
use crate::identity::ControlIdentity;

/// Errors raised by ranged values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("value too small: {value} < {minimum}")]
    TooSmall { value: String, minimum: String },

    #[error("value too large: {value} > {maximum}")]
    TooLarge { value: String, maximum: String },

    #[error("value {value} is neither {minimum} nor {maximum}")]
    NotAnEndpoint {
        value: String,
        minimum: String,
        maximum: String,
    },

    #[error("string of {len} bytes does not fit {encoding} (max {capacity})")]
    TooLong {
        len: usize,
        capacity: usize,
        encoding: EncodingType,
    },

    #[error("maximum value {maximum} too large for {encoding} encoding")]
    MaxTooLargeForEncoding {
        maximum: String,
        encoding: EncodingType,
    },

    #[error("minimum value {minimum} too small for {encoding} encoding")]
    MinTooSmallForEncoding {
        minimum: String,
        encoding: EncodingType,
    },

    #[error("cannot parse '{input}' as {expected}")]
    Parse { input: String, expected: &'static str },

    #[error("invalid type for {0}")]
    InvalidType(&'static str),

    #[error("invalid range: {0}")]
    InvalidRange(String),
}

impl ValueError {
    /// A set was rejected because the value lies outside the declared range.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            ValueError::TooSmall { .. }
                | ValueError::TooLarge { .. }
                | ValueError::NotAnEndpoint { .. }
                | ValueError::TooLong { .. }
        )
    }

    /// The declared range cannot be represented in the wire encoding.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            ValueError::MaxTooLargeForEncoding { .. } | ValueError::MinTooSmallForEncoding { .. }
        )
    }
}

/// Errors raised while resolving identities and addresses in a schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("no such descriptor: type {descriptor_type:#06x} index {descriptor_index}")]
    NoSuchDescriptor {
        descriptor_type: u16,
        descriptor_index: u16,
    },

    #[error("no such control identity: {0}")]
    NoSuchControlIdentity(ControlIdentity),

    #[error("no such descriptor for address: {0}")]
    NoSuchDescriptorForAddress(String),

    #[error("read only: {0}")]
    ReadOnly(ControlIdentity),

    #[error(transparent)]
    Value(#[from] ValueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let too_small = ValueError::TooSmall {
            value: "-100".into(),
            minimum: "-90".into(),
        };
        assert!(too_small.is_range_error());
        assert!(!too_small.is_domain_error());

        let domain = ValueError::MaxTooLargeForEncoding {
            maximum: "300".into(),
            encoding: EncodingType::Int8,
        };
        assert!(domain.is_domain_error());
        assert_eq!(
            domain.to_string(),
            "maximum value 300 too large for int8 encoding"
        );
    }

    #[test]
    fn test_schema_error_messages() {
        let err = SchemaError::NoSuchDescriptor {
            descriptor_type: 0x1a,
            descriptor_index: 3,
        };
        assert_eq!(err.to_string(), "no such descriptor: type 0x001a index 3");

        let err = SchemaError::NoSuchDescriptorForAddress("/input/9/gain".into());
        assert!(err.to_string().contains("/input/9/gain"));
    }
}
