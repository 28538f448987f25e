//! Codec errors
//!
//! A string that does not carry the size-channel prefix is not an error: it is
//! simply not addressed to this codec. Everything here describes a string that
//! claimed to be ours and turned out to be unusable.

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A positional size-channel field is absent.
    ///
    /// Caused by:
    /// - Truncated message from an old or broken frame-side agent
    /// - A bare trigger string (`[iFrameSizer]reset`) echoed back to the host
    MissingField {
        /// Field name in the positional tuple
        field: &'static str,
    },

    /// A numeric field did not parse.
    InvalidNumber {
        /// Field name in the positional tuple
        field: &'static str,
        /// Raw field text
        value: String,
    },

    /// A boolean flag was neither `true` nor `false`.
    InvalidFlag {
        /// Field name in the positional tuple
        field: &'static str,
        /// Raw field text
        value: String,
    },

    /// The init handshake did not have the expected number of fields.
    FieldCount {
        /// Number of colon-separated fields required
        expected: usize,
        /// Number of fields found
        actual: usize,
    },

    /// Event-channel payload was not a JSON envelope.
    ///
    /// Caused by:
    /// - Non-JSON `postMessage` traffic from unrelated scripts on the page
    /// - JSON without a string `name`
    Json {
        /// serde_json error message
        reason: String,
    },
}

impl CodecError {
    /// Create a MissingField error
    #[must_use]
    pub const fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Create an InvalidNumber error
    pub fn invalid_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }

    /// Create an InvalidFlag error
    pub fn invalid_flag(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFlag {
            field,
            value: value.into(),
        }
    }

    /// Create a Json error
    pub fn json(reason: impl Into<String>) -> Self {
        Self::Json {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "missing field '{field}'"),
            Self::InvalidNumber { field, value } => {
                write!(f, "field '{field}' is not a number: '{value}'")
            }
            Self::InvalidFlag { field, value } => {
                write!(f, "field '{field}' is not a boolean flag: '{value}'")
            }
            Self::FieldCount { expected, actual } => {
                write!(f, "expected {expected} fields, found {actual}")
            }
            Self::Json { reason } => write!(f, "invalid JSON envelope: {reason}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for framehost_core::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Json { reason } => Self::decode(reason),
            other => Self::malformed_message(other.to_string()),
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use framehost_core::ErrorKind;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            CodecError::missing_field("type").to_string(),
            "missing field 'type'"
        );
        assert_eq!(
            CodecError::invalid_number("height", "tall").to_string(),
            "field 'height' is not a number: 'tall'"
        );
        assert_eq!(
            CodecError::FieldCount {
                expected: 13,
                actual: 4
            }
            .to_string(),
            "expected 13 fields, found 4"
        );
    }

    #[test]
    fn test_json_errors_become_decode_kind() {
        let err: framehost_core::Error = CodecError::json("expected value").into();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_size_errors_become_protocol_kind() {
        let err: framehost_core::Error = CodecError::missing_field("width").into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
