use std::error;
use std::fmt;

/// Detailed errors raised when parsing a signature fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureError {
    /// A byte which is not a known type code.
    UnknownTypeCode(u8),
    /// The signature is longer than 255 bytes.
    SignatureTooLong,
    /// The signature ended where a complete type was expected.
    UnexpectedEnd,
    /// The signature does not contain exactly one complete type.
    NotSingleCompleteType,
    MissingArrayElementType,
    StructEndedButNotStarted,
    DictEndedButNotStarted,
    StructStartedButNotEnded,
    DictStartedButNotEnded,
    StructHasNoFields,
    DictKeyMustBeBasicType,
    DictEntryHasNoFields,
    DictEntryHasOnlyOneField,
    DictEntryNotInsideArray,
    DictEntryHasTooManyFields,
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignatureError::UnknownTypeCode(code) => {
                write!(f, "Unknown type code: {:?}", code as char)
            }
            SignatureError::SignatureTooLong => {
                write!(f, "Signature too long")
            }
            SignatureError::UnexpectedEnd => {
                write!(f, "Signature ended where a type was expected")
            }
            SignatureError::NotSingleCompleteType => {
                write!(f, "Signature is not a single complete type")
            }
            SignatureError::MissingArrayElementType => {
                write!(f, "Missing array element type")
            }
            SignatureError::StructEndedButNotStarted => {
                write!(f, "Struct ended but not started")
            }
            SignatureError::DictEndedButNotStarted => {
                write!(f, "Dict ended but not started")
            }
            SignatureError::StructStartedButNotEnded => {
                write!(f, "Struct started but not ended")
            }
            SignatureError::DictStartedButNotEnded => {
                write!(f, "Dict started but not ended")
            }
            SignatureError::StructHasNoFields => {
                write!(f, "Struct has no fields")
            }
            SignatureError::DictKeyMustBeBasicType => {
                write!(f, "Dict key must be basic type")
            }
            SignatureError::DictEntryHasNoFields => {
                write!(f, "Dict entry has no fields")
            }
            SignatureError::DictEntryHasOnlyOneField => {
                write!(f, "Dict entry has only one field")
            }
            SignatureError::DictEntryNotInsideArray => {
                write!(f, "Dict entry not inside array")
            }
            SignatureError::DictEntryHasTooManyFields => {
                write!(f, "Dict entry has too many fields")
            }
            SignatureError::ExceededMaximumArrayRecursion => {
                write!(f, "Exceeded maximum array recursion")
            }
            SignatureError::ExceededMaximumStructRecursion => {
                write!(f, "Exceeded maximum struct recursion")
            }
        }
    }
}

impl error::Error for SignatureError {}
