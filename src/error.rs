use thiserror::Error;

/// The tag identifying what went wrong while building or parsing a
/// [`crate::Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRecord,
    BadTagName,
    BadTagFormat,
    BadRecordNumber,
    BadContent,
    CannotAddType1,
    CannotDeleteType1,
    RecordNotFound,
    RecordNotTerminated,
    NistTooShort,
    NistTooLong,
    BadTagDuplicate,
    BadAliasDuplicate,
    UnknownAttribute,
    BadFieldValue,
    BadSubfieldValue,
}

/// An error raised while building, serializing or parsing a NIST-ITL
/// message.
///
/// During parsing, [`ErrorKind::NistTooShort`] and
/// [`ErrorKind::NistTooLong`] are detected early but not raised right
/// away: the parser keeps going on a clamped or extended slice, and if
/// a stricter error surfaces from that slice, the deferred error wraps
/// it as its `source` (see [`Error::deferred`]).
#[derive(Error, Debug)]
#[error("{kind:?}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    source: Option<Box<Error>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `self` (expected to be a deferred `NIST_TOO_SHORT` /
    /// `NIST_TOO_LONG`) around `inner`, so both are reported together.
    pub fn deferred(self, inner: Error) -> Error {
        Error {
            source: Some(Box::new(inner)),
            ..self
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! err_ctor {
    ($name:ident, $kind:ident) => {
        pub(crate) fn $name(message: impl Into<String>) -> Error {
            Error::new(ErrorKind::$kind, message)
        }
    };
}

err_ctor!(bad_record, BadRecord);
err_ctor!(bad_tag_name, BadTagName);
err_ctor!(bad_tag_format, BadTagFormat);
err_ctor!(bad_record_number, BadRecordNumber);
err_ctor!(bad_content, BadContent);
err_ctor!(cannot_add_type1, CannotAddType1);
err_ctor!(cannot_delete_type1, CannotDeleteType1);
err_ctor!(record_not_found, RecordNotFound);
err_ctor!(record_not_terminated, RecordNotTerminated);
err_ctor!(nist_too_short, NistTooShort);
err_ctor!(nist_too_long, NistTooLong);
err_ctor!(bad_tag_duplicate, BadTagDuplicate);
err_ctor!(bad_alias_duplicate, BadAliasDuplicate);
err_ctor!(unknown_attribute, UnknownAttribute);
err_ctor!(bad_field_value, BadFieldValue);
err_ctor!(bad_subfield_value, BadSubfieldValue);
