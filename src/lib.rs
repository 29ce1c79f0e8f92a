//! Parsing and generation of `NIST-ITL` (NIST Special Publication
//! 500-290) biometric transaction messages.
//!
//! A message is an ordered list of records. Most record types (1, 2,
//! 9-22, 98, 99) are ASCII: fields separated by `GS`, subfields by
//! `RS`, items by `US`, the whole record terminated by `FS`. A
//! handful of types (3-8) are fully binary: a 4-byte big-endian
//! length, a 1-byte `IDC`, then opaque payload, with no separators at
//! all. Because binary records carry no self-describing type tag,
//! their type can only be recovered from record 1's `CNT` field while
//! parsing.
//!
//! ```
//! use nist_itl::Message;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut msg = Message::new()?;
//! msg.set_tot("EXAMPLE")?;
//!
//! let bytes = msg.to_nist()?;
//!
//! let mut reparsed = Message::new()?;
//! reparsed.parse(&bytes)?;
//! assert_eq!(reparsed.tot().unwrap().as_str(), Some("EXAMPLE"));
//! # Ok(())
//! # }
//! ```

mod alias;
mod error;
mod field;
mod mask;
mod message;
mod record;
mod subfield;
mod tokenizer;
mod value;

pub use error::{Error, ErrorKind, Result};
pub use field::{BinaryField, Field};
pub use mask::Mask;
pub use message::{Message, Record};
pub use record::{AsciiRecord, BinaryRecord, Entry, PackField};
pub use subfield::SubField;
pub use value::Value;

/// Record terminator.
pub(crate) const FS: u8 = 0x1c;
/// Field separator.
pub(crate) const GS: u8 = 0x1d;
/// Subfield separator.
pub(crate) const RS: u8 = 0x1e;
/// Item separator.
pub(crate) const US: u8 = 0x1f;
