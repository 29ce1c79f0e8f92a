//! Low-level tokenizer for the ASCII half of a NIST-ITL record.
//!
//! Splits a single record's bytes on `FS`/`GS`/`RS`/`US` and reports
//! the resulting structure through a [`RecordSink`], without knowing
//! anything about `Field`, `SubField` or how values should be typed.
//! [`crate::message`] supplies the sink that actually builds records.

use crate::error;

/// Receives the events produced by [`tokenize_record`].
///
/// Values are handed over as raw latin-1 bytes; callers decode and
/// type them (e.g. numeric `IDC`/`LEN`) as appropriate.
pub(crate) trait RecordSink {
    /// A complete record (terminated by `FS`) has been parsed.
    fn push_record(&mut self) -> error::Result<()>;

    /// A field was found. `value` is `Some` for a plain scalar field,
    /// or `None` when the field's subfields were reported individually
    /// through [`RecordSink::push_subfield`]/[`RecordSink::push_value`]
    /// and should now be attached to the field.
    fn push_field(&mut self, record_type: u16, tag: u16, value: Option<&[u8]>) -> error::Result<()>;

    /// A subfield was found. `value` is `Some` for a scalar subfield,
    /// or `None` when its items were reported individually through
    /// [`RecordSink::push_value`] and should now be collected.
    fn push_subfield(&mut self, value: Option<&[u8]>) -> error::Result<()>;

    /// An item of the current subfield.
    fn push_value(&mut self, value: &[u8]) -> error::Result<()>;
}

/// Splits the leading `"record.tag:"` prefix off `field`, returning the
/// parsed numbers and the remaining bytes.
fn split_tag(field: &[u8]) -> error::Result<(u16, u16, &[u8])> {
    let colon = field
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| error::bad_record("invalid record data"))?;
    let prefix = std::str::from_utf8(&field[..colon])
        .map_err(|_| error::bad_record("invalid record data"))?;
    let mut parts = prefix.splitn(2, '.');
    let record = parts.next().unwrap_or("");
    let tag = parts.next().unwrap_or("");
    if record.is_empty() || tag.is_empty() {
        return Err(error::bad_record("invalid record data"));
    }
    let record_type = record
        .parse()
        .map_err(|_| error::bad_record("invalid record data"))?;
    let tag = tag
        .parse()
        .map_err(|_| error::bad_record("invalid record data"))?;
    Ok((record_type, tag, &field[colon + 1..]))
}

/// Tokenizes `buffer` (a single record, optionally `FS`-terminated)
/// and reports its structure through `sink`.
///
/// A trailing `FS` is dropped; an empty buffer (or one that only
/// contained the `FS`) produces no events at all, mirroring the
/// original parser's `break` on an empty chunk.
pub(crate) fn tokenize_record(
    buffer: &[u8],
    sink: &mut impl RecordSink,
) -> error::Result<()> {
    let buffer = match buffer.last() {
        Some(&b) if b == crate::FS => &buffer[..buffer.len() - 1],
        _ => buffer,
    };

    for rec in buffer.split(|&b| b == crate::FS) {
        if rec.is_empty() {
            break;
        }

        for field in rec.split(|&b| b == crate::GS) {
            let (record_type, tag, content) = split_tag(field)?;
            let subfields: Vec<&[u8]> = content.split(|&b| b == crate::RS).collect();
            let mut handled_as_scalar = false;

            for sf in &subfields {
                let items: Vec<&[u8]> = sf.split(|&b| b == crate::US).collect();
                if items.len() == 1 && subfields.len() == 1 {
                    sink.push_field(record_type, tag, Some(items[0]))?;
                    handled_as_scalar = true;
                    break;
                }
                if items.len() != 1 {
                    for item in &items {
                        sink.push_value(item)?;
                    }
                    sink.push_subfield(None)?;
                } else {
                    sink.push_subfield(Some(items[0]))?;
                }
            }

            if !handled_as_scalar {
                sink.push_field(record_type, tag, None)?;
            }
        }

        sink.push_record()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl RecordSink for Recorder {
        fn push_record(&mut self) -> error::Result<()> {
            self.0.push("R".into());
            Ok(())
        }
        fn push_field(&mut self, rt: u16, tag: u16, value: Option<&[u8]>) -> error::Result<()> {
            match value {
                Some(v) => self.0.push(format!("F{rt}.{tag}={}", String::from_utf8_lossy(v))),
                None => self.0.push(format!("F{rt}.{tag}")),
            }
            Ok(())
        }
        fn push_subfield(&mut self, value: Option<&[u8]>) -> error::Result<()> {
            match value {
                Some(v) => self.0.push(format!("S={}", String::from_utf8_lossy(v))),
                None => self.0.push("S".into()),
            }
            Ok(())
        }
        fn push_value(&mut self, value: &[u8]) -> error::Result<()> {
            self.0.push(format!("V={}", String::from_utf8_lossy(value)));
            Ok(())
        }
    }

    #[test]
    fn scalar_field_is_reported_directly() {
        let mut rec = Recorder::default();
        tokenize_record(b"2.001:0\x1d2.002:3\x1c", &mut rec).unwrap();
        assert_eq!(rec.0, vec!["F2.1=0", "F2.2=3", "R"]);
    }

    #[test]
    fn subfields_and_items_are_reported_then_finalized() {
        let mut rec = Recorder::default();
        tokenize_record(b"2.012:a\x1eb\x1c", &mut rec).unwrap();
        assert_eq!(rec.0, vec!["S=a", "S=b", "F2.12", "R"]);
    }

    #[test]
    fn items_accumulate_then_close_the_subfield() {
        let mut rec = Recorder::default();
        tokenize_record(b"1.003:1\x1f0\x1c", &mut rec).unwrap();
        assert_eq!(rec.0, vec!["V=1", "V=0", "S", "F1.3", "R"]);
    }

    #[test]
    fn malformed_tag_is_rejected() {
        let mut rec = Recorder::default();
        let err = tokenize_record(b"not-a-tag\x1c", &mut rec).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadRecord);
    }
}
