//! The top-level [`Message`]: a list of records, parsed from or
//! serialized to a complete NIST-ITL transaction.

use std::io;

use bstr::ByteSlice;

use crate::error::{self, Error};
use crate::field::Field;
use crate::mask::Mask;
use crate::record::{AsciiRecord, BinaryRecord};
use crate::subfield::SubField;
use crate::tokenizer::{tokenize_record, RecordSink};

/// A single record of a [`Message`]: either an ASCII record (types 1,
/// 2, 9-22, 98, 99) or a fully binary one (types 3-8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Ascii(AsciiRecord),
    Binary(BinaryRecord),
}

impl Record {
    pub fn record_type(&self) -> u16 {
        match self {
            Record::Ascii(r) => r.record_type(),
            Record::Binary(r) => r.record_type(),
        }
    }

    pub fn idc(&self) -> i64 {
        match self {
            Record::Ascii(r) => r.idc(),
            Record::Binary(r) => r.idc(),
        }
    }

    pub fn as_ascii(&self) -> Option<&AsciiRecord> {
        match self {
            Record::Ascii(r) => Some(r),
            Record::Binary(_) => None,
        }
    }

    pub fn as_ascii_mut(&mut self) -> Option<&mut AsciiRecord> {
        match self {
            Record::Ascii(r) => Some(r),
            Record::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryRecord> {
        match self {
            Record::Binary(r) => Some(r),
            Record::Ascii(_) => None,
        }
    }

    pub(crate) fn to_nist(&mut self) -> io::Result<Vec<u8>> {
        match self {
            Record::Ascii(r) => r.to_nist(),
            Record::Binary(r) => Ok(r.to_nist()),
        }
    }
}

fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Builds a single [`AsciiRecord`] from the events reported by
/// [`tokenize_record`].
struct Builder<'a> {
    record: &'a mut AsciiRecord,
    subfields: Vec<SubField>,
    values: Vec<String>,
    closed: bool,
}

impl<'a> Builder<'a> {
    fn new(record: &'a mut AsciiRecord) -> Self {
        Builder {
            record,
            subfields: Vec::new(),
            values: Vec::new(),
            closed: false,
        }
    }
}

impl RecordSink for Builder<'_> {
    fn push_record(&mut self) -> error::Result<()> {
        self.closed = true;
        Ok(())
    }

    fn push_field(
        &mut self,
        record_type: u16,
        tag: u16,
        value: Option<&[u8]>,
    ) -> error::Result<()> {
        if record_type != self.record.record_type() {
            return Err(error::bad_record_number(format!(
                "illegal record number in tag name {record_type}.{tag}"
            )));
        }

        let field = self.record.ensure_field(tag, Mask::FSI);
        field.reset();

        match value {
            Some(v) if !v.is_empty() => {
                let text = latin1_decode(v);
                if tag == 1 || (record_type != 1 && tag == 2) {
                    let n: i64 = text.parse().map_err(|_| {
                        error::bad_tag_format(format!(
                            "illegal value for tag {record_type}.{tag}: {text:?}"
                        ))
                    })?;
                    field.set_value(n)?;
                } else {
                    field.set_value(text)?;
                }
            }
            _ => {
                let subfields = std::mem::take(&mut self.subfields);
                field.add_subfields(subfields)?;
            }
        }

        self.subfields.clear();
        self.values.clear();
        Ok(())
    }

    fn push_subfield(&mut self, value: Option<&[u8]>) -> error::Result<()> {
        let mut sf = SubField::new(Mask::SI);
        match value {
            Some(v) if !v.is_empty() => sf.set_value(latin1_decode(v))?,
            _ => {
                let values = std::mem::take(&mut self.values);
                sf.add_values(values)?;
            }
        }
        self.subfields.push(sf);
        self.values.clear();
        Ok(())
    }

    fn push_value(&mut self, value: &[u8]) -> error::Result<()> {
        self.values.push(latin1_decode(value));
        Ok(())
    }
}

fn parse_into(record: &mut AsciiRecord, buffer: &[u8]) -> error::Result<bool> {
    let mut builder = Builder::new(record);
    tokenize_record(buffer, &mut builder)?;
    Ok(builder.closed)
}

/// Returns `true` if `prefix` looks like the start of `"record.tag:"`
/// (digits, `.`, digits, `:`), without requiring anything after it.
fn looks_like_tag_prefix(bytes: &[u8]) -> bool {
    let mut i = 0;
    let n = bytes.len();
    while i < n && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 || i >= n || bytes[i] != b'.' {
        return false;
    }
    i += 1;
    let start = i;
    while i < n && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == start || i >= n || bytes[i] != b':' {
        return false;
    }
    true
}

/// Parses the leading `"record.tag:value"` header of an ASCII record,
/// where `value` is itself all-digits (the record's declared `LEN`).
fn parse_len_header(bytes: &[u8]) -> Option<(u16, u16, usize)> {
    let mut i = 0;
    let n = bytes.len();
    let rt_start = i;
    while i < n && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == rt_start || i >= n || bytes[i] != b'.' {
        return None;
    }
    let record_type: u16 = std::str::from_utf8(&bytes[rt_start..i]).ok()?.parse().ok()?;
    i += 1;
    let tag_start = i;
    while i < n && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == tag_start || i >= n || bytes[i] != b':' {
        return None;
    }
    let tag: u16 = std::str::from_utf8(&bytes[tag_start..i]).ok()?.parse().ok()?;
    i += 1;
    let len_start = i;
    while i < n && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == len_start {
        return None;
    }
    let length: usize = std::str::from_utf8(&bytes[len_start..i]).ok()?.parse().ok()?;
    Some((record_type, tag, length))
}

/// The main entry point: an ordered list of NIST-ITL records.
///
/// A fresh [`Message`] contains a single type-1 record with the
/// mandatory header fields pre-populated. Records are added with
/// [`Message::push`], read back with [`Message::get`]/[`Message::iter`],
/// and the whole thing serialized with [`Message::to_nist`] or parsed
/// back with [`Message::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    records: Vec<Record>,
}

impl Message {
    pub fn new() -> error::Result<Self> {
        Message::with_options(true, true)
    }

    pub fn with_options(autocreate: bool, autosort: bool) -> error::Result<Self> {
        let r1 = AsciiRecord::with_options(1, autocreate, autosort)?;
        Ok(Message {
            records: vec![Record::Ascii(r1)],
        })
    }

    /// Resets this message to a single blank type-1 record.
    pub fn reset(&mut self, autocreate: bool, autosort: bool) -> error::Result<()> {
        let r1 = AsciiRecord::with_options(1, autocreate, autosort)?;
        self.records = vec![Record::Ascii(r1)];
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn iter_type(&self, record_type: u16) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.record_type() == record_type)
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    /// Finds the record of `record_type` whose `IDC` equals `idc`.
    pub fn get_by_type_idc(&self, record_type: u16, idc: i64) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.record_type() == record_type && r.idc() == idc)
    }

    /// Appends `record`, rejecting a second type-1 record.
    pub fn push(&mut self, record: Record) -> error::Result<()> {
        if record.record_type() == 1 && !self.records.is_empty() {
            return Err(error::cannot_add_type1(
                "cannot add a type 1 record: it must be the first record",
            ));
        }
        self.records.push(record);
        Ok(())
    }

    /// Removes the record at `index`. Index 0 (the type-1 record) can
    /// never be removed.
    pub fn remove(&mut self, index: usize) -> error::Result<()> {
        if index == 0 {
            return Err(error::cannot_delete_type1(
                "cannot delete the type 1 record",
            ));
        }
        self.records.remove(index);
        Ok(())
    }

    /// Removes the record of `record_type` whose `IDC` equals `idc`.
    pub fn remove_by_type_idc(&mut self, record_type: u16, idc: i64) -> error::Result<()> {
        if record_type == 1 {
            return Err(error::cannot_delete_type1(
                "cannot delete the type 1 record",
            ));
        }
        if let Some(pos) = self
            .records
            .iter()
            .position(|r| r.record_type() == record_type && r.idc() == idc)
        {
            self.records.remove(pos);
        }
        Ok(())
    }

    fn record1_mut(&mut self) -> &mut AsciiRecord {
        self.records[0]
            .as_ascii_mut()
            .expect("record 0 is always the type-1 ASCII record")
    }

    fn record1(&self) -> &AsciiRecord {
        self.records[0]
            .as_ascii()
            .expect("record 0 is always the type-1 ASCII record")
    }

    pub fn tot(&self) -> Option<&crate::value::Value> {
        self.record1().field(4).and_then(Field::value)
    }

    pub fn set_tot(&mut self, value: impl Into<crate::value::Value>) -> error::Result<()> {
        self.record1_mut()
            .ensure_field(4, Mask::FSI)
            .set_value(value)
    }

    /// Rebuilds and returns the `CNT` field of the type-1 record: one
    /// subfield per record, each holding that record's `(type, IDC)`
    /// pair (the first subfield instead holding `(1, record_count-1)`).
    pub fn cnt(&mut self) -> &Field {
        let pairs: Vec<(i64, i64)> = std::iter::once((1i64, self.records.len() as i64 - 1))
            .chain(self.records[1..].iter().map(|r| (r.record_type() as i64, r.idc())))
            .collect();

        let record1 = self.record1_mut();
        let field = record1.ensure_field(3, Mask::FSI);
        field.reset();
        let subfields: error::Result<Vec<SubField>> = pairs
            .into_iter()
            .map(|(a, b)| {
                let mut sf = SubField::new(Mask::SI);
                sf.add_values([a, b])?;
                Ok(sf)
            })
            .collect();
        field
            .add_subfields(subfields.expect("CNT subfields always accept two int items"))
            .expect("field 1.003 always accepts subfields");
        record1.field(3).expect("just inserted")
    }

    /// Serializes the whole message: every record's `NIST` bytes,
    /// concatenated, after recomputing the `CNT` field.
    pub fn to_nist(&mut self) -> io::Result<Vec<u8>> {
        self.cnt();
        let mut out = Vec::new();
        for record in &mut self.records {
            out.extend_from_slice(&record.to_nist()?);
        }
        Ok(out)
    }

    /// Parses `buffer` as a complete NIST-ITL transaction.
    ///
    /// `NIST_TOO_SHORT`/`NIST_TOO_LONG` are detected as soon as a
    /// record's declared length doesn't match what's actually in the
    /// buffer, but parsing continues on a clamped or extended slice so
    /// a more specific error can still surface; if one does, it is
    /// reported as the `source` of the deferred `NIST_TOO_SHORT`/
    /// `NIST_TOO_LONG` error (see [`Error::deferred`]).
    pub fn parse(&mut self, buffer: &[u8]) -> error::Result<()> {
        self.reset(false, true)?;

        let mut offset = 0usize;
        while offset + 4 < buffer.len() {
            if let Some((record_type, _len_tag, declared_len)) =
                parse_len_header(&buffer[offset..])
            {
                self.parse_ascii_record(buffer, offset, record_type, declared_len)
                    .map(|consumed| offset += consumed)?;
            } else {
                offset += self.parse_binary_record(buffer, offset)?;
            }
        }

        if offset < buffer.len() {
            return Err(error::nist_too_long("NIST buffer too long (extra bytes)"));
        }

        self.check_cnt()
    }

    fn parse_ascii_record(
        &mut self,
        buffer: &[u8],
        offset: usize,
        record_type: u16,
        declared_len: usize,
    ) -> error::Result<usize> {
        let tag_for_data = crate::alias::tag_for_alias(record_type, "DATA");

        let mut future_exc: Option<Error> = None;
        let mut length = declared_len;

        if offset + length > buffer.len() {
            length = buffer.len() - offset;
            future_exc = Some(error::nist_too_short(format!(
                "NIST buffer too short (missing bytes) when parsing record {record_type}"
            )));
        } else {
            let pos_data = tag_for_data.and_then(|tag| {
                let needle = format!("{tag}:");
                buffer[offset..].find(needle.as_bytes()).map(|p| p + offset)
            });
            let pos_fs = buffer[offset..].find_byte(crate::FS).map(|p| p + offset);
            let candidates: Vec<usize> = [pos_fs, pos_data].into_iter().flatten().collect();
            if let Some(&nearest) = candidates.iter().min() {
                let new_length = nearest - offset;
                if new_length > length {
                    future_exc = Some(error::nist_too_long("NIST buffer too long (extra bytes)"));
                    length = new_length;
                }
            }
        }

        let record_buffer = &buffer[offset..offset + length];

        let pos = tag_for_data.and_then(|tag| {
            let needle = format!("{tag}:");
            record_buffer.find(needle.as_bytes())
        });

        let pos_end: isize = match pos {
            Some(p) if p > 0 => record_buffer[..p]
                .rfind_byte(crate::GS)
                .map(|x| x as isize)
                .unwrap_or(-1),
            _ => 0,
        };

        let result = if matches!(pos, Some(p) if p > 0) && pos_end != pos.unwrap() as isize {
            let pos = pos.unwrap();
            let prefix_start = if pos_end >= 0 {
                pos_end as usize + 1
            } else {
                0
            };
            let check_end = (pos + 4).min(record_buffer.len());
            if !looks_like_tag_prefix(&record_buffer[prefix_start..check_end]) {
                return Err(error::bad_tag_format(format!(
                    "illegal format for tag {}",
                    tag_for_data.unwrap_or_default()
                )));
            }

            let text_end = if pos_end >= 0 { pos_end as usize } else { record_buffer.len() - 1 };
            let mut text_buffer = record_buffer[..text_end].to_vec();
            text_buffer.push(crate::FS);

            let mut nr = AsciiRecord::bare(record_type, true);
            let closed = parse_into(&mut nr, &text_buffer);

            match closed {
                Err(exc) => Err(match future_exc.take() {
                    Some(fe) => fe.deferred(exc),
                    None => exc,
                }),
                Ok(false) => Err(future_exc.take().unwrap_or_else(|| {
                    error::record_not_terminated(format!("record type {record_type} not terminated"))
                })),
                Ok(true) => {
                    let data_start = (pos + 4).min(record_buffer.len());
                    let data_end = record_buffer.len().saturating_sub(1).max(data_start);
                    let data = record_buffer[data_start..data_end].to_vec();
                    let bf = crate::field::BinaryField::new(record_type, tag_for_data.unwrap(), data);
                    nr.push_binary_field(bf)?;
                    self.push(Record::Ascii(nr))?;
                    Ok(())
                }
            }
        } else if record_type == 1 {
            let record1 = self.record1_mut();
            let closed = parse_into(record1, record_buffer);
            match closed {
                Err(exc) => Err(match future_exc.take() {
                    Some(fe) => fe.deferred(exc),
                    None => exc,
                }),
                Ok(false) => Err(future_exc.take().unwrap_or_else(|| {
                    error::record_not_terminated("record type 1 not terminated")
                })),
                Ok(true) => Ok(()),
            }
        } else {
            let mut nr = AsciiRecord::bare(record_type, true);
            let closed = parse_into(&mut nr, record_buffer);
            match closed {
                Err(exc) => Err(match future_exc.take() {
                    Some(fe) => fe.deferred(exc),
                    None => exc,
                }),
                Ok(false) => Err(future_exc.take().unwrap_or_else(|| {
                    error::record_not_terminated(format!("record type {record_type} not terminated"))
                })),
                Ok(true) => {
                    self.push(Record::Ascii(nr))?;
                    Ok(())
                }
            }
        };

        result?;
        if let Some(fe) = future_exc {
            return Err(fe);
        }
        Ok(length)
    }

    fn parse_binary_record(&mut self, buffer: &[u8], offset: usize) -> error::Result<usize> {
        if offset + 5 > buffer.len() {
            return Err(error::nist_too_short(
                "NIST buffer too short (missing bytes) when parsing a binary record",
            ));
        }
        let length = u32::from_be_bytes([
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]) as usize;
        let idc = buffer[offset + 4] as i64;

        // The record's own type is never stored alongside it: it is
        // deduced from record 1's CNT field, as already parsed from
        // the buffer. CNT's subfield 0 describes record 0 (the type-1
        // record itself); subfield N describes records[N], so the
        // record about to be appended (at index `position`) is found
        // at that same subfield index.
        let position = self.records.len();
        let record_type = self
            .record1()
            .field(3)
            .and_then(|cnt| cnt.get(position))
            .and_then(|sf| sf.get(0))
            .and_then(crate::value::Value::as_int);
        let record_type = match record_type {
            Some(rt) => rt,
            None => {
                return Err(error::bad_content(
                    "could not recognize binary record, bad content or bad record",
                ))
            }
        };

        if offset + length > buffer.len() {
            return Err(error::nist_too_short(format!(
                "NIST buffer too short (missing bytes) when parsing record {record_type}"
            )));
        }

        let mut nr = BinaryRecord::new(record_type as u16);
        nr.set_idc(idc);
        nr.set_value(buffer[offset + 5..offset + length].to_vec());
        self.push(Record::Binary(nr))?;
        Ok(length)
    }

    /// Validates the `CNT` field found while parsing against the
    /// records actually recovered from the buffer. Unlike
    /// [`Message::cnt`], this reads the field as parsed, it does not
    /// recompute it.
    fn check_cnt(&mut self) -> error::Result<()> {
        let record1 = self.record1();
        let cnt = record1
            .field(3)
            .ok_or_else(|| error::bad_content("record 1 has no CNT field"))?;
        if cnt.len() != self.records.len() {
            return Err(error::bad_content(
                "bad CNT tag in record 1 (different number of records)",
            ));
        }
        for i in 0..cnt.len() {
            let sf = cnt.get(i).expect("index in range");
            if sf.len() != 2 {
                return Err(error::bad_content(format!(
                    "bad CNT tag in record 1 (bad number of values for subfield #{i})"
                )));
            }
            let a = sf.get(0).and_then(crate::value::Value::as_int).unwrap_or(-1);
            let b = sf.get(1).and_then(crate::value::Value::as_int).unwrap_or(-1);
            let record = &self.records[i];
            if i == 0 {
                if a != record.record_type() as i64 {
                    return Err(error::bad_content(
                        "bad CNT tag in record 1 (bad record type for subfield #0)",
                    ));
                }
            } else if a != record.record_type() as i64 && b != record.idc() {
                return Err(error::bad_content(format!(
                    "bad CNT tag in record 1 (bad record type or bad IDC for subfield #{i})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_message_has_one_type1_record() {
        let msg = Message::new().unwrap();
        assert_eq!(msg.len(), 1);
        assert_eq!(msg.get(0).unwrap().record_type(), 1);
    }

    #[test]
    fn cannot_add_second_type1_record() {
        let mut msg = Message::new().unwrap();
        let r1 = AsciiRecord::with_options(1, false, true).unwrap();
        let err = msg.push(Record::Ascii(r1)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::CannotAddType1);
    }

    #[test]
    fn round_trips_a_simple_message() {
        let mut msg = Message::new().unwrap();
        msg.set_tot("TOTFORTEST").unwrap();
        let mut r2 = AsciiRecord::with_options(2, true, true).unwrap();
        r2.field_mut(2).unwrap().set_value(1i64).unwrap();
        msg.push(Record::Ascii(r2)).unwrap();

        let bytes = msg.to_nist().unwrap();

        let mut reparsed = Message::new().unwrap();
        reparsed.parse(&bytes).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.tot().unwrap().as_str(), Some("TOTFORTEST"));
    }

    #[test]
    fn truncated_buffer_is_too_short() {
        let mut msg = Message::new().unwrap();
        let bytes = msg.to_nist().unwrap();
        let mut reparsed = Message::new().unwrap();
        let err = reparsed.parse(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NistTooShort);
    }

    #[test]
    fn extra_trailing_bytes_are_too_long() {
        let mut msg = Message::new().unwrap();
        let mut bytes = msg.to_nist().unwrap();
        bytes.extend_from_slice(b"x");
        let mut reparsed = Message::new().unwrap();
        let err = reparsed.parse(&bytes).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NistTooLong);
    }
}
