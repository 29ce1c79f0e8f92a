use std::fmt;
use std::io::{self, Write};

use chrono::Local;
use uuid::Uuid;

use crate::error;
use crate::field::{BinaryField, Field};
use crate::mask::Mask;
use crate::value::Value;

/// A field or binary field held by an [`AsciiRecord`].
///
/// Binary entries only ever appear as a record's last entry (image or
/// other opaque data trailing a handful of ASCII record types).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Field(Field),
    Binary(BinaryField),
}

impl Entry {
    pub fn tag(&self) -> u16 {
        match self {
            Entry::Field(f) => f.tag(),
            Entry::Binary(b) => b.tag(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Entry::Field(f) => f.alias(),
            Entry::Binary(b) => b.alias(),
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Entry::Field(f) => Some(f),
            Entry::Binary(_) => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match self {
            Entry::Field(f) => Some(f),
            Entry::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryField> {
        match self {
            Entry::Binary(b) => Some(b),
            Entry::Field(_) => None,
        }
    }

    pub(crate) fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Entry::Field(f) => f.write_to(out),
            Entry::Binary(b) => b.write_to(out),
        }
    }
}

/// A text record: fields, subfields and items encoded in latin-1,
/// optionally followed by a single binary field (e.g. image data).
///
/// Fields are kept in a flat list but serialized in tag order, except
/// for the trailing binary field which always stays last; this
/// matches [`AsciiRecord::autosort`]. Record 1's `LEN` field is
/// recomputed on every [`AsciiRecord::to_nist`] call by repeated
/// re-serialization until the length stabilizes, because the length
/// itself is encoded as decimal text whose own width can change the
/// total length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiRecord {
    record_type: u16,
    entries: Vec<Entry>,
    autosort: bool,
}

impl AsciiRecord {
    pub const SEPARATOR: u8 = crate::GS;

    /// Creates a record of `record_type`, pre-populated with the
    /// mandatory fields NIST-ITL requires for that type (`LEN` and
    /// `IDC` for most types; the full complement of type-1 header
    /// fields, including a freshly generated `TCN` and today's date
    /// for `DAT`, for type 1).
    pub fn new(record_type: u16) -> error::Result<Self> {
        Self::with_options(record_type, true, true)
    }

    /// Creates a bare record with no fields, for use while parsing.
    pub fn bare(record_type: u16, autosort: bool) -> Self {
        AsciiRecord {
            record_type,
            entries: Vec::new(),
            autosort,
        }
    }

    pub fn with_options(
        record_type: u16,
        autocreate: bool,
        autosort: bool,
    ) -> error::Result<Self> {
        let mut record = AsciiRecord::bare(record_type, autosort);
        if autocreate {
            record.push_field(Field::new(record_type, 1))?;
            if record_type == 1 {
                let mut ver = Field::new(1, 2);
                ver.set_value("0400")?;
                record.push_field(ver)?;
                record.push_field(Field::new(1, 3))?;
                record.push_field(Field::new(1, 4))?;

                let mut dat = Field::new(1, 5);
                dat.set_value(Local::now().format("%Y%m%d").to_string())?;
                record.push_field(dat)?;

                let mut dai = Field::new(1, 7);
                dai.set_value("000")?;
                record.push_field(dai)?;

                let mut ori = Field::new(1, 8);
                ori.set_value("000")?;
                record.push_field(ori)?;

                let mut tcn = Field::new(1, 9);
                tcn.set_value(Uuid::now_v1(&[0u8; 6]).simple().to_string())?;
                record.push_field(tcn)?;

                let mut nsr = Field::new(1, 11);
                nsr.set_value("00.00")?;
                record.push_field(nsr)?;

                let mut ntr = Field::new(1, 12);
                ntr.set_value("00.00")?;
                record.push_field(ntr)?;
            } else {
                let mut idc = Field::new(record_type, 2);
                idc.set_value(0i64)?;
                record.push_field(idc)?;
            }
        }
        Ok(record)
    }

    pub fn record_type(&self) -> u16 {
        self.record_type
    }

    pub fn autosort(&self) -> bool {
        self.autosort
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `entry`, validating that it belongs to this record type
    /// and that its tag and alias are not already in use.
    pub fn push(&mut self, entry: Entry) -> error::Result<()> {
        let (tag, record_type) = match &entry {
            Entry::Field(f) => (f.tag(), f.record_type()),
            Entry::Binary(b) => (b.tag(), b.record_type()),
        };
        if record_type != self.record_type {
            return Err(error::bad_record_number(format!(
                "bad record number {record_type} for tag {tag} in record {}",
                self.record_type
            )));
        }
        for existing in &self.entries {
            if existing.tag() == tag {
                return Err(error::bad_tag_duplicate(format!(
                    "tag {tag} already defined in record {}",
                    self.record_type
                )));
            }
            if let (Some(a), Some(b)) = (existing.alias(), entry.alias()) {
                if a == b {
                    return Err(error::bad_alias_duplicate(format!(
                        "alias {a:?} already defined in record {}",
                        self.record_type
                    )));
                }
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn push_field(&mut self, field: Field) -> error::Result<()> {
        self.push(Entry::Field(field))
    }

    pub fn push_binary_field(&mut self, field: BinaryField) -> error::Result<()> {
        self.push(Entry::Binary(field))
    }

    /// Removes the first entry matching `tag`, if any.
    pub fn remove(&mut self, tag: u16) {
        if let Some(pos) = self.entries.iter().position(|e| e.tag() == tag) {
            self.entries.remove(pos);
        }
    }

    /// Looks up an entry by tag number or alias (case sensitive).
    pub fn get(&self, key: &str) -> Option<&Entry> {
        if let Ok(tag) = key.parse::<u16>() {
            if let Some(e) = self.entries.iter().find(|e| e.tag() == tag) {
                return Some(e);
            }
        }
        self.entries.iter().find(|e| e.alias() == Some(key))
    }

    /// Looks up an entry by tag number or alias (case sensitive),
    /// mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        let idx = if let Ok(tag) = key.parse::<u16>() {
            self.entries.iter().position(|e| e.tag() == tag)
        } else {
            None
        }
        .or_else(|| self.entries.iter().position(|e| e.alias() == Some(key)));
        idx.map(move |i| &mut self.entries[i])
    }

    pub fn get_by_tag(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag() == tag)
    }

    pub fn get_by_tag_mut(&mut self, tag: u16) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.tag() == tag)
    }

    /// Reads a field's value by alias or tag number (e.g. `"TOT"` or
    /// `"4"`), mirroring the dynamic attribute access of the original
    /// library. Fails with `UNKNOWN_ATTRIBUTE` if no such field exists,
    /// or if it holds subfields rather than a scalar value.
    pub fn attr(&self, key: &str) -> error::Result<&Value> {
        self.get(key)
            .and_then(Entry::as_field)
            .and_then(Field::value)
            .ok_or_else(|| error::unknown_attribute(format!("no such field: {key:?}")))
    }

    /// Sets a field's value by alias or tag number.
    ///
    /// If a field with that key already exists, its value is replaced.
    /// Otherwise, a field is created: `key` is resolved to a tag number
    /// either directly (for a numeric key) or through the record's
    /// static alias table (for a named one), failing
    /// `UNKNOWN_ATTRIBUTE` when an alias is not recognized for this
    /// record type. There is no scalar equivalent for the `DATA` alias;
    /// use [`AsciiRecord::push_binary_field`] for binary trailers.
    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) -> error::Result<()> {
        let value = value.into();
        if let Some(entry) = self.get_mut(key) {
            return match entry {
                Entry::Field(f) => f.set_value(value),
                Entry::Binary(_) => Err(error::unknown_attribute(format!(
                    "{key:?} is a binary field, it has no scalar value"
                ))),
            };
        }
        let tag = match key.parse::<u16>() {
            Ok(tag) => tag,
            Err(_) => crate::alias::tag_for_alias(self.record_type, key)
                .ok_or_else(|| error::unknown_attribute(format!("no such field: {key:?}")))?,
        };
        let mut field = Field::new(self.record_type, tag);
        field.set_value(value)?;
        self.push_field(field)
    }

    pub fn field(&self, tag: u16) -> Option<&Field> {
        self.get_by_tag(tag).and_then(Entry::as_field)
    }

    pub fn field_mut(&mut self, tag: u16) -> Option<&mut Field> {
        self.get_by_tag_mut(tag).and_then(Entry::as_field_mut)
    }

    /// Fetches the field for `tag`, inserting a fresh one (with the
    /// given `mask`) if it is not already present. Used by the parser,
    /// which must tolerate fields arriving in any order.
    pub(crate) fn ensure_field(&mut self, tag: u16, mask: Mask) -> &mut Field {
        if self.get_by_tag(tag).is_none() {
            let _ = self.push_field(Field::with_mask(self.record_type, tag, mask));
        }
        self.get_by_tag_mut(tag)
            .and_then(Entry::as_field_mut)
            .expect("just inserted")
    }

    /// The record's `IDC` value (type 1 has none and reads as 0).
    pub fn idc(&self) -> i64 {
        if self.record_type == 1 {
            return 0;
        }
        self.field(2).and_then(Field::value).and_then(|v| v.as_int()).unwrap_or(0)
    }

    /// Entries in the order they are serialized: non-binary fields
    /// (sorted by tag if [`AsciiRecord::autosort`] is set, else
    /// insertion order), followed by the trailing binary field.
    fn sorted_entries(&self, start: usize) -> Vec<&Entry> {
        let mut fields: Vec<&Entry> = Vec::new();
        let mut binary: Vec<&Entry> = Vec::new();
        for e in &self.entries[start.min(self.entries.len())..] {
            match e {
                Entry::Field(_) => fields.push(e),
                Entry::Binary(_) => binary.push(e),
            }
        }
        if self.autosort {
            fields.sort_by_key(|e| e.tag());
        }
        fields.extend(binary);
        fields
    }

    /// Serializes this record, recomputing `LEN` (tag 1) to match the
    /// total length including the `LEN` field and the trailing record
    /// terminator.
    pub fn to_nist(&mut self) -> io::Result<Vec<u8>> {
        let mut tail = Vec::new();
        for (i, entry) in self.sorted_entries(1).into_iter().enumerate() {
            if i > 0 {
                tail.write_all(&[crate::GS])?;
            }
            entry.write_to(&mut tail)?;
        }

        self.field_mut(1)
            .expect("record 1 always carries a LEN field")
            .set_value(0i64)
            .expect("LEN accepts scalars");

        let mut previous: i64 = -1;
        let mut body;
        loop {
            let mut head = Vec::new();
            self.field(1)
                .expect("record 1 always carries a LEN field")
                .write_to(&mut head)?;

            body = head;
            if !tail.is_empty() {
                body.push(crate::GS);
                body.extend_from_slice(&tail);
            }

            let len = body.len() as i64;
            self.field_mut(1)
                .expect("record 1 always carries a LEN field")
                .set_value(len + 1)
                .expect("LEN accepts scalars");

            if previous == len {
                break;
            }
            previous = len;
        }

        body.push(crate::FS);
        Ok(body)
    }
}

impl fmt::Display for AsciiRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for entry in self.sorted_entries(0) {
            match entry {
                Entry::Field(field) => lines.push(format!(
                    "{:2}.{:03}: {:30}: {}",
                    self.record_type,
                    field.tag(),
                    field.alias().unwrap_or(""),
                    field
                        .value()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| format!(
                            "{:?}",
                            field.subfields().iter().map(|s| s.to_nist()).collect::<Vec<_>>()
                        ))
                )),
                Entry::Binary(bf) => lines.push(format!(
                    "{:2}.{:03}: {:30}: <buffer, size={}>",
                    self.record_type,
                    bf.tag(),
                    bf.alias().unwrap_or(""),
                    bf.value().len()
                )),
            }
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// A numeric field packed with [`BinaryRecord::pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackField {
    U8,
    U16,
    U32,
}

impl PackField {
    fn size(self) -> usize {
        match self {
            PackField::U8 => 1,
            PackField::U16 => 2,
            PackField::U32 => 4,
        }
    }
}

/// A fully binary record (types 3 through 8). These are not parsed at
/// all beyond the 4-byte big-endian length and 1-byte `IDC` that frame
/// every record; the rest is opaque payload, optionally interpreted
/// field-by-field with [`BinaryRecord::pack`]/[`BinaryRecord::unpack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    record_type: u16,
    idc: i64,
    value: Vec<u8>,
    packed_spec: Option<Vec<PackField>>,
}

impl BinaryRecord {
    /// Creates an empty binary record of `record_type` (3 through 8),
    /// with `IDC` defaulted to 1.
    ///
    /// Types 3 (low-resolution grayscale fingerprint), 5 (low-resolution
    /// binary fingerprint) and 6 (high-resolution binary fingerprint)
    /// are deprecated by the standard; they are still accepted here.
    pub fn new(record_type: u16) -> Self {
        BinaryRecord {
            record_type,
            idc: 1,
            value: Vec::new(),
            packed_spec: None,
        }
    }

    pub fn record_type(&self) -> u16 {
        self.record_type
    }

    pub fn idc(&self) -> i64 {
        self.idc
    }

    pub fn set_idc(&mut self, idc: i64) {
        self.idc = idc;
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) {
        self.value = value.into();
        self.packed_spec = None;
    }

    /// Total record length in bytes: 4-byte length, 1-byte `IDC`, then
    /// the payload.
    pub fn length(&self) -> usize {
        5 + self.value.len()
    }

    pub fn to_nist(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.length());
        buf.extend_from_slice(&(self.length() as u32).to_be_bytes());
        buf.push(self.idc as u8);
        buf.extend_from_slice(&self.value);
        buf
    }

    /// Packs `values` (interpreted big-endian per `spec`) followed by
    /// `trailing` raw bytes into this record's value.
    ///
    /// `spec` is remembered on the record, so [`Display`](fmt::Display)
    /// can later show the unpacked fields instead of an opaque buffer
    /// size. Any trailing bytes beyond `spec`'s fields are not shown.
    pub fn pack(&mut self, spec: &[PackField], values: &[u64], trailing: &[u8]) {
        let mut buf = Vec::new();
        for (field, value) in spec.iter().zip(values) {
            match field {
                PackField::U8 => buf.push(*value as u8),
                PackField::U16 => buf.extend_from_slice(&(*value as u16).to_be_bytes()),
                PackField::U32 => buf.extend_from_slice(&(*value as u32).to_be_bytes()),
            }
        }
        buf.extend_from_slice(trailing);
        self.value = buf;
        self.packed_spec = Some(spec.to_vec());
    }

    /// Unpacks the leading fields of this record's value per `spec`,
    /// returning the decoded values and the remaining trailing bytes.
    pub fn unpack(&self, spec: &[PackField]) -> (Vec<u64>, &[u8]) {
        let mut values = Vec::with_capacity(spec.len());
        let mut offset = 0;
        for field in spec {
            let size = field.size();
            let chunk = &self.value[offset..offset + size];
            let value = match field {
                PackField::U8 => chunk[0] as u64,
                PackField::U16 => u16::from_be_bytes([chunk[0], chunk[1]]) as u64,
                PackField::U32 => {
                    u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64
                }
            };
            values.push(value);
            offset += size;
        }
        (values, &self.value[offset..])
    }
}

impl fmt::Display for BinaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:2}.{:03}: {:30}: {}", self.record_type, 1, "LEN", self.length())?;
        write!(f, "{:2}.{:03}: {:30}: {}", self.record_type, 2, "IDC", self.idc)?;
        match &self.packed_spec {
            Some(spec) => {
                let (values, trailing) = self.unpack(spec);
                for (i, value) in values.iter().enumerate() {
                    write!(f, "\n{:2}.---: {:<30}: {}", self.record_type, format!("field{i}"), value)?;
                }
                if !trailing.is_empty() {
                    write!(
                        f,
                        "\n{:2}.---: {:<30}: <buffer, size={}>",
                        self.record_type,
                        "trailing",
                        trailing.len()
                    )?;
                }
                Ok(())
            }
            None => write!(
                f,
                "\n{:2}.---: {:30}: <buffer, size={}>",
                self.record_type,
                "",
                self.value.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_is_recomputed_on_serialization() {
        let mut r = AsciiRecord::with_options(2, true, true).unwrap();
        r.field_mut(2).unwrap().set_value(3i64).unwrap();
        let nist = r.to_nist().unwrap();
        assert_eq!(nist, b"2.001:17\x1d2.002:3\x1c");
    }

    #[test]
    fn attr_reads_by_alias_and_tag() {
        let r = AsciiRecord::with_options(1, true, true).unwrap();
        assert_eq!(r.attr("VER").unwrap().as_str(), Some("0400"));
        assert_eq!(r.attr("2").unwrap().as_str(), Some("0400"));
    }

    #[test]
    fn attr_on_missing_field_is_unknown_attribute() {
        let r = AsciiRecord::with_options(2, false, true).unwrap();
        let err = r.attr("NOPE").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnknownAttribute);
    }

    #[test]
    fn set_attr_updates_an_existing_field() {
        let mut r = AsciiRecord::with_options(2, true, true).unwrap();
        r.set_attr("IDC", 7i64).unwrap();
        assert_eq!(r.attr("IDC").unwrap().as_int(), Some(7));
    }

    #[test]
    fn set_attr_creates_a_field_known_by_the_alias_table() {
        let mut r = AsciiRecord::with_options(10, true, true).unwrap();
        r.set_attr("HLL", 500i64).unwrap();
        assert_eq!(r.attr("HLL").unwrap().as_int(), Some(500));
    }

    #[test]
    fn set_attr_rejects_an_unrecognized_alias() {
        let mut r = AsciiRecord::with_options(2, false, true).unwrap();
        let err = r.set_attr("NOPE", "x").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnknownAttribute);
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut r = AsciiRecord::with_options(2, false, true).unwrap();
        r.push_field(Field::new(2, 3)).unwrap();
        let err = r.push_field(Field::new(2, 3)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadTagDuplicate);
    }

    #[test]
    fn wrong_record_type_is_rejected() {
        let mut r = AsciiRecord::with_options(2, false, true).unwrap();
        let err = r.push_field(Field::new(3, 1)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadRecordNumber);
    }

    #[test]
    fn binary_record_frames_length_and_idc() {
        let mut r = BinaryRecord::new(4);
        r.set_idc(1);
        r.set_value(b"data".to_vec());
        assert_eq!(r.to_nist(), b"\x00\x00\x00\x09\x01data");
    }

    #[test]
    fn pack_then_unpack_round_trips() {
        let mut r = BinaryRecord::new(4);
        r.pack(
            &[PackField::U32, PackField::U16, PackField::U8],
            &[3, 2, 1],
            b"tail",
        );
        let (values, trailing) = r.unpack(&[PackField::U32, PackField::U16, PackField::U8]);
        assert_eq!(values, vec![3, 2, 1]);
        assert_eq!(trailing, b"tail");
    }

    #[test]
    fn display_shows_unpacked_fields_after_pack() {
        let mut r = BinaryRecord::new(4);
        r.pack(&[PackField::U8, PackField::U8], &[7, 9], b"");
        let shown = r.to_string();
        assert!(shown.contains("field0"));
        assert!(shown.contains('7'));
        assert!(shown.contains("field1"));
        assert!(shown.contains('9'));
    }

    #[test]
    fn display_falls_back_to_buffer_size_without_pack() {
        let mut r = BinaryRecord::new(4);
        r.set_value(b"raw bytes".to_vec());
        let shown = r.to_string();
        assert!(shown.contains("<buffer, size=9>"));
    }
}
