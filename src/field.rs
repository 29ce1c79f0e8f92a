use std::io::{self, Write};

use crate::error;
use crate::mask::Mask;
use crate::subfield::SubField;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Scalar(Value),
    SubFields(Vec<SubField>),
}

/// A field of an [`crate::AsciiRecord`], written as `record.tag:value`.
///
/// A field holds either a scalar value, or a list of [`SubField`]s,
/// according to its [`Mask`]. Adding subfields clears any scalar value,
/// but repeated calls to [`Field::add_subfields`] append rather than
/// replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    record_type: u16,
    tag: u16,
    mask: Mask,
    alias: Option<String>,
    content: Content,
}

impl Field {
    pub const SEPARATOR: u8 = crate::RS;

    pub fn new(record_type: u16, tag: u16) -> Self {
        Field::with_mask(record_type, tag, Mask::FSI)
    }

    pub fn with_mask(record_type: u16, tag: u16, mask: Mask) -> Self {
        Field {
            record_type,
            tag,
            mask,
            alias: crate::alias::alias(record_type, tag).map(str::to_owned),
            content: Content::Scalar(Value::Text(String::new())),
        }
    }

    pub fn record_type(&self) -> u16 {
        self.record_type
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = Some(alias.into());
    }

    /// Returns the scalar value of this field, if it has no subfields.
    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            Content::Scalar(v) => Some(v),
            Content::SubFields(_) => None,
        }
    }

    pub fn subfields(&self) -> &[SubField] {
        match &self.content {
            Content::SubFields(sfs) => sfs,
            Content::Scalar(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.subfields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subfields().is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&SubField> {
        self.subfields().get(idx)
    }

    /// Resets this field to an empty scalar value with no subfields.
    pub fn reset(&mut self) {
        self.content = Content::Scalar(Value::Text(String::new()));
    }

    fn tag_label(&self) -> String {
        format!("{}.{:03}:", self.record_type, self.tag)
    }

    /// Sets the scalar value of this field, discarding any subfields.
    ///
    /// Rejected when the value is non-empty and the field's mask does
    /// not allow a scalar (`F`).
    pub fn set_value(&mut self, value: impl Into<Value>) -> error::Result<()> {
        let value = value.into();
        if !value.is_empty_text() && !self.mask.contains(Mask::F) {
            return Err(error::bad_field_value(format!(
                "field {} cannot have a value (only subfields and/or items)",
                self.tag_label()
            )));
        }
        self.content = Content::Scalar(value);
        Ok(())
    }

    /// Appends subfields to this field, clearing the scalar value.
    ///
    /// Each subfield's mask is overwritten with this field's mask.
    /// Rejected when the field's mask forbids subfields altogether, or
    /// when an individual subfield's shape (scalar vs. items) is not
    /// allowed by the field's mask.
    pub fn add_subfields<I>(&mut self, subfields: I) -> error::Result<()>
    where
        I: IntoIterator<Item = SubField>,
    {
        let mut subfields = subfields.into_iter().peekable();
        if subfields.peek().is_some()
            && !(self.mask.contains(Mask::S) || self.mask.contains(Mask::I))
        {
            return Err(error::bad_field_value(format!(
                "field {} cannot have subfields",
                self.tag_label()
            )));
        }

        let existing = match &mut self.content {
            Content::SubFields(sfs) => std::mem::take(sfs),
            Content::Scalar(_) => Vec::new(),
        };
        let mut result = existing;

        for mut sf in subfields {
            if sf.items().is_some() {
                if !self.mask.contains(Mask::I) {
                    return Err(error::bad_subfield_value(format!(
                        "subfield of {} cannot have items",
                        self.tag_label()
                    )));
                }
            } else if let Some(v) = sf.value() {
                if !v.is_empty_text() && !self.mask.contains(Mask::S) {
                    return Err(error::bad_subfield_value(format!(
                        "subfield of {} cannot have a value: {:?}",
                        self.tag_label(),
                        v
                    )));
                }
            }
            sf = SubField::with_content(self.mask, sf);
            result.push(sf);
        }

        self.content = Content::SubFields(result);
        Ok(())
    }

    pub(crate) fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}", self.tag_label())?;
        match &self.content {
            Content::Scalar(v) => write!(out, "{v}"),
            Content::SubFields(sfs) => {
                for (i, sf) in sfs.iter().enumerate() {
                    if i > 0 {
                        out.write_all(&[crate::RS])?;
                    }
                    sf.write_to(out)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn to_nist(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("writing to a Vec cannot fail");
        buf
    }
}

/// A binary field, used only as the final field of a handful of ASCII
/// records (e.g. `10.999`, `13.999`, `14.999` image data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryField {
    record_type: u16,
    tag: u16,
    alias: Option<String>,
    value: Vec<u8>,
}

impl BinaryField {
    pub fn new(record_type: u16, tag: u16, value: impl Into<Vec<u8>>) -> Self {
        BinaryField {
            record_type,
            tag,
            alias: crate::alias::alias(record_type, tag).map(str::to_owned),
            value: value.into(),
        }
    }

    pub fn record_type(&self) -> u16 {
        self.record_type
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) {
        self.value = value.into();
    }

    pub(crate) fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}.{:03}:", self.record_type, self.tag)?;
        out.write_all(&self.value)
    }

    pub(crate) fn to_nist(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("writing to a Vec cannot fail");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_field_serializes_with_tag_prefix() {
        let mut f = Field::new(2, 2);
        f.set_value(0i64).unwrap();
        assert_eq!(f.to_nist(), b"2.002:0");
    }

    #[test]
    fn adding_subfields_clears_scalar_value() {
        let mut f = Field::new(2, 12);
        f.set_value("scalar").unwrap();
        let mut sf = SubField::new(Mask::FSI);
        sf.set_value("TEST12-SF1").unwrap();
        f.add_subfields([sf]).unwrap();
        assert!(f.value().is_none());
        assert_eq!(f.to_nist(), b"2.012:TEST12-SF1");
    }

    #[test]
    fn repeated_add_subfields_appends_not_replaces() {
        let mut f = Field::new(2, 12);
        let mut a = SubField::new(Mask::FSI);
        a.set_value("a").unwrap();
        let mut b = SubField::new(Mask::FSI);
        b.set_value("b").unwrap();
        f.add_subfields([a]).unwrap();
        f.add_subfields([b]).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.to_nist(), b"2.012:a\x1eb");
    }

    #[test]
    fn scalar_only_field_rejects_subfields() {
        let mut f = Field::with_mask(2, 3, Mask::F);
        let sf = SubField::new(Mask::FSI);
        let err = f.add_subfields([sf]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadFieldValue);
    }

    #[test]
    fn binary_field_serializes_raw_bytes() {
        let bf = BinaryField::new(14, 999, b"data".to_vec());
        assert_eq!(bf.to_nist(), b"14.999:data");
    }
}
