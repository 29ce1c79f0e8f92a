use std::io::{self, Write};

use crate::error;
use crate::mask::Mask;
use crate::value::Value;

/// The content held by a [`SubField`]: either a single scalar value or a
/// list of items, depending on the subfield's [`Mask`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Scalar(Value),
    Items(Vec<Value>),
}

impl Default for Content {
    fn default() -> Self {
        Content::Scalar(Value::Text(String::new()))
    }
}

/// A subfield of a [`crate::Field`], separated from its siblings by the
/// `US` (item) or `RS` (subfield) byte depending on its position.
///
/// A subfield holds either a single scalar value, or a list of items,
/// according to its mask. Mixing both is rejected.
///
/// ```
/// use nist_itl::{Mask, SubField};
///
/// let mut sf = SubField::new(Mask::I);
/// sf.add_values(["a", "b"]).unwrap();
/// assert_eq!(sf.items().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubField {
    mask: Mask,
    content: Content,
}

impl SubField {
    pub const SEPARATOR: u8 = crate::US;

    /// Creates an empty subfield allowed to hold the content shapes in
    /// `mask`.
    pub fn new(mask: Mask) -> Self {
        SubField {
            mask,
            content: Content::default(),
        }
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Rebuilds `sf` under a different mask, keeping its content as-is.
    ///
    /// Used by [`crate::Field::add_subfields`] to force a subfield's
    /// mask to match its owning field's mask.
    pub(crate) fn with_content(mask: Mask, sf: SubField) -> SubField {
        SubField {
            mask,
            content: sf.content,
        }
    }

    /// Returns the scalar value, if this subfield holds one (and not a
    /// list of items).
    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            Content::Scalar(v) => Some(v),
            Content::Items(_) => None,
        }
    }

    /// Returns the items, if this subfield holds a non-empty list.
    pub fn items(&self) -> Option<&[Value]> {
        match &self.content {
            Content::Items(v) if !v.is_empty() => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.content {
            Content::Items(v) => v.len(),
            Content::Scalar(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        match &self.content {
            Content::Items(v) => v.get(idx),
            Content::Scalar(_) => None,
        }
    }

    /// Sets the scalar value of this subfield, clearing any items.
    ///
    /// Rejected when the value is non-empty and the subfield's mask
    /// does not allow a scalar (`S`).
    pub fn set_value(&mut self, value: impl Into<Value>) -> error::Result<()> {
        let value = value.into();
        if !value.is_empty_text() && !self.mask.contains(Mask::S) {
            return Err(error::bad_subfield_value(
                "subfield cannot have a value, only items",
            ));
        }
        self.content = Content::Scalar(value);
        Ok(())
    }

    /// Appends items to this subfield's list.
    ///
    /// Rejected when the subfield's mask does not allow items (`I`).
    pub fn add_values<I, V>(&mut self, values: I) -> error::Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_some() && !self.mask.contains(Mask::I) {
            return Err(error::bad_subfield_value("subfield cannot have items"));
        }
        let items = match &mut self.content {
            Content::Items(v) => v,
            Content::Scalar(_) => {
                self.content = Content::Items(Vec::new());
                match &mut self.content {
                    Content::Items(v) => v,
                    Content::Scalar(_) => unreachable!(),
                }
            }
        };
        items.extend(values.map(Into::into));
        Ok(())
    }

    pub(crate) fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        match &self.content {
            Content::Items(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_all(&[crate::US])?;
                    }
                    write!(out, "{item}")?;
                }
                Ok(())
            }
            Content::Items(_) => Ok(()),
            Content::Scalar(v) => write!(out, "{v}"),
        }
    }

    pub(crate) fn to_nist(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("writing to a Vec cannot fail");
        buf
    }
}

#[cfg(feature = "arbitrary")]
impl quickcheck::Arbitrary for SubField {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        if bool::arbitrary(g) {
            let mut sf = SubField::new(Mask::I);
            let items: Vec<Value> = (0..(u8::arbitrary(g) % 4))
                .map(|_| Value::arbitrary(g))
                .collect();
            sf.add_values(items).expect("items allowed by mask I");
            sf
        } else {
            let mut sf = SubField::new(Mask::S);
            sf.set_value(Value::arbitrary(g)).expect("value allowed by mask S");
            sf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_subfield_round_trips() {
        let mut sf = SubField::new(Mask::S);
        sf.set_value("ok").unwrap();
        assert_eq!(sf.to_nist(), b"ok");
    }

    #[test]
    fn items_subfield_joins_with_us() {
        let mut sf = SubField::new(Mask::I);
        sf.add_values(["one", "two"]).unwrap();
        assert_eq!(sf.to_nist(), b"one\x1ftwo");
    }

    #[test]
    fn scalar_only_subfield_rejects_items() {
        let mut sf = SubField::new(Mask::S);
        let err = sf.add_values(["a", "b"]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadSubfieldValue);
    }

    #[test]
    fn items_only_subfield_rejects_value() {
        let mut sf = SubField::new(Mask::I);
        let err = sf.set_value("nope").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BadSubfieldValue);
    }

    #[test]
    fn empty_text_value_is_always_allowed() {
        let mut sf = SubField::new(Mask::I);
        sf.set_value("").unwrap();
    }

    #[quickcheck_macros::quickcheck]
    fn arbitrary_subfield_has_no_stray_separators(sf: SubField) -> bool {
        let bytes = sf.to_nist();
        !bytes.contains(&crate::FS) && !bytes.contains(&crate::GS) && !bytes.contains(&crate::RS)
    }
}
