
//! Tagged record extensions (TREs): schema-described metadata records
//! embedded in the file header and in segment subheaders.
//!
//! On the wire, every record is a 6-byte tag, a 5-digit length,
//! and that many bytes of record data. The record data is decoded by
//! interpreting the description registered for the tag; records with
//! no registered description are preserved as raw bytes and survive a
//! read-write cycle unchanged.

pub mod describe;
pub mod interpret;
pub mod registry;

use std::sync::Arc;

use crate::error::{Error, Result, UnitResult, Warning, u64_to_usize};
use crate::field::{Field, FieldKind};
use crate::io::{Read, Tracking, Write};

pub use describe::{Cond, Descriptor, Length, TreDescription};
pub use interpret::{FieldMap, Parsed};

/// Width of the tag on the wire.
pub const TAG_LEN: usize = 6;

/// Digits of the record length on the wire.
pub const LENGTH_DIGITS: usize = 5;

/// A record body can never exceed what its 5-digit length can express.
pub const MAX_RECORD_LEN: usize = 99_999;

/// Wire overhead of one record: tag plus length digits.
pub const HEADER_LEN: usize = TAG_LEN + LENGTH_DIGITS;


/// One tagged record: a tag and its decoded fields,
/// or its raw bytes when no description matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Tre {
    tag: String,
    content: Content,
}

#[derive(Debug, Clone, PartialEq)]
enum Content {

    /// Every byte of the record was attributed to a field.
    /// Serializes through the description.
    Parsed {
        description: Arc<TreDescription>,
        fields: FieldMap,
    },

    /// The description matched only partially; the decoded prefix is
    /// available but the original bytes are kept for lossless round-trips.
    Partial {
        fields: FieldMap,
        raw: Vec<u8>,
    },

    /// No description is registered for the tag.
    Raw(Vec<u8>),
}

impl Tre {

    /// An empty record for the given tag, to be populated with fields.
    /// Fails when no description is registered for the tag.
    pub fn new(tag: &str) -> Result<Self> {
        let description = registry::find_any(tag)
            .ok_or_else(|| Error::invalid(format!("no description registered for tag `{}`", tag)))?;

        Self::with_description(tag, description)
    }

    /// An empty record serialized through a specific description
    /// instead of the registered one.
    pub fn with_description(tag: &str, description: Arc<TreDescription>) -> Result<Self> {
        registry::validate_tag(tag)?;

        Ok(Tre {
            tag: tag.to_owned(),
            content: Content::Parsed { description, fields: FieldMap::new() },
        })
    }

    /// A record that stores and emits its bytes without interpretation.
    pub fn raw(tag: &str, bytes: Vec<u8>) -> Result<Self> {
        registry::validate_tag(tag)?;

        Ok(Tre { tag: tag.to_owned(), content: Content::Raw(bytes) })
    }

    /// The 6-character tag, without padding.
    pub fn tag(&self) -> &str { &self.tag }

    /// Whether this record is an uninterpreted byte blob.
    pub fn is_raw(&self) -> bool {
        matches!(self.content, Content::Raw(_))
    }

    /// The decoded fields in insertion order, if any were decoded.
    pub fn fields(&self) -> Option<&FieldMap> {
        match &self.content {
            Content::Parsed { fields, .. } | Content::Partial { fields, .. } => Some(fields),
            Content::Raw(_) => None,
        }
    }

    /// One decoded field. Fields inside loops are
    /// addressed with their iteration suffix, like `ENGLN[0]`.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields().and_then(|fields| fields.get(key))
    }

    /// Store a field under the given key.
    /// Fails for raw records and for records kept for round-trip fidelity.
    pub fn insert(&mut self, key: &str, field: Field) -> UnitResult {
        match &mut self.content {
            Content::Parsed { fields, .. } => {
                fields.insert(key.to_owned(), field);
                Ok(())
            },

            _ => Err(Error::invalid("cannot insert fields into an uninterpreted record")),
        }
    }

    /// The serialized record body, without the tag and length prefix.
    pub fn record_bytes(&self) -> Result<Vec<u8>> {
        match &self.content {
            Content::Parsed { description, fields } => interpret::serialize(description, fields),
            Content::Partial { raw, .. } | Content::Raw(raw) => Ok(raw.clone()),
        }
    }

    /// Read one record (tag, length, body) from the stream.
    /// Unknown tags and malformed bodies become warnings, not errors.
    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        let tag_field = Field::read_from(read, FieldKind::BcsA, TAG_LEN)?;
        let tag = tag_field.as_str()?.to_owned();
        registry::validate_tag(&tag)?;

        let length = Field::read_from(read, FieldKind::BcsN, LENGTH_DIGITS)?.as_u64()?;
        let length = u64_to_usize(length);

        let body_offset = read.byte_position();
        let bytes = crate::io::read_bytes(read, length)?;

        let content = match registry::find(&tag, length) {
            Some(description) => {
                tracing::debug!(tag = tag.as_str(), length, "parsing tagged record");
                let parsed = interpret::parse(&description, &bytes, body_offset);

                if parsed.warnings.is_empty() {
                    Content::Parsed { description, fields: parsed.fields }
                }
                else {
                    warnings.extend(parsed.warnings);
                    Content::Partial { fields: parsed.fields, raw: bytes }
                }
            },

            None => {
                tracing::debug!(tag = tag.as_str(), length, "no description for tagged record, keeping raw bytes");
                warnings.push(Warning::new(
                    &tag, "no description registered for this tag, keeping raw bytes",
                    body_offset,
                ));

                Content::Raw(bytes)
            },
        };

        Ok(Tre { tag, content })
    }

    /// Write this record (tag, length, body) to the stream.
    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        let body = self.record_bytes()?;
        if body.len() > MAX_RECORD_LEN {
            return Err(Error::invalid(format!("record `{}` is too long for its length field", self.tag)));
        }

        Field::bcs_a(&self.tag, TAG_LEN)?.write_to(write)?;
        Field::bcs_n(body.len() as i64, LENGTH_DIGITS)?.write_to(write)?;
        write.write_all(&body)?;
        Ok(())
    }

    /// Bytes this record occupies on the wire, including tag and length prefix.
    pub(crate) fn byte_len(&self) -> Result<usize> {
        Ok(HEADER_LEN + self.record_bytes()?.len())
    }
}


/// The ordered records of one extension section.
/// Duplicate tags are allowed; insertion order is preserved
/// because the wire order is significant for round-trips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreCollection {
    list: Vec<Tre>,
}

impl TreCollection {

    /// An empty collection.
    pub fn new() -> Self { Self::default() }

    /// Append a record, keeping it after all previously appended records.
    pub fn push(&mut self, tre: Tre) {
        self.list.push(tre);
    }

    /// Number of records.
    pub fn len(&self) -> usize { self.list.len() }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool { self.list.is_empty() }

    /// All records in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tre> { self.list.iter() }

    /// The first record with the given tag, if any.
    pub fn get(&self, tag: &str) -> Option<&Tre> {
        self.list.iter().find(|tre| tre.tag() == tag)
    }

    /// Remove and return the record at the given position.
    pub fn remove(&mut self, index: usize) -> Tre {
        self.list.remove(index)
    }

    /// Move all records of `other` to the end of this collection.
    pub fn append(&mut self, other: &mut TreCollection) {
        self.list.append(&mut other.list);
    }

    /// Split this collection so that the records remaining in `self`
    /// occupy at most `byte_budget` wire bytes. The split never divides
    /// a record. Returns the overflowing tail.
    pub(crate) fn split_off_over_budget(&mut self, byte_budget: usize) -> Result<TreCollection> {
        let mut used = 0;

        for (index, tre) in self.list.iter().enumerate() {
            used += tre.byte_len()?;

            if used > byte_budget {
                return Ok(TreCollection { list: self.list.split_off(index) });
            }
        }

        Ok(TreCollection::new())
    }

    /// Total wire bytes of all records.
    pub fn byte_len(&self) -> Result<usize> {
        self.list.iter().map(Tre::byte_len).sum()
    }

    /// The serialized wire form of all records, in order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        for tre in &self.list {
            tre.write_to(&mut bytes)?;
        }

        Ok(bytes)
    }

    /// Read consecutive records occupying exactly `byte_len` bytes.
    pub(crate) fn read_stream(read: &mut Tracking<impl Read>, byte_len: usize, warnings: &mut Vec<Warning>) -> Result<Self> {
        let end = read.byte_position() + byte_len as u64;
        let mut list = Vec::new();

        while read.byte_position() < end {
            if end - read.byte_position() < HEADER_LEN as u64 {
                return Err(Error::invalid("extension section too short for another record"));
            }

            list.push(Tre::read_from(read, warnings)?);
        }

        if read.byte_position() != end {
            return Err(Error::invalid("a record extends past its extension section"));
        }

        Ok(TreCollection { list })
    }
}

impl<'c> IntoIterator for &'c TreCollection {
    type Item = &'c Tre;
    type IntoIter = std::slice::Iter<'c, Tre>;
    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl FromIterator<Tre> for TreCollection {
    fn from_iter<I: IntoIterator<Item = Tre>>(iter: I) -> Self {
        TreCollection { list: iter.into_iter().collect() }
    }
}
