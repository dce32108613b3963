
//! Walks a compiled record description against a byte cursor (parsing)
//! or against a field map (serializing).
//!
//! Both directions perform the same recursive walk over the block tree.
//! Data problems while parsing are never fatal: they are recorded as
//! [`Warning`]s and the record keeps every field parsed before the problem,
//! so one malformed record cannot abort a whole file parse.

use indexmap::IndexMap;

use crate::error::{Error, Result, Warning};
use crate::field::{Field, FieldKind};
use super::describe::{Cond, CompiledField, Item, Length, TreDescription};

/// The parsed fields of one record, in insertion order.
/// Fields inside loops carry a per-iteration suffix, like `ENGLN[0]`.
pub type FieldMap = IndexMap<String, Field>;

/// The outcome of parsing one record.
/// Holds whatever fields could be decoded, even if a warning cut the walk short.
#[derive(Debug)]
pub struct Parsed {

    /// All decoded fields in insertion order.
    pub fields: FieldMap,

    /// How many of the record's bytes were attributed to fields.
    pub consumed: usize,

    /// Every recoverable problem encountered, possibly none.
    pub warnings: Vec<Warning>,
}


/// Decode `bytes` (one record body of exactly the declared record length)
/// according to the description. `base_offset` is the file position of
/// `bytes[0]`, used to report warning positions in file coordinates.
pub fn parse(description: &TreDescription, bytes: &[u8], base_offset: u64) -> Parsed {
    let mut parser = Parser {
        bytes,
        offset: 0,
        base_offset,
        fields: FieldMap::new(),
        warnings: Vec::new(),
        indices: Vec::new(),
    };

    // a `Halt` has already recorded its warning; the partial fields survive
    let _ = parser.walk(&description.items);

    if parser.offset != bytes.len() {
        parser.warnings.push(Warning::new(
            "*", // the record as a whole, not one field
            format!("record declares {} bytes but its fields occupy {}", bytes.len(), parser.offset),
            base_offset + parser.offset as u64,
        ));
    }

    Parsed {
        fields: parser.fields,
        consumed: parser.offset,
        warnings: parser.warnings,
    }
}

/// Encode the field map according to the description.
/// Missing scalar fields are emitted as default padding
/// (spaces for text, zero digits for numbers), tolerating
/// partially populated records. Fields shorter than their declared
/// width are re-padded; longer ones are a usage error.
pub fn serialize(description: &TreDescription, fields: &FieldMap) -> Result<Vec<u8>> {
    let mut serializer = Serializer {
        fields,
        bytes: Vec::new(),
        indices: Vec::new(),
    };

    serializer.walk(&description.items)?;
    Ok(serializer.bytes)
}


/// Lookup of a referenced key must see loop-local fields of the current
/// iteration: try the bare key first, then qualify it with the current
/// iteration indices from the outermost loop inwards.
fn resolve<'m>(fields: &'m FieldMap, key: &str, indices: &[usize]) -> Option<(&'m Field, String)> {
    let mut qualified = key.to_owned();
    if let Some(field) = fields.get(&qualified) {
        return Some((field, qualified));
    }

    for index in indices {
        qualified.push_str(&format!("[{}]", index));
        if let Some(field) = fields.get(&qualified) {
            return Some((field, qualified));
        }
    }

    None
}

/// The key a field is inserted under, qualified by the current iteration indices.
fn qualified_key(key: &str, indices: &[usize]) -> String {
    let mut qualified = key.to_owned();
    for index in indices {
        qualified.push_str(&format!("[{}]", index));
    }

    qualified
}

fn evaluate(field: &Field, cond: Cond, literal: &str) -> Result<bool> {
    Ok(match cond {
        Cond::Eq => field.as_str()? == literal,
        Cond::Ne => field.as_str()? != literal,
        Cond::Gt => {
            let literal = literal.trim().parse::<i64>()
                .map_err(|_| Error::schema("non-numeric literal in numeric comparison"))?;

            field.as_i64()? > literal
        },
    })
}


/// Unwinds the parse walk after a warning has been recorded.
struct Halt;

struct Parser<'b> {
    bytes: &'b [u8],
    offset: usize,
    base_offset: u64,
    fields: FieldMap,
    warnings: Vec<Warning>,
    indices: Vec<usize>,
}

impl Parser<'_> {

    fn walk(&mut self, items: &[Item]) -> std::result::Result<(), Halt> {
        for item in items {
            match item {
                Item::Field(field) => self.read_field(field)?,

                Item::Loop { count_key, body } => {
                    let count = self.lookup_int(count_key)?;

                    for index in 0 .. count {
                        self.indices.push(index as usize);
                        let result = self.walk(body);
                        self.indices.pop();
                        result?;
                    }
                },

                Item::If { key, cond, literal, body } => {
                    let field = self.lookup(key)?;
                    let taken = evaluate(field, *cond, literal)
                        .map_err(|error| self.warn(key, format!("unusable condition field: {}", error)))?;

                    if taken {
                        self.walk(body)?;
                    }
                },
            }
        }

        Ok(())
    }

    fn read_field(&mut self, field: &CompiledField) -> std::result::Result<(), Halt> {
        let length = match &field.length {
            Length::Fixed(length) => *length,

            Length::ComputedFrom(reference) => {
                let value = self.lookup_int(reference)?;

                usize::try_from(value).ok()
                    .filter(|length| self.offset + length <= self.bytes.len())
                    .ok_or_else(|| self.warn(
                        &field.key,
                        format!("computed length {} exceeds the record", value)
                    ))?
            },

            Length::RestOfRecord => self.bytes.len() - self.offset,
        };

        if self.offset + length > self.bytes.len() {
            return Err(self.warn(&field.key, "field extends past the end of the record"));
        }

        let raw = self.bytes[self.offset .. self.offset + length].to_vec();
        self.offset += length;

        self.fields.insert(
            qualified_key(&field.key, &self.indices),
            Field::from_raw(field.kind, raw),
        );

        Ok(())
    }

    fn lookup(&mut self, key: &str) -> std::result::Result<&Field, Halt> {
        match resolve(&self.fields, key, &self.indices) {
            Some((_, qualified)) => {
                // reborrow to end the map borrow before mutating warnings
                Ok(self.fields.get(&qualified).expect("field was just resolved"))
            },

            None => Err(self.warn(key, "referenced field was never parsed")),
        }
    }

    fn lookup_int(&mut self, key: &str) -> std::result::Result<u64, Halt> {
        let value = {
            let field = self.lookup(key)?;
            field.as_u64()
        };

        value.map_err(|error| self.warn(key, format!("unusable numeric field: {}", error)))
    }

    #[must_use]
    fn warn(&mut self, field: &str, message: impl Into<std::borrow::Cow<'static, str>>) -> Halt {
        self.warnings.push(Warning::new(
            field, message,
            self.base_offset + self.offset as u64,
        ));

        Halt
    }
}


struct Serializer<'m> {
    fields: &'m FieldMap,
    bytes: Vec<u8>,
    indices: Vec<usize>,
}

impl Serializer<'_> {

    fn walk(&mut self, items: &[Item]) -> Result<()> {
        for item in items {
            match item {
                Item::Field(field) => self.write_field(field)?,

                Item::Loop { count_key, body } => {
                    // a missing count serializes as all zero digits, so iterate zero times
                    let count = match resolve(self.fields, count_key, &self.indices) {
                        Some((field, _)) => field.as_u64()?,
                        None => 0,
                    };

                    for index in 0 .. count {
                        self.indices.push(index as usize);
                        let result = self.walk(body);
                        self.indices.pop();
                        result?;
                    }
                },

                Item::If { key, cond, literal, body } => {
                    // an absent predicate field means the optional block is absent
                    let taken = match resolve(self.fields, key, &self.indices) {
                        Some((field, _)) => evaluate(field, *cond, literal)?,
                        None => false,
                    };

                    if taken {
                        self.walk(body)?;
                    }
                },
            }
        }

        Ok(())
    }

    fn write_field(&mut self, field: &CompiledField) -> Result<()> {
        let stored = resolve(self.fields, &field.key, &self.indices)
            .map(|(stored, _)| stored);

        let length = match &field.length {
            Length::Fixed(length) => Some(*length),

            Length::ComputedFrom(reference) => {
                let value = match resolve(self.fields, reference, &self.indices) {
                    Some((reference, _)) => reference.as_u64()?,
                    None => 0,
                };

                Some(crate::error::u64_to_usize(value))
            },

            // trailing payloads occupy exactly what the caller stored
            Length::RestOfRecord => stored.map(Field::len),
        };

        match (stored, length) {
            (Some(stored), Some(length)) => {
                let padded = stored.padded_to(length)
                    .map_err(|_| Error::invalid(format!(
                        "value of field `{}` is longer than its declared length {}",
                        field.key, length
                    )))?;

                self.bytes.extend_from_slice(padded.raw_bytes());
            },

            // fill missing scalars with the kind's default padding
            (None, Some(length)) => {
                self.bytes.extend_from_slice(Field::blank(field.kind, length).raw_bytes());
            },

            // a missing trailing payload occupies zero bytes
            (_, None) => {},
        }

        Ok(())
    }
}
