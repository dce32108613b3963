
//! The declarative micro-language that describes the byte layout
//! of a tagged record extension (TRE).
//!
//! A description is authored as a flat list of [`Descriptor`]s,
//! mirroring how the standard documents the records: field entries
//! interleaved with `LOOP`/`ENDLOOP` and `IF`/`ENDIF` markers.
//! At registration the flat list is compiled into a validated block tree,
//! so every schema-authoring mistake (unmatched markers, forward
//! references, a dangling computed-length marker) is reported once,
//! at registration, and never again while parsing files.

use crate::error::{Error, Result};
use crate::field::FieldKind;

/// How many bytes a field occupies in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {

    /// The field always occupies exactly this many bytes.
    Fixed(usize),

    /// The field occupies as many bytes as the numeric value
    /// of a previously parsed field. A value of zero is valid
    /// and makes the field occupy zero bytes.
    ComputedFrom(String),

    /// The field occupies all bytes up to the declared end of the record.
    /// Only useful for a trailing variable-length payload.
    RestOfRecord,
}

/// Comparison operator of an `IF` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {

    /// The trimmed text value equals the literal.
    Eq,

    /// The trimmed text value does not equal the literal.
    Ne,

    /// The numeric value is greater than the numeric literal.
    Gt,
}

/// One entry of a flat record description.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {

    /// A value field.
    Field {

        /// Wire encoding of the field.
        kind: FieldKind,

        /// Unique short key the field is stored under, like `ENGLN`.
        key: String,

        /// Human readable label, like `Engineering Data Label Length`.
        name: String,

        /// Size of the field.
        length: Length,
    },

    /// Repeat all entries up to the matching `EndLoop` as many times
    /// as the numeric value of the named, previously parsed field.
    /// Zero iterations are valid and occupy zero bytes.
    Loop {
        /// Key of the field holding the iteration count.
        count_key: String,
    },

    /// Closes the innermost open `Loop`.
    EndLoop,

    /// Process the entries up to the matching `EndIf` only when the
    /// predicate holds. An untaken branch occupies zero bytes.
    If {
        /// Key of the previously parsed field to test.
        key: String,

        /// Comparison operator.
        cond: Cond,

        /// Literal to compare against.
        literal: String,
    },

    /// Closes the innermost open `If`.
    EndIf,

    /// Declares that the next field descriptor's length equals the
    /// numeric value of the named field, overriding its declared length.
    CompLen {
        /// Key of the previously parsed field holding the length.
        reference_key: String,
    },

    /// Terminates the description. Must be the last entry.
    End,
}

impl Descriptor {

    /// A space-padded text field of fixed width.
    pub fn bcs_a(key: &str, length: usize, name: &str) -> Self {
        Descriptor::Field {
            kind: FieldKind::BcsA, key: key.into(),
            name: name.into(), length: Length::Fixed(length),
        }
    }

    /// A zero-padded numeric field of fixed width.
    pub fn bcs_n(key: &str, length: usize, name: &str) -> Self {
        Descriptor::Field {
            kind: FieldKind::BcsN, key: key.into(),
            name: name.into(), length: Length::Fixed(length),
        }
    }

    /// A raw byte field of fixed width.
    pub fn binary(key: &str, length: usize, name: &str) -> Self {
        Descriptor::Field {
            kind: FieldKind::Binary, key: key.into(),
            name: name.into(), length: Length::Fixed(length),
        }
    }

    /// A trailing field that consumes the rest of the record.
    pub fn rest_of_record(kind: FieldKind, key: &str, name: &str) -> Self {
        Descriptor::Field {
            kind, key: key.into(),
            name: name.into(), length: Length::RestOfRecord,
        }
    }

    /// Start a repetition counted by a previously declared field.
    pub fn looped(count_key: &str) -> Self {
        Descriptor::Loop { count_key: count_key.into() }
    }

    /// Start a conditional block.
    pub fn when(key: &str, cond: Cond, literal: &str) -> Self {
        Descriptor::If { key: key.into(), cond, literal: literal.into() }
    }

    /// Override the next field's length with a previously declared field's value.
    pub fn computed_length(reference_key: &str) -> Self {
        Descriptor::CompLen { reference_key: reference_key.into() }
    }
}


/// A compiled field entry. The computed-length marker has already
/// been folded into the `length`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledField {
    pub kind: FieldKind,
    pub key: String,
    pub name: String,
    pub length: Length,
}

/// A node of the compiled block tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Field(CompiledField),

    Loop {
        count_key: String,
        body: Vec<Item>,
    },

    If {
        key: String,
        cond: Cond,
        literal: String,
        body: Vec<Item>,
    },
}

/// An immutable, validated record description.
/// Registered once per tag; see [`crate::tre::registry`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreDescription {
    pub(crate) items: Vec<Item>,
}

impl TreDescription {

    /// Compile and validate a flat descriptor list.
    /// All schema-authoring mistakes are reported here, never at parse time.
    pub fn compile(descriptors: &[Descriptor]) -> Result<Self> {
        let mut compiler = Compiler {
            descriptors,
            index: 0,
            declared_keys: Vec::new(),
        };

        let items = compiler.block(BlockEnd::End)?;

        if compiler.index != descriptors.len() {
            return Err(Error::schema("trailing descriptors after the END marker"));
        }

        Ok(TreDescription { items })
    }
}

/// What terminates the block currently being compiled.
#[derive(PartialEq, Clone, Copy)]
enum BlockEnd { End, EndLoop, EndIf }

struct Compiler<'d> {
    descriptors: &'d [Descriptor],
    index: usize,

    /// Keys of all fields declared so far, for forward-reference checks.
    declared_keys: Vec<&'d str>,
}

impl<'d> Compiler<'d> {

    fn block(&mut self, until: BlockEnd) -> Result<Vec<Item>> {
        let mut items = Vec::new();

        loop {
            let descriptor = self.descriptors.get(self.index)
                .ok_or_else(|| Error::schema(match until {
                    BlockEnd::End => "missing END marker",
                    BlockEnd::EndLoop => "LOOP without matching ENDLOOP",
                    BlockEnd::EndIf => "IF without matching ENDIF",
                }))?;

            self.index += 1;

            match descriptor {
                Descriptor::End if until == BlockEnd::End => return Ok(items),
                Descriptor::EndLoop if until == BlockEnd::EndLoop => return Ok(items),
                Descriptor::EndIf if until == BlockEnd::EndIf => return Ok(items),

                Descriptor::End => return Err(Error::schema("END inside an unclosed block")),
                Descriptor::EndLoop => return Err(Error::schema("ENDLOOP without matching LOOP")),
                Descriptor::EndIf => return Err(Error::schema("ENDIF without matching IF")),

                Descriptor::Field { kind, key, name, length } => {
                    self.check_reference(length)?;
                    self.declared_keys.push(key);

                    items.push(Item::Field(CompiledField {
                        kind: *kind, key: key.clone(),
                        name: name.clone(), length: length.clone(),
                    }));
                },

                Descriptor::Loop { count_key } => {
                    self.check_declared(count_key)?;
                    let body = self.block(BlockEnd::EndLoop)?;
                    items.push(Item::Loop { count_key: count_key.clone(), body });
                },

                Descriptor::If { key, cond, literal } => {
                    self.check_declared(key)?;
                    let body = self.block(BlockEnd::EndIf)?;
                    items.push(Item::If {
                        key: key.clone(), cond: *cond,
                        literal: literal.clone(), body,
                    });
                },

                Descriptor::CompLen { reference_key } => {
                    self.check_declared(reference_key)?;

                    // fold into the following field descriptor
                    match self.descriptors.get(self.index) {
                        Some(Descriptor::Field { kind, key, name, .. }) => {
                            self.index += 1;
                            self.declared_keys.push(key);

                            items.push(Item::Field(CompiledField {
                                kind: *kind, key: key.clone(), name: name.clone(),
                                length: Length::ComputedFrom(reference_key.clone()),
                            }));
                        },

                        _ => return Err(Error::schema(
                            "computed-length marker must be followed by a field descriptor"
                        )),
                    }
                },
            }
        }
    }

    fn check_reference(&self, length: &Length) -> Result<()> {
        if let Length::ComputedFrom(key) = length {
            self.check_declared(key)?;
        }

        Ok(())
    }

    /// Descriptor order must place a referenced field before its reference.
    fn check_declared(&self, key: &str) -> Result<()> {
        if self.declared_keys.iter().any(|declared| *declared == key) { Ok(()) }
        else { Err(Error::schema(format!("forward or unknown field reference `{}`", key))) }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unmatched_blocks_fail_at_compile_time() {
        assert!(TreDescription::compile(&[
            Descriptor::bcs_n("COUNT", 3, "Count"),
            Descriptor::looped("COUNT"),
            Descriptor::End,
        ]).is_err());

        assert!(TreDescription::compile(&[
            Descriptor::EndIf,
            Descriptor::End,
        ]).is_err());

        assert!(TreDescription::compile(&[
            Descriptor::bcs_a("A", 1, "A"),
        ]).is_err()); // missing END
    }

    #[test]
    fn forward_references_fail_at_compile_time() {
        assert!(TreDescription::compile(&[
            Descriptor::looped("COUNT"),
            Descriptor::bcs_n("COUNT", 3, "Count"),
            Descriptor::EndLoop,
            Descriptor::End,
        ]).is_err());

        assert!(TreDescription::compile(&[
            Descriptor::computed_length("LEN"),
            Descriptor::bcs_a("DATA", 0, "Data"),
            Descriptor::bcs_n("LEN", 3, "Length"),
            Descriptor::End,
        ]).is_err());
    }

    #[test]
    fn dangling_computed_length_fails() {
        assert!(TreDescription::compile(&[
            Descriptor::bcs_n("LEN", 3, "Length"),
            Descriptor::computed_length("LEN"),
            Descriptor::End,
        ]).is_err());
    }

    #[test]
    fn nested_blocks_compile() {
        let description = TreDescription::compile(&[
            Descriptor::bcs_n("OUTER", 2, "Outer Count"),
            Descriptor::looped("OUTER"),
                Descriptor::bcs_n("INNER", 2, "Inner Count"),
                Descriptor::looped("INNER"),
                    Descriptor::bcs_a("NAME", 4, "Name"),
                Descriptor::EndLoop,
                Descriptor::when("INNER", Cond::Gt, "5"),
                    Descriptor::bcs_a("NOTE", 8, "Note"),
                Descriptor::EndIf,
            Descriptor::EndLoop,
            Descriptor::End,
        ]).unwrap();

        assert_eq!(description.items.len(), 2);
    }
}
