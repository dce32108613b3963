
//! A single typed, fixed-width value inside a header, subheader, or tagged record.
//!
//! The wire encoding distinguishes space-padded text (`BCS_A`),
//! zero-padded numeric text (`BCS_N`), and raw bytes (`BINARY`).
//! All accessors are pure functions of the raw bytes; mutation only
//! happens through setters that re-pad and re-validate.

use crate::error::{Error, Result, UnitResult};
use crate::io::{Read, Write};

/// The wire encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {

    /// Basic character set alphanumeric. Right-padded with spaces.
    BcsA,

    /// Basic character set numeric digits with optional leading sign.
    /// Left-padded with zeros, sign retained in the leftmost byte.
    BcsN,

    /// Raw bytes, stored and emitted without interpretation.
    Binary,
}

/// A single fixed-width value.
/// Always holds exactly `declared_length` raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    kind: FieldKind,
    raw: Vec<u8>,
}

impl Field {

    /// A field of the given width, filled with the kind's default padding
    /// (spaces for text, zero digits for numbers, zero bytes for binary).
    pub fn blank(kind: FieldKind, length: usize) -> Self {
        let fill = match kind {
            FieldKind::BcsA => b' ',
            FieldKind::BcsN => b'0',
            FieldKind::Binary => 0,
        };

        Field { kind, raw: vec![fill; length] }
    }

    /// Take ownership of already correctly sized raw bytes.
    pub fn from_raw(kind: FieldKind, raw: Vec<u8>) -> Self {
        Field { kind, raw }
    }

    /// A text field holding the given value, space-padded to `length`.
    pub fn bcs_a(value: &str, length: usize) -> Result<Self> {
        let mut field = Field::blank(FieldKind::BcsA, length);
        field.set_str(value)?;
        Ok(field)
    }

    /// A numeric field holding the given value, zero-padded to `length`.
    pub fn bcs_n(value: i64, length: usize) -> Result<Self> {
        let mut field = Field::blank(FieldKind::BcsN, length);
        field.set_int(value)?;
        Ok(field)
    }

    /// The wire encoding of this field.
    pub fn kind(&self) -> FieldKind { self.kind }

    /// The exact bytes that appear in the file.
    pub fn raw_bytes(&self) -> &[u8] { &self.raw }

    /// The fixed width of this field in bytes.
    pub fn len(&self) -> usize { self.raw.len() }

    /// Whether this field occupies zero bytes
    /// (possible for computed-length record fields).
    pub fn is_empty(&self) -> bool { self.raw.is_empty() }

    /// The value with padding removed: trailing spaces for text fields,
    /// all-surrounding whitespace for numeric fields.
    /// Fails for fields that are not valid ASCII.
    pub fn as_str(&self) -> Result<&str> {
        let text = std::str::from_utf8(&self.raw)
            .map_err(|_| Error::invalid("non-ascii bytes in text field"))?;

        Ok(match self.kind {
            FieldKind::BcsA => text.trim_end_matches(' '),
            _ => text.trim_matches(' '),
        })
    }

    /// The numeric value of this field.
    /// Fails explicitly on unparsable digits and on overflow, never clamps.
    pub fn as_i64(&self) -> Result<i64> {
        let text = self.as_str()?;
        let text = text.trim_start_matches('+');
        text.parse::<i64>().map_err(|_| Error::invalid("unparsable or overflowing numeric field"))
    }

    /// The numeric value of this field, rejecting negative values.
    pub fn as_u64(&self) -> Result<u64> {
        let value = self.as_i64()?;
        crate::error::i64_to_u64(value, "negative value in unsigned numeric field")
    }

    /// The numeric value of this field as a float.
    pub fn as_f64(&self) -> Result<f64> {
        let text = self.as_str()?;
        text.trim().parse::<f64>().map_err(|_| Error::invalid("unparsable real-valued field"))
    }

    /// Store a text value, padding to the declared width.
    /// Fails if the value is longer than the field.
    /// Numeric fields are zero-padded on the left,
    /// text fields space-padded on the right.
    pub fn set_str(&mut self, value: &str) -> UnitResult {
        if self.kind == FieldKind::Binary {
            return Err(Error::invalid("cannot store a string in a binary field"));
        }

        if value.len() > self.raw.len() {
            return Err(Error::invalid("value is too long for the field"));
        }

        if !value.bytes().all(|byte| (0x20..=0x7e).contains(&byte)) {
            return Err(Error::invalid("value contains non-printable characters"));
        }

        match self.kind {
            FieldKind::BcsA => self.fill_spaces(value.as_bytes()),
            FieldKind::BcsN => self.fill_zeros(value.as_bytes()),
            FieldKind::Binary => unreachable!(),
        }

        Ok(())
    }

    /// Store an integer value, left-padding with zero digits
    /// and keeping the sign in the leftmost byte.
    pub fn set_int(&mut self, value: i64) -> UnitResult {
        if self.kind == FieldKind::Binary {
            return Err(Error::invalid("cannot store a number in a binary field"));
        }

        let digits = value.to_string();
        if digits.len() > self.raw.len() {
            return Err(Error::invalid("number does not fit into the field"));
        }

        match self.kind {
            FieldKind::BcsN => self.fill_zeros(digits.as_bytes()),
            FieldKind::BcsA => self.fill_spaces(digits.as_bytes()),
            FieldKind::Binary => unreachable!(),
        }

        Ok(())
    }

    /// Replace the raw bytes. The length must match the declared width.
    pub fn set_raw(&mut self, bytes: &[u8]) -> UnitResult {
        if bytes.len() != self.raw.len() {
            return Err(Error::invalid("raw value length does not match the field width"));
        }

        self.raw.copy_from_slice(bytes);
        Ok(())
    }

    fn fill_spaces(&mut self, value: &[u8]) {
        self.raw[.. value.len()].copy_from_slice(value);
        self.raw[value.len() ..].fill(b' ');
    }

    /// Zeros are added to the left. A leading sign moves
    /// to the very front of the field, ahead of the padding.
    fn fill_zeros(&mut self, value: &[u8]) {
        let zeros = self.raw.len() - value.len();
        self.raw[.. zeros].fill(b'0');
        self.raw[zeros ..].copy_from_slice(value);

        if zeros != 0 && (value.first() == Some(&b'+') || value.first() == Some(&b'-')) {
            self.raw[0] = value[0];
            self.raw[zeros] = b'0';
        }
    }

    /// A copy of this field, padded to the target width according to its kind.
    /// Fails if the stored value is longer than the target width.
    pub(crate) fn padded_to(&self, length: usize) -> Result<Field> {
        if self.raw.len() == length {
            return Ok(self.clone());
        }

        if self.raw.len() > length {
            return Err(Error::invalid("field is longer than its declared length"));
        }

        let mut padded = Field::blank(self.kind, length);
        match self.kind {
            FieldKind::BcsA | FieldKind::Binary =>
                padded.raw[.. self.raw.len()].copy_from_slice(&self.raw),

            FieldKind::BcsN => {
                let raw = self.raw.clone();
                padded.fill_zeros(&raw);
            },
        }

        Ok(padded)
    }

    /// Read the declared number of bytes from the stream.
    pub fn read_from(read: &mut impl Read, kind: FieldKind, length: usize) -> Result<Self> {
        Ok(Field { kind, raw: crate::io::read_bytes(read, length)? })
    }

    /// Write the exact raw bytes to the stream.
    pub fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(&self.raw)?;
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn text_fields_pad_right_with_spaces() {
        let field = Field::bcs_a("ABC", 6).unwrap();
        assert_eq!(field.raw_bytes(), b"ABC   ");
        assert_eq!(field.as_str().unwrap(), "ABC");
    }

    #[test]
    fn numeric_fields_pad_left_with_zeros() {
        let field = Field::bcs_n(42, 5).unwrap();
        assert_eq!(field.raw_bytes(), b"00042");
        assert_eq!(field.as_u64().unwrap(), 42);
    }

    #[test]
    fn sign_is_retained_ahead_of_padding() {
        let field = Field::bcs_n(-42, 5).unwrap();
        assert_eq!(field.raw_bytes(), b"-0042");
        assert_eq!(field.as_i64().unwrap(), -42);
    }

    #[test]
    fn too_long_values_are_rejected() {
        assert!(Field::bcs_a("ABCDEFG", 3).is_err());
        assert!(Field::bcs_n(12345, 3).is_err());
    }

    #[test]
    fn overflow_fails_instead_of_clamping() {
        let mut field = Field::blank(FieldKind::BcsN, 20);
        field.set_str("99999999999999999999").unwrap();
        assert!(field.as_i64().is_err());
    }

    #[test]
    fn setters_revalidate() {
        let mut field = Field::blank(FieldKind::BcsA, 4);
        assert!(field.set_str("a\nb").is_err());

        let mut binary = Field::blank(FieldKind::Binary, 2);
        assert!(binary.set_str("ab").is_err());
        assert!(binary.set_raw(&[1, 2, 3]).is_err());
        binary.set_raw(&[1, 2]).unwrap();
        assert_eq!(binary.raw_bytes(), &[1, 2]);
    }
}
