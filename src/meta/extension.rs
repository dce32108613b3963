
//! Data extension and reserved extension subheaders.
//!
//! Data extension segments carry arbitrary payloads; the one kind this
//! crate interprets is `TRE_OVERFLOW`, which stores tagged records that
//! did not fit into their original extension section.

use crate::error::{Error, Result, UnitResult};
use crate::io::{Read, Tracking, Write};
use super::image::expect_marker;
use super::{Security, read_num, read_str, write_num, write_str};

/// The type identifier of overflow data extension segments.
pub const TRE_OVERFLOW: &str = "TRE_OVERFLOW";

/// The extension section names an overflow segment can point back to:
/// the two header sections and the per-segment sections.
pub(crate) const OVERFLOW_SECTIONS: &[&str] = &["UDHD", "XHD", "UDID", "IXSHD", "SXSHD", "TXSHD"];

/// Where the records of a `TRE_OVERFLOW` segment originally lived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowTarget {

    /// The section name (`UDHD`, `XHD`, `UDID`, `IXSHD`, `SXSHD` or `TXSHD`).
    pub section: String,

    /// The 1-based segment number the section belongs to,
    /// or zero for the two file header sections.
    pub segment: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataExtensionSubheader {
    pub type_id: String,
    pub version: u64,
    pub classification: String,
    pub security: Security,

    /// Present exactly when the type is [`TRE_OVERFLOW`].
    pub overflow: Option<OverflowTarget>,

    /// Uninterpreted user-defined subheader bytes.
    pub subheader_data: Vec<u8>,
}

impl DataExtensionSubheader {

    pub fn new(type_id: &str) -> Self {
        DataExtensionSubheader {
            type_id: type_id.to_owned(),
            version: 1,
            classification: "U".to_owned(),
            security: Security::default(),
            overflow: None,
            subheader_data: Vec::new(),
        }
    }

    /// Whether this segment stores overflowed tagged records.
    pub fn is_overflow(&self) -> bool {
        self.type_id == TRE_OVERFLOW
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>) -> Result<Self> {
        expect_marker(read, b"DE", "data extension")?;

        let type_id = read_str(read, 25)?;
        let version = read_num(read, 2)?;
        let classification = read_str(read, 1)?;
        let security = Security::read_from(read)?;

        let overflow = if type_id == TRE_OVERFLOW {
            let target = OverflowTarget {
                section: read_str(read, 6)?,
                segment: read_num(read, 3)?,
            };

            if !OVERFLOW_SECTIONS.contains(&target.section.as_str()) {
                return Err(Error::invalid("overflow segment points to an unknown section"));
            }

            Some(target)
        }
        else { None };

        let data_length = read_num(read, 4)?;
        let subheader_data = crate::io::read_bytes(read, data_length as usize)?;

        Ok(DataExtensionSubheader {
            type_id, version, classification, security,
            overflow, subheader_data,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"DE")?;

        write_str(write, &self.type_id, 25)?;
        write_num(write, self.version, 2)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;

        match (&self.overflow, self.is_overflow()) {
            (Some(target), true) => {
                write_str(write, &target.section, 6)?;
                write_num(write, target.segment, 3)?;
            },

            (None, false) => {},
            _ => return Err(Error::invalid("the overflow target is present exactly on overflow segments")),
        }

        write_num(write, self.subheader_data.len() as u64, 4)
            .map_err(|_| Error::invalid("user-defined subheader data too long for its length field"))?;

        write.write_all(&self.subheader_data)?;
        Ok(())
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct ReservedExtensionSubheader {
    pub type_id: String,
    pub version: u64,
    pub classification: String,
    pub security: Security,

    /// Uninterpreted user-defined subheader bytes.
    pub subheader_data: Vec<u8>,
}

impl ReservedExtensionSubheader {

    pub fn new(type_id: &str) -> Self {
        ReservedExtensionSubheader {
            type_id: type_id.to_owned(),
            version: 1,
            classification: "U".to_owned(),
            security: Security::default(),
            subheader_data: Vec::new(),
        }
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>) -> Result<Self> {
        expect_marker(read, b"RE", "reserved extension")?;

        let type_id = read_str(read, 25)?;
        let version = read_num(read, 2)?;
        let classification = read_str(read, 1)?;
        let security = Security::read_from(read)?;

        let data_length = read_num(read, 4)?;
        let subheader_data = crate::io::read_bytes(read, data_length as usize)?;

        Ok(ReservedExtensionSubheader { type_id, version, classification, security, subheader_data })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"RE")?;

        write_str(write, &self.type_id, 25)?;
        write_num(write, self.version, 2)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;

        write_num(write, self.subheader_data.len() as u64, 4)
            .map_err(|_| Error::invalid("user-defined subheader data too long for its length field"))?;

        write.write_all(&self.subheader_data)?;
        Ok(())
    }
}
