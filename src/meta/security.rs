
//! The security group shared by the file header and every subheader kind.

use crate::error::{Result, UnitResult};
use crate::io::{Read, Tracking, Write};
use super::{read_str, write_str};

/// The fifteen security fields that follow the 1-byte classification
/// in the file header and in every subheader. All fields are plain
/// space-padded text; this crate stores and emits them without
/// interpreting their contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Security {
    pub classification_system: String,
    pub codewords: String,
    pub control_and_handling: String,
    pub releasing_instructions: String,
    pub declassification_type: String,
    pub declassification_date: String,
    pub declassification_exemption: String,
    pub downgrade: String,
    pub downgrade_date: String,
    pub classification_text: String,
    pub classification_authority_type: String,
    pub classification_authority: String,
    pub classification_reason: String,
    pub security_source_date: String,
    pub control_number: String,
}

impl Security {

    /// Wire width of the whole group.
    pub const BYTE_LEN: usize = 166;

    pub(crate) fn read_from(read: &mut Tracking<impl Read>) -> Result<Self> {
        Ok(Security {
            classification_system: read_str(read, 2)?,
            codewords: read_str(read, 11)?,
            control_and_handling: read_str(read, 2)?,
            releasing_instructions: read_str(read, 20)?,
            declassification_type: read_str(read, 2)?,
            declassification_date: read_str(read, 8)?,
            declassification_exemption: read_str(read, 4)?,
            downgrade: read_str(read, 1)?,
            downgrade_date: read_str(read, 8)?,
            classification_text: read_str(read, 43)?,
            classification_authority_type: read_str(read, 1)?,
            classification_authority: read_str(read, 40)?,
            classification_reason: read_str(read, 1)?,
            security_source_date: read_str(read, 8)?,
            control_number: read_str(read, 15)?,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write_str(write, &self.classification_system, 2)?;
        write_str(write, &self.codewords, 11)?;
        write_str(write, &self.control_and_handling, 2)?;
        write_str(write, &self.releasing_instructions, 20)?;
        write_str(write, &self.declassification_type, 2)?;
        write_str(write, &self.declassification_date, 8)?;
        write_str(write, &self.declassification_exemption, 4)?;
        write_str(write, &self.downgrade, 1)?;
        write_str(write, &self.downgrade_date, 8)?;
        write_str(write, &self.classification_text, 43)?;
        write_str(write, &self.classification_authority_type, 1)?;
        write_str(write, &self.classification_authority, 40)?;
        write_str(write, &self.classification_reason, 1)?;
        write_str(write, &self.security_source_date, 8)?;
        write_str(write, &self.control_number, 15)?;
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn blank_group_occupies_its_declared_width() {
        let mut bytes = Vec::new();
        Security::default().write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), Security::BYTE_LEN);
        assert!(bytes.iter().all(|&byte| byte == b' '));
    }

    #[test]
    fn round_trip() {
        let group = Security {
            classification_system: "US".to_owned(),
            releasing_instructions: "NOFORN".to_owned(),
            classification_authority: "SOME AUTHORITY".to_owned(),
            control_number: "123".to_owned(),
            .. Security::default()
        };

        let mut bytes = Vec::new();
        group.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), Security::BYTE_LEN);

        let mut read = Tracking::new(Cursor::new(bytes));
        assert_eq!(Security::read_from(&mut read).unwrap(), group);
    }
}
