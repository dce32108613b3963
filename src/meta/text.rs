
//! The text subheader. The text body itself is segment data.

use crate::error::{Result, UnitResult, Warning};
use crate::io::{Read, Tracking, Write};
use super::image::expect_marker;
use super::{ExtensionSection, Security, read_num, read_str, write_num, write_str};

#[derive(Debug, Clone, PartialEq)]
pub struct TextSubheader {
    pub id: String,
    pub attachment_level: u64,
    pub date_time: String,
    pub title: String,
    pub classification: String,
    pub security: Security,
    pub encrypted: bool,
    pub format: String,
    pub extended: ExtensionSection,
}

impl TextSubheader {

    pub fn new(id: &str) -> Self {
        TextSubheader {
            id: id.to_owned(),
            attachment_level: 0,
            date_time: String::new(),
            title: String::new(),
            classification: "U".to_owned(),
            security: Security::default(),
            encrypted: false,
            format: "STA".to_owned(),
            extended: ExtensionSection::default(),
        }
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        expect_marker(read, b"TE", "text")?;

        Ok(TextSubheader {
            id: read_str(read, 7)?,
            attachment_level: read_num(read, 3)?,
            date_time: read_str(read, 14)?,
            title: read_str(read, 80)?,
            classification: read_str(read, 1)?,
            security: Security::read_from(read)?,
            encrypted: read_num(read, 1)? != 0,
            format: read_str(read, 3)?,
            extended: ExtensionSection::read_from(read, warnings)?,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"TE")?;

        write_str(write, &self.id, 7)?;
        write_num(write, self.attachment_level, 3)?;
        write_str(write, &self.date_time, 14)?;
        write_str(write, &self.title, 80)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;
        write_num(write, u64::from(self.encrypted), 1)?;
        write_str(write, &self.format, 3)?;
        self.extended.write_to(write)?;
        Ok(())
    }
}
