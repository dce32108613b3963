
//! The label subheader. Label segments are a legacy feature;
//! their table is almost always empty in current files, but the
//! list is carried so every segment kind of the container is covered.

use crate::error::{Result, UnitResult, Warning};
use crate::io::{Read, Tracking, Write};
use crate::math::Vec2;
use super::image::{expect_marker, read_location, write_location};
use super::{ExtensionSection, Security, read_num, read_str, write_num, write_str};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelSubheader {
    pub id: String,
    pub classification: String,
    pub security: Security,
    pub encrypted: bool,
    pub font_style: String,
    pub cell_width: u64,
    pub cell_height: u64,
    pub display_level: u64,
    pub attachment_level: u64,
    pub location: Vec2<i64>,
    pub text_color: [u8; 3],
    pub background_color: [u8; 3],
    pub extended: ExtensionSection,
}

impl LabelSubheader {

    pub fn new(id: &str) -> Self {
        LabelSubheader {
            id: id.to_owned(),
            classification: "U".to_owned(),
            security: Security::default(),
            encrypted: false,
            font_style: String::new(),
            cell_width: 0,
            cell_height: 0,
            display_level: 1,
            attachment_level: 0,
            location: Vec2(0, 0),
            text_color: [0, 0, 0],
            background_color: [0, 0, 0],
            extended: ExtensionSection::default(),
        }
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        expect_marker(read, b"LA", "label")?;

        Ok(LabelSubheader {
            id: read_str(read, 10)?,
            classification: read_str(read, 1)?,
            security: Security::read_from(read)?,
            encrypted: read_num(read, 1)? != 0,
            font_style: read_str(read, 1)?,
            cell_width: read_num(read, 2)?,
            cell_height: read_num(read, 2)?,
            display_level: read_num(read, 3)?,
            attachment_level: read_num(read, 3)?,
            location: read_location(read)?,
            text_color: crate::io::read_array::<3>(read)?,
            background_color: crate::io::read_array::<3>(read)?,
            extended: ExtensionSection::read_from(read, warnings)?,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"LA")?;

        write_str(write, &self.id, 10)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;
        write_num(write, u64::from(self.encrypted), 1)?;
        write_str(write, &self.font_style, 1)?;
        write_num(write, self.cell_width, 2)?;
        write_num(write, self.cell_height, 2)?;
        write_num(write, self.display_level, 3)?;
        write_num(write, self.attachment_level, 3)?;
        write_location(write, self.location)?;
        write.write_all(&self.text_color)?;
        write.write_all(&self.background_color)?;
        self.extended.write_to(write)?;
        Ok(())
    }
}
