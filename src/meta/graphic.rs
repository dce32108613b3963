
//! The graphic subheader. The graphic data itself (CGM bytes)
//! is opaque to this crate.

use crate::error::{Result, UnitResult, Warning};
use crate::io::{Read, Tracking, Write};
use crate::math::Vec2;
use super::image::{expect_marker, read_location, write_location};
use super::{ExtensionSection, Security, read_num, read_str, write_num, write_str};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicSubheader {
    pub id: String,
    pub name: String,
    pub classification: String,
    pub security: Security,
    pub encrypted: bool,
    pub format: String,
    pub display_level: u64,
    pub attachment_level: u64,
    pub location: Vec2<i64>,

    /// Upper left and lower right corner of the graphic's
    /// bounding box, relative to its attachment point.
    pub first_bound: Vec2<i64>,
    pub second_bound: Vec2<i64>,

    pub color: String,
    pub extended: ExtensionSection,
}

impl GraphicSubheader {

    pub fn new(id: &str) -> Self {
        GraphicSubheader {
            id: id.to_owned(),
            name: String::new(),
            classification: "U".to_owned(),
            security: Security::default(),
            encrypted: false,
            format: "C".to_owned(),
            display_level: 1,
            attachment_level: 0,
            location: Vec2(0, 0),
            first_bound: Vec2(0, 0),
            second_bound: Vec2(0, 0),
            color: "M".to_owned(),
            extended: ExtensionSection::default(),
        }
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        expect_marker(read, b"SY", "graphic")?;

        let id = read_str(read, 10)?;
        let name = read_str(read, 20)?;
        let classification = read_str(read, 1)?;
        let security = Security::read_from(read)?;
        let encrypted = read_num(read, 1)? != 0;
        let format = read_str(read, 1)?;

        let _structure = read_num(read, 13)?; // reserved, always zero

        let display_level = read_num(read, 3)?;
        let attachment_level = read_num(read, 3)?;
        let location = read_location(read)?;
        let first_bound = read_location(read)?;
        let color = read_str(read, 1)?;
        let second_bound = read_location(read)?;

        let _reserved = read_num(read, 2)?;

        let extended = ExtensionSection::read_from(read, warnings)?;

        Ok(GraphicSubheader {
            id, name, classification, security, encrypted, format,
            display_level, attachment_level,
            location, first_bound, color, second_bound,
            extended,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"SY")?;

        write_str(write, &self.id, 10)?;
        write_str(write, &self.name, 20)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;
        write_num(write, u64::from(self.encrypted), 1)?;
        write_str(write, &self.format, 1)?;

        write_num(write, 0, 13)?;

        write_num(write, self.display_level, 3)?;
        write_num(write, self.attachment_level, 3)?;
        write_location(write, self.location)?;
        write_location(write, self.first_bound)?;
        write_str(write, &self.color, 1)?;
        write_location(write, self.second_bound)?;

        write_num(write, 0, 2)?;

        self.extended.write_to(write)?;
        Ok(())
    }
}
