
//! The image subheader: pixel structure, band structure, and the
//! blocking geometry that the block module interprets.

use crate::compression::Compression;
use crate::error::{Error, Result, UnitResult, Warning};
use crate::io::{Read, Tracking, Write};
use crate::math::Vec2;
use super::{ExtensionSection, Security, read_num, read_str, write_num, write_str};

/// The band interleaving of stored image blocks (the `IMODE` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {

    /// `B`: within a block, each band is a contiguous plane.
    BlockInterleaved,

    /// `P`: all band samples of one pixel are adjacent.
    PixelInterleaved,

    /// `R`: bands interleave per row.
    RowInterleaved,

    /// `S`: each band is stored as its own full sequence of blocks.
    BandSequential,
}

impl ImageMode {

    pub(crate) fn from_code(code: &str) -> Result<Self> {
        match code {
            "B" => Ok(ImageMode::BlockInterleaved),
            "P" => Ok(ImageMode::PixelInterleaved),
            "R" => Ok(ImageMode::RowInterleaved),
            "S" => Ok(ImageMode::BandSequential),
            _ => Err(Error::invalid("not a recognized image mode")),
        }
    }

    pub(crate) fn code(self) -> &'static str {
        match self {
            ImageMode::BlockInterleaved => "B",
            ImageMode::PixelInterleaved => "P",
            ImageMode::RowInterleaved => "R",
            ImageMode::BandSequential => "S",
        }
    }
}


/// The geographic reference of an image, present
/// only when the `ICORDS` field is not blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geolocation {

    /// The one-character coordinate system code (`ICORDS`).
    pub system: String,

    /// The four corner coordinates in that system, uninterpreted (`IGEOLO`).
    pub corners: String,
}

/// Per-band structure (`IREPBAND` through the lookup tables).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandInfo {
    pub representation: String,
    pub subcategory: String,
    pub filter_condition: String,
    pub filter_code: String,

    /// Zero or more lookup tables, all of the same length.
    pub lookup_tables: Vec<Vec<u8>>,
}

impl BandInfo {

    fn read_from(read: &mut Tracking<impl Read>) -> Result<Self> {
        let representation = read_str(read, 2)?;
        let subcategory = read_str(read, 6)?;
        let filter_condition = read_str(read, 1)?;
        let filter_code = read_str(read, 3)?;

        let table_count = read_num(read, 1)?;
        let mut lookup_tables = Vec::with_capacity(table_count as usize);

        if table_count != 0 {
            let entry_count = read_num(read, 5)?;
            for _ in 0 .. table_count {
                lookup_tables.push(crate::io::read_bytes(read, entry_count as usize)?);
            }
        }

        Ok(BandInfo { representation, subcategory, filter_condition, filter_code, lookup_tables })
    }

    fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write_str(write, &self.representation, 2)?;
        write_str(write, &self.subcategory, 6)?;
        write_str(write, &self.filter_condition, 1)?;
        write_str(write, &self.filter_code, 3)?;

        write_num(write, self.lookup_tables.len() as u64, 1)
            .map_err(|_| Error::invalid("a band supports at most 9 lookup tables"))?;

        if let Some(first) = self.lookup_tables.first() {
            if self.lookup_tables.iter().any(|table| table.len() != first.len()) {
                return Err(Error::invalid("all lookup tables of a band must have the same length"));
            }

            write_num(write, first.len() as u64, 5)?;
            for table in &self.lookup_tables {
                write.write_all(table)?;
            }
        }

        Ok(())
    }
}


/// Everything the image subheader stores about one image segment.
/// All sizes follow the row-first convention of [`Vec2`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSubheader {
    pub id: String,
    pub date_time: String,
    pub target_id: String,
    pub title: String,
    pub classification: String,
    pub security: Security,
    pub encrypted: bool,
    pub source: String,

    /// Image height and width in pixels (`NROWS`, `NCOLS`).
    pub size: Vec2<usize>,

    pub pixel_value_type: String,
    pub representation: String,
    pub category: String,
    pub actual_bits_per_pixel: usize,
    pub pixel_justification: String,
    pub geolocation: Option<Geolocation>,
    pub comments: Vec<String>,
    pub compression: Compression,

    /// The compression rate code, present exactly
    /// when the compression is not an uncompressed variant.
    pub compression_rate: Option<String>,

    pub bands: Vec<BandInfo>,
    pub mode: ImageMode,

    /// Blocks per column of blocks and per row of blocks (`NBPC`, `NBPR`).
    pub block_count: Vec2<usize>,

    /// Height and width of one block in pixels (`NPPBV`, `NPPBH`).
    pub block_size: Vec2<usize>,

    pub bits_per_pixel: usize,
    pub display_level: u64,
    pub attachment_level: u64,

    /// Row and column offset relative to the attached segment (`ILOC`).
    pub location: Vec2<i64>,

    pub magnification: String,
    pub user_defined: ExtensionSection,
    pub extended: ExtensionSection,
}

impl ImageSubheader {

    /// An unclassified, single-band, single-block, uncompressed subheader
    /// for an 8-bit image of the given size.
    pub fn new(size: Vec2<usize>) -> Self {
        ImageSubheader {
            id: String::new(),
            date_time: String::new(),
            target_id: String::new(),
            title: String::new(),
            classification: "U".to_owned(),
            security: Security::default(),
            encrypted: false,
            source: String::new(),
            size,
            pixel_value_type: "INT".to_owned(),
            representation: "MONO".to_owned(),
            category: "VIS".to_owned(),
            actual_bits_per_pixel: 8,
            pixel_justification: "R".to_owned(),
            geolocation: None,
            comments: Vec::new(),
            compression: Compression::Uncompressed,
            compression_rate: None,
            bands: vec![BandInfo { representation: "M".to_owned(), .. BandInfo::default() }],
            mode: ImageMode::BlockInterleaved,
            block_count: Vec2(1, 1),
            block_size: size,
            bits_per_pixel: 8,
            display_level: 1,
            attachment_level: 0,
            location: Vec2(0, 0),
            magnification: "1.0".to_owned(),
            user_defined: ExtensionSection::default(),
            extended: ExtensionSection::default(),
        }
    }

    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        expect_marker(read, b"IM", "image")?;

        let id = read_str(read, 10)?;
        let date_time = read_str(read, 14)?;
        let target_id = read_str(read, 17)?;
        let title = read_str(read, 80)?;
        let classification = read_str(read, 1)?;
        let security = Security::read_from(read)?;
        let encrypted = read_num(read, 1)? != 0;
        let source = read_str(read, 42)?;

        let rows = read_num(read, 8)? as usize;
        let cols = read_num(read, 8)? as usize;

        let pixel_value_type = read_str(read, 3)?;
        let representation = read_str(read, 8)?;
        let category = read_str(read, 8)?;
        let actual_bits_per_pixel = read_num(read, 2)? as usize;
        let pixel_justification = read_str(read, 1)?;

        let coordinate_system = read_str(read, 1)?;
        let geolocation = if coordinate_system.is_empty() { None }
            else {
                Some(Geolocation {
                    system: coordinate_system,
                    corners: read_str(read, 60)?,
                })
            };

        let comment_count = read_num(read, 1)?;
        let comments = (0 .. comment_count)
            .map(|_| read_str(read, 80))
            .collect::<Result<Vec<String>>>()?;

        let compression = Compression::from_code(&read_str(read, 2)?)?;
        let compression_rate = if compression.has_rate_field() { Some(read_str(read, 4)?) }
            else { None };

        let mut band_count = read_num(read, 1)?;
        if band_count == 0 {
            band_count = read_num(read, 5)?;
        }

        let bands = (0 .. band_count)
            .map(|_| BandInfo::read_from(read))
            .collect::<Result<Vec<BandInfo>>>()?;

        let _sync = read_num(read, 1)?;
        let mode = ImageMode::from_code(&read_str(read, 1)?)?;

        let blocks_per_row = read_num(read, 4)? as usize;
        let blocks_per_col = read_num(read, 4)? as usize;
        let block_width = read_num(read, 4)? as usize;
        let block_height = read_num(read, 4)? as usize;
        let bits_per_pixel = read_num(read, 2)? as usize;

        let display_level = read_num(read, 3)?;
        let attachment_level = read_num(read, 3)?;
        let location = read_location(read)?;
        let magnification = read_str(read, 4)?;

        let user_defined = ExtensionSection::read_from(read, warnings)?;
        let extended = ExtensionSection::read_from(read, warnings)?;

        Ok(ImageSubheader {
            id, date_time, target_id, title, classification, security, encrypted, source,
            size: Vec2(rows, cols),
            pixel_value_type, representation, category,
            actual_bits_per_pixel, pixel_justification,
            geolocation, comments, compression, compression_rate,
            bands, mode,
            block_count: Vec2(blocks_per_col, blocks_per_row),
            block_size: Vec2(block_height, block_width),
            bits_per_pixel, display_level, attachment_level,
            location, magnification,
            user_defined, extended,
        })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        write.write_all(b"IM")?;

        write_str(write, &self.id, 10)?;
        write_str(write, &self.date_time, 14)?;
        write_str(write, &self.target_id, 17)?;
        write_str(write, &self.title, 80)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;
        write_num(write, u64::from(self.encrypted), 1)?;
        write_str(write, &self.source, 42)?;

        write_num(write, self.size.0 as u64, 8)?;
        write_num(write, self.size.1 as u64, 8)?;

        write_str(write, &self.pixel_value_type, 3)?;
        write_str(write, &self.representation, 8)?;
        write_str(write, &self.category, 8)?;
        write_num(write, self.actual_bits_per_pixel as u64, 2)?;
        write_str(write, &self.pixel_justification, 1)?;

        match &self.geolocation {
            None => write_str(write, "", 1)?,
            Some(location) => {
                write_str(write, &location.system, 1)?;
                write_str(write, &location.corners, 60)?;
            },
        }

        write_num(write, self.comments.len() as u64, 1)
            .map_err(|_| Error::invalid("an image supports at most 9 comments"))?;

        for comment in &self.comments {
            write_str(write, comment, 80)?;
        }

        write_str(write, &self.compression.code(), 2)?;
        match (&self.compression_rate, self.compression.has_rate_field()) {
            (Some(rate), true) => write_str(write, rate, 4)?,
            (None, false) => {},
            _ => return Err(Error::invalid("the compression rate is present exactly when the image is compressed")),
        }

        if self.bands.is_empty() {
            return Err(Error::invalid("an image needs at least one band"));
        }

        if self.bands.len() <= 9 {
            write_num(write, self.bands.len() as u64, 1)?;
        }
        else {
            write_num(write, 0, 1)?;
            write_num(write, self.bands.len() as u64, 5)
                .map_err(|_| Error::invalid("too many bands for the band count field"))?;
        }

        for band in &self.bands {
            band.write_to(write)?;
        }

        write_num(write, 0, 1)?; // sync, always zero
        write_str(write, self.mode.code(), 1)?;

        write_num(write, self.block_count.1 as u64, 4)?;
        write_num(write, self.block_count.0 as u64, 4)?;
        write_num(write, self.block_size.1 as u64, 4)?;
        write_num(write, self.block_size.0 as u64, 4)?;
        write_num(write, self.bits_per_pixel as u64, 2)?;

        write_num(write, self.display_level, 3)?;
        write_num(write, self.attachment_level, 3)?;
        write_location(write, self.location)?;
        write_str(write, &self.magnification, 4)?;

        self.user_defined.write_to(write)?;
        self.extended.write_to(write)?;
        Ok(())
    }
}

/// Read a 10-character location field: 5 digits of row offset,
/// then 5 digits of column offset, each possibly signed.
pub(crate) fn read_location(read: &mut Tracking<impl Read>) -> Result<Vec2<i64>> {
    let row = crate::field::Field::read_from(read, crate::field::FieldKind::BcsN, 5)?.as_i64()?;
    let col = crate::field::Field::read_from(read, crate::field::FieldKind::BcsN, 5)?.as_i64()?;
    Ok(Vec2(row, col))
}

pub(crate) fn write_location(write: &mut impl Write, location: Vec2<i64>) -> UnitResult {
    crate::field::Field::bcs_n(location.0, 5)?.write_to(write)?;
    crate::field::Field::bcs_n(location.1, 5)?.write_to(write)?;
    Ok(())
}

/// Read a two-byte segment marker like `IM` or `TE`.
pub(crate) fn expect_marker(read: &mut Tracking<impl Read>, marker: &[u8; 2], segment_kind: &'static str) -> UnitResult {
    let found = crate::io::read_array::<2>(read)?;
    if &found != marker {
        return Err(Error::invalid(format!("not a {} subheader at the declared position", segment_kind)));
    }

    Ok(())
}
