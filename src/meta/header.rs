
//! The file header: identity fields, the six segment tables,
//! and the two header-level extension sections.

use crate::error::{Error, Result, UnitResult, Warning};
use crate::io::{Read, Tracking, Write};
use super::{ExtensionSection, Security, read_num, read_str, write_num, write_str};

/// The file profile and version, from the `FHDR` and `FVER` fields.
/// Only the two byte-identical 2.1-generation profiles are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {

    /// `NITF02.10`.
    Nitf21,

    /// `NSIF01.00`, the NATO profile of the same layout.
    Nsif10,
}

impl Version {

    pub(crate) fn from_wire(profile: &str, version: &str) -> Result<Self> {
        match (profile, version) {
            ("NITF", "02.10") => Ok(Version::Nitf21),
            ("NSIF", "01.00") => Ok(Version::Nsif10),

            ("NITF", "02.00") => Err(Error::unsupported("version 2.0 files are not supported")),
            _ => Err(Error::invalid("not a recognized file profile and version")),
        }
    }

    pub(crate) fn profile(self) -> &'static str {
        match self {
            Version::Nitf21 => "NITF",
            Version::Nsif10 => "NSIF",
        }
    }

    pub(crate) fn version(self) -> &'static str {
        match self {
            Version::Nitf21 => "02.10",
            Version::Nsif10 => "01.00",
        }
    }
}


/// The per-segment length entries of the six segment tables.
/// Each entry is the subheader byte length and the data byte length
/// of one segment, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SegmentTables {
    pub images: Vec<(u64, u64)>,
    pub graphics: Vec<(u64, u64)>,
    pub labels: Vec<(u64, u64)>,
    pub texts: Vec<(u64, u64)>,
    pub data_extensions: Vec<(u64, u64)>,
    pub reserved_extensions: Vec<(u64, u64)>,
}

/// Digit widths of one segment table:
/// count, per-entry subheader length, per-entry data length.
struct TableWidths {
    count: usize,
    subheader_len: usize,
    data_len: usize,
}

const IMAGE_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 6, data_len: 10 };
const GRAPHIC_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 4, data_len: 6 };
const LABEL_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 4, data_len: 3 };
const TEXT_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 4, data_len: 5 };
const DATA_EXTENSION_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 4, data_len: 9 };
const RESERVED_EXTENSION_TABLE: TableWidths = TableWidths { count: 3, subheader_len: 4, data_len: 7 };


/// Everything in the file header except the segment tables,
/// which are derived from the segment lists when writing.
///
/// The `file_length` and `header_length` fields are overwritten
/// with the real byte counts whenever the record is written.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub version: Version,
    pub complexity_level: u64,
    pub system_type: String,
    pub originating_station: String,
    pub date_time: String,
    pub title: String,
    pub classification: String,
    pub security: Security,
    pub copy_number: u64,
    pub copy_count: u64,
    pub encrypted: bool,
    pub background_color: [u8; 3],
    pub originator_name: String,
    pub originator_phone: String,
    pub file_length: u64,
    pub header_length: u64,
    pub user_defined: ExtensionSection,
    pub extended: ExtensionSection,
}

impl FileHeader {

    /// A header with unclassified defaults, as produced by most tooling.
    pub fn new(version: Version) -> Self {
        FileHeader {
            version,
            complexity_level: 3,
            system_type: "BF01".to_owned(),
            originating_station: String::new(),
            date_time: String::new(),
            title: String::new(),
            classification: "U".to_owned(),
            security: Security::default(),
            copy_number: 0,
            copy_count: 0,
            encrypted: false,
            background_color: [0, 0, 0],
            originator_name: String::new(),
            originator_phone: String::new(),
            file_length: 0,
            header_length: 0,
            user_defined: ExtensionSection::default(),
            extended: ExtensionSection::default(),
        }
    }

    /// Read the complete header including the segment tables.
    /// The declared header length must match the bytes actually consumed.
    pub(crate) fn read_from(
        read: &mut Tracking<impl Read>,
        warnings: &mut Vec<Warning>,
    ) -> Result<(Self, SegmentTables)>
    {
        let profile = read_str(read, 4)?;
        let version_text = read_str(read, 5)?;
        let version = Version::from_wire(&profile, &version_text)?;

        let complexity_level = read_num(read, 2)?;
        let system_type = read_str(read, 4)?;
        let originating_station = read_str(read, 10)?;
        let date_time = read_str(read, 14)?;
        let title = read_str(read, 80)?;
        let classification = read_str(read, 1)?;
        let security = Security::read_from(read)?;
        let copy_number = read_num(read, 5)?;
        let copy_count = read_num(read, 5)?;
        let encrypted = read_num(read, 1)? != 0;
        let background_color = crate::io::read_array::<3>(read)?;
        let originator_name = read_str(read, 24)?;
        let originator_phone = read_str(read, 18)?;

        let file_length_text = read_str(read, 12)?;
        if file_length_text.bytes().all(|byte| byte == b'9') {
            return Err(Error::unsupported("streaming headers with deferred lengths are not supported"));
        }

        let file_length = file_length_text.parse::<u64>()
            .map_err(|_| Error::invalid("unparsable file length"))?;

        let header_length = read_num(read, 6)?;

        let tables = SegmentTables {
            images: read_table(read, &IMAGE_TABLE)?,
            graphics: read_table(read, &GRAPHIC_TABLE)?,
            labels: read_table(read, &LABEL_TABLE)?,
            texts: read_table(read, &TEXT_TABLE)?,
            data_extensions: read_table(read, &DATA_EXTENSION_TABLE)?,
            reserved_extensions: read_table(read, &RESERVED_EXTENSION_TABLE)?,
        };

        let user_defined = ExtensionSection::read_from(read, warnings)?;
        let extended = ExtensionSection::read_from(read, warnings)?;

        if header_length != read.byte_position() {
            return Err(Error::invalid(format!(
                "header declares {} bytes but occupies {}",
                header_length, read.byte_position()
            )));
        }

        Ok((
            FileHeader {
                version, complexity_level, system_type, originating_station,
                date_time, title, classification, security,
                copy_number, copy_count, encrypted, background_color,
                originator_name, originator_phone,
                file_length, header_length,
                user_defined, extended,
            },
            tables,
        ))
    }

    /// Write the complete header with the given segment tables.
    /// Emits the stored `file_length` and `header_length` verbatim;
    /// the writer sets them beforehand.
    pub(crate) fn write_to(&self, write: &mut impl Write, tables: &SegmentTables) -> UnitResult {
        write_str(write, self.version.profile(), 4)?;
        write_str(write, self.version.version(), 5)?;
        write_num(write, self.complexity_level, 2)?;
        write_str(write, &self.system_type, 4)?;
        write_str(write, &self.originating_station, 10)?;
        write_str(write, &self.date_time, 14)?;
        write_str(write, &self.title, 80)?;
        write_str(write, &self.classification, 1)?;
        self.security.write_to(write)?;
        write_num(write, self.copy_number, 5)?;
        write_num(write, self.copy_count, 5)?;
        write_num(write, u64::from(self.encrypted), 1)?;
        write.write_all(&self.background_color)?;
        write_str(write, &self.originator_name, 24)?;
        write_str(write, &self.originator_phone, 18)?;
        write_num(write, self.file_length, 12)?;
        write_num(write, self.header_length, 6)?;

        write_table(write, &tables.images, &IMAGE_TABLE, "image")?;
        write_table(write, &tables.graphics, &GRAPHIC_TABLE, "graphic")?;
        write_table(write, &tables.labels, &LABEL_TABLE, "label")?;
        write_table(write, &tables.texts, &TEXT_TABLE, "text")?;
        write_table(write, &tables.data_extensions, &DATA_EXTENSION_TABLE, "data extension")?;
        write_table(write, &tables.reserved_extensions, &RESERVED_EXTENSION_TABLE, "reserved extension")?;

        self.user_defined.write_to(write)?;
        self.extended.write_to(write)?;
        Ok(())
    }
}

fn read_table(read: &mut Tracking<impl Read>, widths: &TableWidths) -> Result<Vec<(u64, u64)>> {
    let count = read_num(read, widths.count)?;

    (0 .. count)
        .map(|_| Ok((
            read_num(read, widths.subheader_len)?,
            read_num(read, widths.data_len)?,
        )))
        .collect()
}

fn write_table(
    write: &mut impl Write, entries: &[(u64, u64)],
    widths: &TableWidths, segment_kind: &str,
) -> UnitResult
{
    write_num(write, entries.len() as u64, widths.count)
        .map_err(|_| Error::invalid(format!("too many {} segments for the header", segment_kind)))?;

    for &(subheader_len, data_len) in entries {
        write_num(write, subheader_len, widths.subheader_len)
            .map_err(|_| Error::invalid(format!("{} subheader too long for its length field", segment_kind)))?;

        write_num(write, data_len, widths.data_len)
            .map_err(|_| Error::invalid(format!("{} data too long for its length field", segment_kind)))?;
    }

    Ok(())
}
