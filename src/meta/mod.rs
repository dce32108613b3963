
//! Describes the structure of a complete file:
//! the file header and the six kinds of segments.
//!
//! Reading a [`Record`] parses the header and every subheader, but not
//! the segment payloads: those are remembered as byte ranges and read
//! on demand, for example block-wise through [`crate::block::ImageReader`].

pub mod security;
pub mod header;
pub mod image;
pub mod graphic;
pub mod text;
pub mod label;
pub mod extension;
pub mod write;

use std::io::{BufReader, Seek};
use std::path::Path;

use smallvec::SmallVec;

use crate::error::{Error, Result, UnitResult, Warning};
use crate::field::{Field, FieldKind};
use crate::io::{Read, Tracking, Write};
use crate::tre::TreCollection;

pub use security::Security;
pub use header::{FileHeader, Version};
pub use image::{BandInfo, Geolocation, ImageMode, ImageSubheader};
pub use graphic::GraphicSubheader;
pub use text::TextSubheader;
pub use label::LabelSubheader;
pub use extension::{
    DataExtensionSubheader, OverflowTarget,
    ReservedExtensionSubheader, TRE_OVERFLOW,
};
pub use write::{DataSource, ReadSource, Writer};


/// Read one space-padded text field of the given width.
pub(crate) fn read_str(read: &mut impl Read, length: usize) -> Result<String> {
    Ok(Field::read_from(read, FieldKind::BcsA, length)?.as_str()?.to_owned())
}

/// Read one zero-padded numeric field of the given width.
pub(crate) fn read_num(read: &mut impl Read, length: usize) -> Result<u64> {
    Field::read_from(read, FieldKind::BcsN, length)?.as_u64()
}

/// Write one text value, space-padded to the given width.
pub(crate) fn write_str(write: &mut impl Write, value: &str, length: usize) -> UnitResult {
    Field::bcs_a(value, length)?.write_to(write)
}

/// Write one number, zero-padded to the given width.
pub(crate) fn write_num(write: &mut impl Write, value: u64, length: usize) -> UnitResult {
    Field::bcs_n(value as i64, length)?.write_to(write)
}


/// One extension section: the tagged records stored inline,
/// and the 1-based index of the data extension segment holding
/// the records that did not fit (zero when nothing overflowed).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionSection {
    pub tres: TreCollection,
    pub overflow: u64,
}

impl ExtensionSection {

    /// The 5-digit section length counts the 3-byte overflow index,
    /// so this many bytes remain for the records themselves.
    pub(crate) const TRE_BUDGET: usize = 99_999 - 3;

    pub(crate) fn read_from(read: &mut Tracking<impl Read>, warnings: &mut Vec<Warning>) -> Result<Self> {
        let length = read_num(read, 5)? as usize;
        if length == 0 {
            return Ok(ExtensionSection::default());
        }

        if length < 3 {
            return Err(Error::invalid("extension section too short for its overflow index"));
        }

        let overflow = read_num(read, 3)?;
        let tres = TreCollection::read_stream(read, length - 3, warnings)?;
        Ok(ExtensionSection { tres, overflow })
    }

    pub(crate) fn write_to(&self, write: &mut impl Write) -> UnitResult {
        if self.tres.is_empty() && self.overflow == 0 {
            return write_num(write, 0, 5);
        }

        let length = self.tres.byte_len()? + 3;
        if length > 99_999 {
            return Err(Error::invalid(
                "extension section too long for its length field, unmerge the overflow before writing"
            ));
        }

        write_num(write, length as u64, 5)?;
        write_num(write, self.overflow, 3)?;
        write.write_all(&self.tres.to_bytes()?)?;
        Ok(())
    }
}


/// The payload bytes of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentData {

    /// A byte range in the stream the record was read from.
    /// Writing a located segment requires attaching a
    /// [`DataSource`] to the [`Writer`].
    Located {
        offset: u64,
        length: u64,
    },

    /// Bytes held in memory, for segments built by this process.
    Bytes(Vec<u8>),
}

impl SegmentData {

    /// The payload length in bytes.
    pub fn byte_len(&self) -> u64 {
        match self {
            SegmentData::Located { length, .. } => *length,
            SegmentData::Bytes(bytes) => bytes.len() as u64,
        }
    }

    /// The payload bytes, if they are held in memory.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            SegmentData::Bytes(bytes) => Some(bytes),
            SegmentData::Located { .. } => None,
        }
    }
}

impl Default for SegmentData {
    fn default() -> Self { SegmentData::Bytes(Vec::new()) }
}

/// The payload of a data extension segment. Overflowed tagged
/// records are decoded eagerly; everything else stays opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum DesData {
    TreOverflow(TreCollection),
    Opaque(SegmentData),
}

impl DesData {
    pub(crate) fn byte_len(&self) -> Result<u64> {
        Ok(match self {
            DesData::TreOverflow(tres) => tres.byte_len()? as u64,
            DesData::Opaque(data) => data.byte_len(),
        })
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct ImageSegment {
    pub subheader: ImageSubheader,
    pub data: SegmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicSegment {
    pub subheader: GraphicSubheader,
    pub data: SegmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelSegment {
    pub subheader: LabelSubheader,
    pub data: SegmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub subheader: TextSubheader,
    pub data: SegmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataExtensionSegment {
    pub subheader: DataExtensionSubheader,
    pub data: DesData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservedExtensionSegment {
    pub subheader: ReservedExtensionSubheader,
    pub data: SegmentData,
}

/// Files rarely have more than a handful of segments per kind,
/// so the lists live inline until they grow.
pub type SegmentList<S> = SmallVec<[S; 4]>;


/// A complete file: the header and the six segment lists, in file order.
///
/// Segment lists are plain public vectors; push and remove segments
/// directly. All derived lengths and counts in the header are
/// recomputed when the record is written. Removal methods on the
/// record additionally keep overflow cross-references intact.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: FileHeader,
    pub images: SegmentList<ImageSegment>,
    pub graphics: SegmentList<GraphicSegment>,
    pub labels: SegmentList<LabelSegment>,
    pub texts: SegmentList<TextSegment>,
    pub data_extensions: SegmentList<DataExtensionSegment>,
    pub reserved_extensions: SegmentList<ReservedExtensionSegment>,

    /// Every recoverable problem encountered while reading this record.
    pub warnings: Vec<Warning>,
}

impl Record {

    /// An empty record with an unclassified default header.
    pub fn new(version: Version) -> Self {
        Record {
            header: FileHeader::new(version),
            images: SegmentList::new(),
            graphics: SegmentList::new(),
            labels: SegmentList::new(),
            texts: SegmentList::new(),
            data_extensions: SegmentList::new(),
            reserved_extensions: SegmentList::new(),
            warnings: Vec::new(),
        }
    }

    /// Read the record from the file at the given path.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_from_unbuffered(std::fs::File::open(path)?)
    }

    /// Buffer the reader and read the record from it.
    /// Try to avoid this method if your reader is already buffered.
    pub fn read_from_unbuffered(read: impl Read + Seek) -> Result<Self> {
        Self::read_from_buffered(BufReader::new(read))
    }

    /// Read the record: the header and every subheader.
    /// Segment payloads are not loaded, only their byte ranges
    /// are remembered in [`SegmentData::Located`].
    pub fn read_from_buffered(read: impl Read + Seek) -> Result<Self> {
        let mut read = Tracking::new(read);
        let mut warnings = Vec::new();

        let (header, tables) = FileHeader::read_from(&mut read, &mut warnings)?;
        tracing::debug!(
            version = header.version.profile(),
            images = tables.images.len(),
            "parsed file header"
        );

        let mut record = Record {
            header,
            images: SegmentList::new(),
            graphics: SegmentList::new(),
            labels: SegmentList::new(),
            texts: SegmentList::new(),
            data_extensions: SegmentList::new(),
            reserved_extensions: SegmentList::new(),
            warnings: Vec::new(),
        };

        for &(subheader_len, data_len) in &tables.images {
            let start = read.byte_position();
            let subheader = ImageSubheader::read_from(&mut read, &mut warnings)?;
            check_subheader_len(&read, start, subheader_len, "image")?;

            let data = skip_segment_data(&mut read, data_len)?;
            record.images.push(ImageSegment { subheader, data });
        }

        for &(subheader_len, data_len) in &tables.graphics {
            let start = read.byte_position();
            let subheader = GraphicSubheader::read_from(&mut read, &mut warnings)?;
            check_subheader_len(&read, start, subheader_len, "graphic")?;

            let data = skip_segment_data(&mut read, data_len)?;
            record.graphics.push(GraphicSegment { subheader, data });
        }

        for &(subheader_len, data_len) in &tables.labels {
            let start = read.byte_position();
            let subheader = LabelSubheader::read_from(&mut read, &mut warnings)?;
            check_subheader_len(&read, start, subheader_len, "label")?;

            let data = skip_segment_data(&mut read, data_len)?;
            record.labels.push(LabelSegment { subheader, data });
        }

        for &(subheader_len, data_len) in &tables.texts {
            let start = read.byte_position();
            let subheader = TextSubheader::read_from(&mut read, &mut warnings)?;
            check_subheader_len(&read, start, subheader_len, "text")?;

            let data = skip_segment_data(&mut read, data_len)?;
            record.texts.push(TextSegment { subheader, data });
        }

        for &(subheader_len, data_len) in &tables.data_extensions {
            let start = read.byte_position();
            let subheader = DataExtensionSubheader::read_from(&mut read)?;
            check_subheader_len(&read, start, subheader_len, "data extension")?;

            let data = if subheader.is_overflow() {
                DesData::TreOverflow(TreCollection::read_stream(
                    &mut read, crate::error::u64_to_usize(data_len), &mut warnings,
                )?)
            }
            else {
                DesData::Opaque(skip_segment_data(&mut read, data_len)?)
            };

            record.data_extensions.push(DataExtensionSegment { subheader, data });
        }

        for &(subheader_len, data_len) in &tables.reserved_extensions {
            let start = read.byte_position();
            let subheader = ReservedExtensionSubheader::read_from(&mut read)?;
            check_subheader_len(&read, start, subheader_len, "reserved extension")?;

            let data = skip_segment_data(&mut read, data_len)?;
            record.reserved_extensions.push(ReservedExtensionSegment { subheader, data });
        }

        if record.header.file_length != read.byte_position() {
            warnings.push(Warning::new(
                "FL",
                format!(
                    "file declares {} bytes but its segments end at {}",
                    record.header.file_length, read.byte_position()
                ),
                read.byte_position(),
            ));
        }

        record.warnings = warnings;
        Ok(record)
    }

    /// Write the record to a new file, recomputing all derived lengths.
    /// Only works when every segment payload is held in memory;
    /// attach [`DataSource`]s through a [`Writer`] otherwise.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> UnitResult {
        Writer::new(self).write_to_file(path)
    }

    /// Write the record, recomputing all derived lengths.
    /// Only works when every segment payload is held in memory;
    /// attach [`DataSource`]s through a [`Writer`] otherwise.
    pub fn write_to_buffered(&mut self, write: impl Write) -> UnitResult {
        Writer::new(self).write_to(write)
    }

    /// Check the cross-references and capacity limits that writing
    /// will rely on, without writing anything.
    pub fn validate(&self) -> UnitResult {
        for (count, kind) in [
            (self.images.len(), "image"), (self.graphics.len(), "graphic"),
            (self.labels.len(), "label"), (self.texts.len(), "text"),
            (self.data_extensions.len(), "data extension"),
            (self.reserved_extensions.len(), "reserved extension"),
        ] {
            if count > 999 {
                return Err(Error::invalid(format!("too many {} segments for the header", kind)));
            }
        }

        for image in &self.images {
            let subheader = &image.subheader;
            if subheader.bands.is_empty() || subheader.bands.len() > 99_999 {
                return Err(Error::invalid("unrepresentable number of image bands"));
            }

            let covered_rows = subheader.block_count.0 * subheader.block_size.0;
            let covered_cols = subheader.block_count.1 * subheader.block_size.1;
            if covered_rows < subheader.size.0 || covered_cols < subheader.size.1 {
                return Err(Error::invalid("the blocks of an image do not cover all its pixels"));
            }
        }

        for segment in &self.data_extensions {
            if let Some(target) = &segment.subheader.overflow {
                self.overflow_section(target)?;
            }
        }

        Ok(())
    }

    /// Fold every overflow data extension segment back
    /// into the extension section it came from.
    pub fn merge_overflow_extensions(&mut self) -> UnitResult {
        let mut index = 0;
        while index < self.data_extensions.len() {
            if !self.data_extensions[index].subheader.is_overflow() {
                index += 1;
                continue;
            }

            let segment = self.data_extensions.remove(index);
            let target = segment.subheader.overflow
                .ok_or_else(|| Error::invalid("overflow segment without a target section"))?;

            let mut tres = match segment.data {
                DesData::TreOverflow(tres) => tres,
                DesData::Opaque(_) => return Err(Error::invalid("overflow segment with unparsed payload")),
            };

            tracing::debug!(
                section = target.section.as_str(),
                segment = target.segment,
                records = tres.len(),
                "merging overflowed records back into their section"
            );

            let section = self.overflow_section_mut(&target)?;
            section.tres.append(&mut tres);
        }

        // no overflow segments remain, so no section points at one anymore
        self.for_each_section(|section| section.overflow = 0);
        Ok(())
    }

    /// Move the tail of every extension section that outgrew its 5-digit
    /// length field into a new `TRE_OVERFLOW` data extension segment.
    /// Splits happen between records, never inside one.
    pub fn unmerge_overflow_extensions(&mut self) -> UnitResult {
        let header = &mut self.header;
        unmerge_section(
            &mut header.user_defined, &header.classification, &header.security,
            "UDHD", 0, &mut self.data_extensions,
        )?;

        unmerge_section(
            &mut header.extended, &header.classification, &header.security,
            "XHD", 0, &mut self.data_extensions,
        )?;

        for (index, image) in self.images.iter_mut().enumerate() {
            let subheader = &mut image.subheader;
            unmerge_section(
                &mut subheader.user_defined, &subheader.classification, &subheader.security,
                "UDID", index as u64 + 1, &mut self.data_extensions,
            )?;

            unmerge_section(
                &mut subheader.extended, &subheader.classification, &subheader.security,
                "IXSHD", index as u64 + 1, &mut self.data_extensions,
            )?;
        }

        for (index, graphic) in self.graphics.iter_mut().enumerate() {
            let subheader = &mut graphic.subheader;
            unmerge_section(
                &mut subheader.extended, &subheader.classification, &subheader.security,
                "SXSHD", index as u64 + 1, &mut self.data_extensions,
            )?;
        }

        for (index, segment) in self.texts.iter_mut().enumerate() {
            let subheader = &mut segment.subheader;
            unmerge_section(
                &mut subheader.extended, &subheader.classification, &subheader.security,
                "TXSHD", index as u64 + 1, &mut self.data_extensions,
            )?;
        }

        Ok(())
    }

    /// Remove an image segment, dropping its overflow segments
    /// and renumbering the overflow targets of the images after it.
    pub fn remove_image(&mut self, index: usize) -> Result<ImageSegment> {
        if index >= self.images.len() {
            return Err(Error::invalid("no image segment at this position"));
        }

        let segment = self.images.remove(index);
        self.fix_overflow_targets("UDID", index as u64 + 1);
        self.fix_overflow_targets("IXSHD", index as u64 + 1);
        Ok(segment)
    }

    /// Remove a graphic segment, see [`Self::remove_image`].
    pub fn remove_graphic(&mut self, index: usize) -> Result<GraphicSegment> {
        if index >= self.graphics.len() {
            return Err(Error::invalid("no graphic segment at this position"));
        }

        let segment = self.graphics.remove(index);
        self.fix_overflow_targets("SXSHD", index as u64 + 1);
        Ok(segment)
    }

    /// Remove a text segment, see [`Self::remove_image`].
    pub fn remove_text(&mut self, index: usize) -> Result<TextSegment> {
        if index >= self.texts.len() {
            return Err(Error::invalid("no text segment at this position"));
        }

        let segment = self.texts.remove(index);
        self.fix_overflow_targets("TXSHD", index as u64 + 1);
        Ok(segment)
    }

    /// Remove a label segment.
    pub fn remove_label(&mut self, index: usize) -> Result<LabelSegment> {
        if index >= self.labels.len() {
            return Err(Error::invalid("no label segment at this position"));
        }

        Ok(self.labels.remove(index))
    }

    /// Remove a data extension segment, renumbering the overflow
    /// indices of all extension sections pointing after it.
    pub fn remove_data_extension(&mut self, index: usize) -> Result<DataExtensionSegment> {
        if index >= self.data_extensions.len() {
            return Err(Error::invalid("no data extension segment at this position"));
        }

        let segment = self.data_extensions.remove(index);
        let removed_number = index as u64 + 1;

        self.for_each_section(|section| {
            if section.overflow == removed_number { section.overflow = 0; }
            else if section.overflow > removed_number { section.overflow -= 1; }
        });

        Ok(segment)
    }

    /// Remove a reserved extension segment.
    pub fn remove_reserved_extension(&mut self, index: usize) -> Result<ReservedExtensionSegment> {
        if index >= self.reserved_extensions.len() {
            return Err(Error::invalid("no reserved extension segment at this position"));
        }

        Ok(self.reserved_extensions.remove(index))
    }

    /// Drop or renumber the overflow segments targeting the given
    /// section kind after the segment `removed_number` was removed.
    fn fix_overflow_targets(&mut self, section_name: &str, removed_number: u64) {
        let mut index = 0;
        while index < self.data_extensions.len() {
            let segment_number = match &self.data_extensions[index].subheader.overflow {
                Some(target) if target.section == section_name => target.segment,
                _ => { index += 1; continue; },
            };

            if segment_number == removed_number {
                // its owner is gone; removal also renumbers section pointers
                let _ = self.remove_data_extension(index);
            }
            else {
                if segment_number > removed_number {
                    if let Some(target) = &mut self.data_extensions[index].subheader.overflow {
                        target.segment -= 1;
                    }
                }

                index += 1;
            }
        }
    }

    fn for_each_section(&mut self, mut apply: impl FnMut(&mut ExtensionSection)) {
        apply(&mut self.header.user_defined);
        apply(&mut self.header.extended);

        for image in &mut self.images {
            apply(&mut image.subheader.user_defined);
            apply(&mut image.subheader.extended);
        }

        for graphic in &mut self.graphics { apply(&mut graphic.subheader.extended); }
        for label in &mut self.labels { apply(&mut label.subheader.extended); }
        for segment in &mut self.texts { apply(&mut segment.subheader.extended); }
    }

    fn overflow_section_mut(&mut self, target: &OverflowTarget) -> Result<&mut ExtensionSection> {
        let segment_index = || crate::error::u64_to_usize(target.segment.saturating_sub(1));
        let missing = || Error::invalid("overflow segment points to a segment that does not exist");

        match target.section.as_str() {
            "UDHD" => Ok(&mut self.header.user_defined),
            "XHD" => Ok(&mut self.header.extended),

            "UDID" => self.images.get_mut(segment_index())
                .map(|segment| &mut segment.subheader.user_defined).ok_or_else(missing),

            "IXSHD" => self.images.get_mut(segment_index())
                .map(|segment| &mut segment.subheader.extended).ok_or_else(missing),

            "SXSHD" => self.graphics.get_mut(segment_index())
                .map(|segment| &mut segment.subheader.extended).ok_or_else(missing),

            "TXSHD" => self.texts.get_mut(segment_index())
                .map(|segment| &mut segment.subheader.extended).ok_or_else(missing),

            _ => Err(Error::invalid("overflow segment points to an unknown section")),
        }
    }

    fn overflow_section(&self, target: &OverflowTarget) -> Result<&ExtensionSection> {
        let segment_index = crate::error::u64_to_usize(target.segment.saturating_sub(1));
        let missing = || Error::invalid("overflow segment points to a segment that does not exist");

        match target.section.as_str() {
            "UDHD" => Ok(&self.header.user_defined),
            "XHD" => Ok(&self.header.extended),

            "UDID" => self.images.get(segment_index)
                .map(|segment| &segment.subheader.user_defined).ok_or_else(missing),

            "IXSHD" => self.images.get(segment_index)
                .map(|segment| &segment.subheader.extended).ok_or_else(missing),

            "SXSHD" => self.graphics.get(segment_index)
                .map(|segment| &segment.subheader.extended).ok_or_else(missing),

            "TXSHD" => self.texts.get(segment_index)
                .map(|segment| &segment.subheader.extended).ok_or_else(missing),

            _ => Err(Error::invalid("overflow segment points to an unknown section")),
        }
    }
}

/// Remember the payload byte range and position the reader after it.
fn skip_segment_data(read: &mut Tracking<impl Read + Seek>, length: u64) -> Result<SegmentData> {
    let offset = read.byte_position();
    read.seek_read_to(offset + length)?;
    Ok(SegmentData::Located { offset, length })
}

fn check_subheader_len(
    read: &Tracking<impl Read>, start: u64,
    declared: u64, segment_kind: &str,
) -> UnitResult
{
    let consumed = read.byte_position() - start;
    if consumed != declared {
        return Err(Error::invalid(format!(
            "{} subheader declares {} bytes but occupies {}",
            segment_kind, declared, consumed
        )));
    }

    Ok(())
}

/// Split the over-budget tail of one section into
/// a fresh overflow segment carrying the owner's security.
fn unmerge_section(
    section: &mut ExtensionSection,
    classification: &str, security: &Security,
    section_name: &str, segment_number: u64,
    data_extensions: &mut SegmentList<DataExtensionSegment>,
) -> UnitResult
{
    let tail = section.tres.split_off_over_budget(ExtensionSection::TRE_BUDGET)?;
    if tail.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        section = section_name,
        records = tail.len(),
        "moving records that outgrew their section into an overflow segment"
    );

    section.overflow = data_extensions.len() as u64 + 1;

    let mut subheader = DataExtensionSubheader::new(TRE_OVERFLOW);
    subheader.classification = classification.to_owned();
    subheader.security = security.clone();
    subheader.overflow = Some(OverflowTarget {
        section: section_name.to_owned(),
        segment: segment_number,
    });

    data_extensions.push(DataExtensionSegment {
        subheader,
        data: DesData::TreOverflow(tail),
    });

    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::tre::Tre;
    use std::io::Cursor;

    fn raw_tre(tag: &str, len: usize) -> Tre {
        Tre::raw(tag, vec![b'x'; len]).unwrap()
    }

    #[test]
    fn empty_extension_section_is_five_zeros() {
        let mut bytes = Vec::new();
        ExtensionSection::default().write_to(&mut bytes).unwrap();
        assert_eq!(bytes, b"00000");
    }

    #[test]
    fn extension_section_round_trip() {
        let mut section = ExtensionSection::default();
        section.tres.push(raw_tre("TSTTRE", 10));

        let mut bytes = Vec::new();
        section.write_to(&mut bytes).unwrap();
        assert_eq!(&bytes[.. 8], b"00024000"); // 3 + 11 + 10 bytes, no overflow

        let mut read = Tracking::new(Cursor::new(bytes));
        let mut warnings = Vec::new();
        let parsed = ExtensionSection::read_from(&mut read, &mut warnings).unwrap();

        assert_eq!(parsed.tres.len(), 1);
        assert_eq!(parsed.tres.get("TSTTRE").unwrap().record_bytes().unwrap(), vec![b'x'; 10]);
        assert_eq!(warnings.len(), 1); // unregistered tag is reported, not fatal
    }

    #[test]
    fn unmerge_splits_between_records_and_merge_restores() {
        let mut record = Record::new(Version::Nitf21);

        // four records of 30011 wire bytes each: three fit into the 99996 budget
        for index in 0 .. 4 {
            record.header.extended.tres.push(raw_tre(&format!("TST{:03}", index), 30_000));
        }

        let original = record.header.extended.tres.clone();

        record.unmerge_overflow_extensions().unwrap();
        assert_eq!(record.header.extended.tres.len(), 3);
        assert_eq!(record.header.extended.overflow, 1);
        assert_eq!(record.data_extensions.len(), 1);

        let overflow = &record.data_extensions[0];
        assert!(overflow.subheader.is_overflow());
        assert_eq!(
            overflow.subheader.overflow,
            Some(OverflowTarget { section: "XHD".to_owned(), segment: 0 })
        );

        match &overflow.data {
            DesData::TreOverflow(tres) => assert_eq!(tres.len(), 1),
            DesData::Opaque(_) => panic!("overflow payload must hold records"),
        }

        record.merge_overflow_extensions().unwrap();
        assert!(record.data_extensions.is_empty());
        assert_eq!(record.header.extended.overflow, 0);
        assert_eq!(record.header.extended.tres, original);
    }

    #[test]
    fn removing_a_segment_renumbers_overflow_targets() {
        let mut record = Record::new(Version::Nitf21);

        for _ in 0 .. 2 {
            let mut image = ImageSegment {
                subheader: ImageSubheader::new(crate::math::Vec2(4, 4)),
                data: SegmentData::Bytes(vec![0; 16]),
            };

            for index in 0 .. 4 {
                image.subheader.extended.tres.push(raw_tre(&format!("TST{:03}", index), 30_000));
            }

            record.images.push(image);
        }

        record.unmerge_overflow_extensions().unwrap();
        assert_eq!(record.data_extensions.len(), 2);
        assert_eq!(record.data_extensions[0].subheader.overflow.as_ref().unwrap().segment, 1);
        assert_eq!(record.data_extensions[1].subheader.overflow.as_ref().unwrap().segment, 2);

        record.remove_image(0).unwrap();

        // the first overflow segment is gone with its image, the second renumbered
        assert_eq!(record.data_extensions.len(), 1);
        assert_eq!(record.data_extensions[0].subheader.overflow.as_ref().unwrap().segment, 1);
        assert_eq!(record.images[0].subheader.extended.overflow, 1);
    }
}
