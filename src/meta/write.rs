
//! Serializes a complete record: recomputes every derived length,
//! then writes the header, the subheaders, and the segment payloads.

use std::io::{BufWriter, Seek};
use std::path::Path;

use crate::error::{Error, Result, UnitResult};
use crate::io::{Read, Tracking, Write};
use super::{DesData, Record, SegmentData, header::SegmentTables};

/// Produces the payload bytes of one segment while writing.
///
/// Payloads held in memory do not need one of these; sources exist for
/// data that should be streamed, like pixel data living in another file.
pub trait DataSource {

    /// The exact number of bytes [`Self::write_to`] will produce.
    /// Queried before writing to fill in the header length tables.
    fn byte_len(&self) -> u64;

    /// Produce the payload bytes.
    fn write_to(&mut self, write: &mut dyn Write) -> UnitResult;
}

impl DataSource for Vec<u8> {
    fn byte_len(&self) -> u64 { self.len() as u64 }

    fn write_to(&mut self, write: &mut dyn Write) -> UnitResult {
        write.write_all(self)?;
        Ok(())
    }
}

impl DataSource for &[u8] {
    fn byte_len(&self) -> u64 { self.len() as u64 }

    fn write_to(&mut self, write: &mut dyn Write) -> UnitResult {
        write.write_all(self)?;
        Ok(())
    }
}

/// Streams a byte range out of a seekable reader,
/// typically the file a [`Record`] was read from.
#[derive(Debug)]
pub struct ReadSource<R> {
    read: Tracking<R>,
    offset: u64,
    length: u64,
}

impl<R: Read + Seek> ReadSource<R> {

    pub fn new(read: R, offset: u64, length: u64) -> Self {
        ReadSource { read: Tracking::new(read), offset, length }
    }

    /// A source for the given byte range of a read record.
    /// Fails when the data is already in memory and needs no source.
    pub fn for_segment(read: R, data: &SegmentData) -> Result<Self> {
        match *data {
            SegmentData::Located { offset, length } => Ok(Self::new(read, offset, length)),
            SegmentData::Bytes(_) => Err(Error::invalid("segment data is already in memory")),
        }
    }
}

impl<R: Read + Seek> DataSource for ReadSource<R> {

    fn byte_len(&self) -> u64 { self.length }

    fn write_to(&mut self, write: &mut dyn Write) -> UnitResult {
        self.read.seek_read_to(self.offset)?;

        let copied = std::io::copy(&mut self.read.by_ref().take(self.length), write)?;
        if copied != self.length {
            return Err(Error::invalid("segment data ends before its declared length"));
        }

        Ok(())
    }
}


/// Writes one record. Owns an optional [`DataSource`] per segment;
/// segments without one must hold their payload in memory.
pub struct Writer<'r> {
    record: &'r mut Record,
    image_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
    graphic_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
    label_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
    text_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
    data_extension_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
    reserved_extension_sources: Vec<Option<Box<dyn DataSource + 'r>>>,
}

fn no_sources<'r>(count: usize) -> Vec<Option<Box<dyn DataSource + 'r>>> {
    (0 .. count).map(|_| None).collect()
}

impl<'r> Writer<'r> {

    /// A writer for this record with no data sources attached yet.
    /// Writing updates the record's `file_length` and `header_length`.
    pub fn new(record: &'r mut Record) -> Self {
        let counts = (
            record.images.len(), record.graphics.len(), record.labels.len(),
            record.texts.len(), record.data_extensions.len(), record.reserved_extensions.len(),
        );

        Writer {
            record,
            image_sources: no_sources(counts.0),
            graphic_sources: no_sources(counts.1),
            label_sources: no_sources(counts.2),
            text_sources: no_sources(counts.3),
            data_extension_sources: no_sources(counts.4),
            reserved_extension_sources: no_sources(counts.5),
        }
    }

    pub fn attach_image_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.image_sources, index, source, "image")
    }

    pub fn attach_graphic_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.graphic_sources, index, source, "graphic")
    }

    pub fn attach_label_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.label_sources, index, source, "label")
    }

    pub fn attach_text_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.text_sources, index, source, "text")
    }

    pub fn attach_data_extension_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.data_extension_sources, index, source, "data extension")
    }

    pub fn attach_reserved_extension_data(&mut self, index: usize, source: impl DataSource + 'r) -> UnitResult {
        attach(&mut self.reserved_extension_sources, index, source, "reserved extension")
    }

    /// Write the record to a new file.
    pub fn write_to_file(self, path: impl AsRef<Path>) -> UnitResult {
        self.write_to(BufWriter::new(std::fs::File::create(path)?))
    }

    /// Write the whole record. No seeking is needed: all lengths are
    /// computed up front by serializing the subheaders into memory.
    pub fn write_to(mut self, mut write: impl Write) -> UnitResult {
        self.record.validate()?;

        // serialize all subheaders first so every length table entry is known
        let mut image_parts = Vec::with_capacity(self.record.images.len());
        for (index, segment) in self.record.images.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;
            let data_len = payload_len(&self.image_sources[index], &segment.data, "image")?;
            image_parts.push((subheader, data_len));
        }

        let mut graphic_parts = Vec::with_capacity(self.record.graphics.len());
        for (index, segment) in self.record.graphics.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;
            let data_len = payload_len(&self.graphic_sources[index], &segment.data, "graphic")?;
            graphic_parts.push((subheader, data_len));
        }

        let mut label_parts = Vec::with_capacity(self.record.labels.len());
        for (index, segment) in self.record.labels.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;
            let data_len = payload_len(&self.label_sources[index], &segment.data, "label")?;
            label_parts.push((subheader, data_len));
        }

        let mut text_parts = Vec::with_capacity(self.record.texts.len());
        for (index, segment) in self.record.texts.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;
            let data_len = payload_len(&self.text_sources[index], &segment.data, "text")?;
            text_parts.push((subheader, data_len));
        }

        let mut des_parts = Vec::with_capacity(self.record.data_extensions.len());
        for (index, segment) in self.record.data_extensions.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;

            let data_len = match (&self.data_extension_sources[index], &segment.data) {
                (Some(source), _) => source.byte_len(),
                (None, DesData::TreOverflow(tres)) => tres.byte_len()? as u64,
                (None, DesData::Opaque(data)) => in_memory_len(data, "data extension")?,
            };

            des_parts.push((subheader, data_len));
        }

        let mut res_parts = Vec::with_capacity(self.record.reserved_extensions.len());
        for (index, segment) in self.record.reserved_extensions.iter().enumerate() {
            let mut subheader = Vec::new();
            segment.subheader.write_to(&mut subheader)?;
            let data_len = payload_len(&self.reserved_extension_sources[index], &segment.data, "reserved extension")?;
            res_parts.push((subheader, data_len));
        }

        let tables = SegmentTables {
            images: table_entries(&image_parts),
            graphics: table_entries(&graphic_parts),
            labels: table_entries(&label_parts),
            texts: table_entries(&text_parts),
            data_extensions: table_entries(&des_parts),
            reserved_extensions: table_entries(&res_parts),
        };

        // the header length does not depend on the values of its own
        // length fields, so one throwaway serialization measures it
        let mut header_bytes = Vec::new();
        self.record.header.write_to(&mut header_bytes, &tables)?;

        let segment_bytes: u64 = [&image_parts, &graphic_parts, &label_parts, &text_parts, &des_parts, &res_parts]
            .into_iter().flatten()
            .map(|(subheader, data_len)| subheader.len() as u64 + data_len)
            .sum();

        self.record.header.header_length = header_bytes.len() as u64;
        self.record.header.file_length = header_bytes.len() as u64 + segment_bytes;

        header_bytes.clear();
        self.record.header.write_to(&mut header_bytes, &tables)?;

        tracing::debug!(
            file_length = self.record.header.file_length,
            header_length = self.record.header.header_length,
            "writing record"
        );

        write.write_all(&header_bytes)?;

        for (index, segment) in self.record.images.iter().enumerate() {
            write.write_all(&image_parts[index].0)?;
            write_payload(&mut self.image_sources[index], &segment.data, &mut write, "image")?;
        }

        for (index, segment) in self.record.graphics.iter().enumerate() {
            write.write_all(&graphic_parts[index].0)?;
            write_payload(&mut self.graphic_sources[index], &segment.data, &mut write, "graphic")?;
        }

        for (index, segment) in self.record.labels.iter().enumerate() {
            write.write_all(&label_parts[index].0)?;
            write_payload(&mut self.label_sources[index], &segment.data, &mut write, "label")?;
        }

        for (index, segment) in self.record.texts.iter().enumerate() {
            write.write_all(&text_parts[index].0)?;
            write_payload(&mut self.text_sources[index], &segment.data, &mut write, "text")?;
        }

        for (index, segment) in self.record.data_extensions.iter().enumerate() {
            write.write_all(&des_parts[index].0)?;

            match (&mut self.data_extension_sources[index], &segment.data) {
                (Some(source), _) => source.write_to(&mut write)?,
                (None, DesData::TreOverflow(tres)) => write.write_all(&tres.to_bytes()?)?,
                (None, DesData::Opaque(data)) => write_payload(&mut None, data, &mut write, "data extension")?,
            }
        }

        for (index, segment) in self.record.reserved_extensions.iter().enumerate() {
            write.write_all(&res_parts[index].0)?;
            write_payload(&mut self.reserved_extension_sources[index], &segment.data, &mut write, "reserved extension")?;
        }

        write.flush()?;
        Ok(())
    }
}

fn attach<'r>(
    sources: &mut [Option<Box<dyn DataSource + 'r>>],
    index: usize, source: impl DataSource + 'r, segment_kind: &str,
) -> UnitResult
{
    match sources.get_mut(index) {
        Some(slot) => {
            *slot = Some(Box::new(source));
            Ok(())
        },

        None => Err(Error::invalid(format!("no {} segment at this position", segment_kind))),
    }
}

fn payload_len(
    source: &Option<Box<dyn DataSource + '_>>,
    data: &SegmentData, segment_kind: &str,
) -> Result<u64>
{
    match source {
        Some(source) => Ok(source.byte_len()),
        None => in_memory_len(data, segment_kind),
    }
}

fn in_memory_len(data: &SegmentData, segment_kind: &str) -> Result<u64> {
    match data {
        SegmentData::Bytes(bytes) => Ok(bytes.len() as u64),

        SegmentData::Located { .. } => Err(Error::invalid(format!(
            "a {} segment read from a file needs a data source attached to be written",
            segment_kind
        ))),
    }
}

fn write_payload(
    source: &mut Option<Box<dyn DataSource + '_>>,
    data: &SegmentData, write: &mut impl Write, segment_kind: &str,
) -> UnitResult
{
    match (source, data) {
        (Some(source), _) => source.write_to(write),

        (None, SegmentData::Bytes(bytes)) => {
            write.write_all(bytes)?;
            Ok(())
        },

        (None, SegmentData::Located { .. }) => Err(Error::invalid(format!(
            "a {} segment read from a file needs a data source attached to be written",
            segment_kind
        ))),
    }
}

fn table_entries(parts: &[(Vec<u8>, u64)]) -> Vec<(u64, u64)> {
    parts.iter().map(|(subheader, data_len)| (subheader.len() as u64, *data_len)).collect()
}
