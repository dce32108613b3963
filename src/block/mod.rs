
//! Tiled access to image segment pixels.
//!
//! Image data is stored as a grid of equally sized blocks. Edge blocks
//! are stored at full size and padded with fill pixels; the pad bytes
//! never appear in anything read through this module. Because every
//! encoded block has the same length, a block is located by plain
//! arithmetic without a block index table.

use std::collections::BTreeMap;
use std::io::Seek;

use crate::compression::{BlockCodec, ByteVec};
use crate::error::{Error, Result, UnitResult};
use crate::io::{Read, Tracking};
use crate::math::{Vec2, div_ceil};
use crate::meta::{ImageMode, ImageSubheader, SegmentData};

/// The block grid geometry of one image segment,
/// derived from its subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingInfo {

    /// Number of block rows and block columns of the grid.
    pub block_count: Vec2<usize>,

    /// Pixel rows and columns of every block, edge blocks included.
    pub block_size: Vec2<usize>,

    /// Number of bands of the image.
    pub band_count: usize,

    /// Storage bytes of one pixel of one band.
    pub bytes_per_pixel: usize,

    /// Decoded byte length of one stored block: all bands for the
    /// interleaved modes, a single band for band-sequential storage.
    pub block_length: usize,
}

impl BlockingInfo {

    /// Derive and check the grid geometry of an image subheader.
    /// The grid must cover every pixel of the image.
    pub fn from_subheader(subheader: &ImageSubheader) -> Result<Self> {
        let block_count = subheader.block_count;
        let block_size = subheader.block_size;
        let band_count = subheader.bands.len();

        if block_count.area() == 0 || block_size.area() == 0 {
            return Err(Error::invalid("an image needs at least one nonempty block"));
        }

        if band_count == 0 {
            return Err(Error::invalid("an image needs at least one band"));
        }

        let covered = block_count * block_size;
        if covered.0 < subheader.size.0 || covered.1 < subheader.size.1 {
            return Err(Error::invalid("the blocks of an image do not cover all its pixels"));
        }

        let bytes_per_pixel = div_ceil(subheader.bits_per_pixel, 8).max(1);

        let bands_per_block = match subheader.mode {
            ImageMode::BandSequential => 1,
            _ => band_count,
        };

        Ok(BlockingInfo {
            block_count, block_size, band_count, bytes_per_pixel,
            block_length: block_size.area() * bands_per_block * bytes_per_pixel,
        })
    }

    /// Number of stored blocks per band plane
    /// (equals the total for the interleaved modes).
    pub fn blocks_per_plane(&self) -> usize {
        self.block_count.area()
    }

    /// Total number of stored blocks, all planes included.
    pub fn total_blocks(&self, mode: ImageMode) -> usize {
        match mode {
            ImageMode::BandSequential => self.blocks_per_plane() * self.band_count,
            _ => self.blocks_per_plane(),
        }
    }
}

/// Byte position of one band sample within a decoded block.
/// For band-sequential storage the block holds a single band
/// and the `band` argument must be zero.
fn sample_offset(
    mode: ImageMode, block_size: Vec2<usize>,
    band_count: usize, bytes_per_pixel: usize,
    local: Vec2<usize>, band: usize,
) -> usize
{
    let Vec2(rows, cols) = block_size;
    let Vec2(row, col) = local;

    let sample = match mode {
        ImageMode::PixelInterleaved => (row * cols + col) * band_count + band,
        ImageMode::RowInterleaved => (row * band_count + band) * cols + col,
        ImageMode::BlockInterleaved => (band * rows + row) * cols + col,
        ImageMode::BandSequential => row * cols + col,
    };

    sample * bytes_per_pixel
}


/// A rectangular, possibly decimated view into an image segment.
///
/// The rectangle is given in full-resolution pixel coordinates;
/// downsampling keeps every `step`-th row and column, starting
/// with the first one of the rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubWindow {

    /// Top left pixel of the rectangle (row, column).
    pub start: Vec2<usize>,

    /// Rows and columns of the rectangle, before downsampling.
    pub size: Vec2<usize>,

    /// The bands to read, by zero-based index, in output order.
    pub bands: Vec<usize>,

    /// Row and column decimation step. One means every pixel.
    pub downsample: Vec2<usize>,
}

impl SubWindow {

    /// A full-resolution window over the given rectangle.
    pub fn new(start: Vec2<usize>, size: Vec2<usize>, bands: Vec<usize>) -> Self {
        SubWindow { start, size, bands, downsample: Vec2(1, 1) }
    }

    /// A full-resolution window over the whole image, all bands.
    pub fn entire(subheader: &ImageSubheader) -> Self {
        Self::new(Vec2(0, 0), subheader.size, (0 .. subheader.bands.len()).collect())
    }

    /// Keep only every `step`-th row and column.
    pub fn downsampled(self, step: Vec2<usize>) -> Self {
        SubWindow { downsample: step, .. self }
    }

    /// Rows and columns of the pixels this window produces.
    pub fn output_size(&self) -> Vec2<usize> {
        Vec2(
            div_ceil(self.size.0, self.downsample.0.max(1)),
            div_ceil(self.size.1, self.downsample.1.max(1)),
        )
    }
}


/// Reads rectangular pixel windows out of one image segment,
/// decoding only the blocks the window touches.
pub struct ImageReader<'c> {
    blocking: BlockingInfo,
    mode: ImageMode,
    image_size: Vec2<usize>,
    data_offset: u64,
    encoded_block_len: usize,
    codec: &'c dyn BlockCodec,
}

impl<'c> ImageReader<'c> {

    /// A reader for the image segment described by this subheader.
    /// For [`SegmentData::Located`] data, pass the stream of the whole
    /// file later; for [`SegmentData::Bytes`], pass a cursor over
    /// exactly those bytes.
    pub fn new(subheader: &ImageSubheader, data: &SegmentData, codec: &'c dyn BlockCodec) -> Result<Self> {
        let blocking = BlockingInfo::from_subheader(subheader)?;
        let encoded_block_len = codec.encoded_len(blocking.block_length);

        let stored = blocking.total_blocks(subheader.mode) as u64 * encoded_block_len as u64;
        if data.byte_len() < stored {
            return Err(Error::invalid("segment data is shorter than its declared block grid"));
        }

        let data_offset = match data {
            SegmentData::Located { offset, .. } => *offset,
            SegmentData::Bytes(_) => 0,
        };

        Ok(ImageReader {
            blocking,
            mode: subheader.mode,
            image_size: subheader.size,
            data_offset,
            encoded_block_len,
            codec,
        })
    }

    /// The grid geometry this reader operates on.
    pub fn blocking(&self) -> &BlockingInfo { &self.blocking }

    /// Decode one stored block of one band plane.
    /// The plane must be zero except for band-sequential images.
    pub fn read_block(&self, read: &mut Tracking<impl Read + Seek>, plane: usize, block: Vec2<usize>) -> Result<ByteVec> {
        let Vec2(block_rows, block_cols) = self.blocking.block_count;
        if block.0 >= block_rows || block.1 >= block_cols {
            return Err(Error::invalid("block position outside the block grid"));
        }

        let block_index = plane * self.blocking.blocks_per_plane()
            + block.0 * block_cols + block.1;

        read.seek_read_to(self.data_offset + (block_index * self.encoded_block_len) as u64)?;
        let encoded = crate::io::read_bytes(read, self.encoded_block_len)?;

        let decoded = self.codec.decompress(&encoded, self.blocking.block_length)?;
        if decoded.len() != self.blocking.block_length {
            return Err(Error::invalid("codec produced a block of unexpected length"));
        }

        Ok(decoded)
    }

    /// Read a window of pixels, one contiguous buffer per requested band.
    /// Each buffer holds `window.output_size().area()` samples of
    /// `bytes_per_pixel` bytes in row-major order.
    pub fn read_window(&self, read: &mut Tracking<impl Read + Seek>, window: &SubWindow) -> Result<Vec<ByteVec>> {
        let Vec2(step_rows, step_cols) = window.downsample;
        if step_rows == 0 || step_cols == 0 {
            return Err(Error::invalid("the downsampling step must be at least one"));
        }

        if window.start.0 + window.size.0 > self.image_size.0
            || window.start.1 + window.size.1 > self.image_size.1 {
            return Err(Error::invalid("the sub-window exceeds the image"));
        }

        if window.bands.iter().any(|&band| band >= self.blocking.band_count) {
            return Err(Error::invalid("the sub-window references a band the image does not have"));
        }

        let out_size = window.output_size();
        let bytes_per_pixel = self.blocking.bytes_per_pixel;
        let mut output = vec![vec![0_u8; out_size.area() * bytes_per_pixel]; window.bands.len()];

        if window.size.area() == 0 || window.bands.is_empty() {
            return Ok(output);
        }

        let Vec2(block_height, block_width) = self.blocking.block_size;
        let first_block_row = window.start.0 / block_height;
        let last_block_row = (window.start.0 + window.size.0 - 1) / block_height;
        let first_block_col = window.start.1 / block_width;
        let last_block_col = (window.start.1 + window.size.1 - 1) / block_width;

        for block_row in first_block_row ..= last_block_row {
            let rows = sampled_coords(window.start.0, window.size.0, step_rows, block_row * block_height, block_height);

            for block_col in first_block_col ..= last_block_col {
                let cols = sampled_coords(window.start.1, window.size.1, step_cols, block_col * block_width, block_width);
                let block = Vec2(block_row, block_col);

                match self.mode {
                    ImageMode::BandSequential => {
                        for (slot, &band) in window.bands.iter().enumerate() {
                            let decoded = self.read_block(read, band, block)?;
                            self.scatter(&decoded, 0, block, &rows, &cols, window, out_size, &mut output[slot]);
                        }
                    },

                    _ => {
                        let decoded = self.read_block(read, 0, block)?;
                        for (slot, &band) in window.bands.iter().enumerate() {
                            self.scatter(&decoded, band, block, &rows, &cols, window, out_size, &mut output[slot]);
                        }
                    },
                }
            }
        }

        Ok(output)
    }

    /// Copy the sampled pixels of one decoded block into one output plane.
    #[allow(clippy::too_many_arguments)]
    fn scatter(
        &self, decoded: &[u8], band: usize, block: Vec2<usize>,
        rows: &SampledCoords, cols: &SampledCoords,
        window: &SubWindow, out_size: Vec2<usize>, output: &mut [u8],
    ) {
        let bytes_per_pixel = self.blocking.bytes_per_pixel;
        let block_start = block * self.blocking.block_size;

        for row in rows.clone() {
            let out_row = (row - window.start.0) / window.downsample.0;

            for col in cols.clone() {
                let out_col = (col - window.start.1) / window.downsample.1;

                let source = sample_offset(
                    self.mode, self.blocking.block_size,
                    self.blocking.band_count, bytes_per_pixel,
                    Vec2(row, col) - block_start, band,
                );

                let target = (out_row * out_size.1 + out_col) * bytes_per_pixel;
                output[target .. target + bytes_per_pixel]
                    .copy_from_slice(&decoded[source .. source + bytes_per_pixel]);
            }
        }
    }
}

type SampledCoords = std::iter::StepBy<std::ops::Range<usize>>;

/// The window coordinates that fall into one block along one axis,
/// respecting the decimation step. The step phase is anchored at the
/// window start, so block boundaries never shift the sampling.
fn sampled_coords(
    window_start: usize, window_len: usize, step: usize,
    block_start: usize, block_len: usize,
) -> SampledCoords
{
    let lowest = block_start.max(window_start);
    let first = window_start + div_ceil(lowest - window_start, step) * step;
    let end = (window_start + window_len).min(block_start + block_len);

    (first .. end.max(first)).step_by(step)
}


/// Assembles image segment data block by block, in memory.
///
/// Pixels can arrive in arbitrary rectangles; anything never written
/// comes out as the pad byte. [`Self::finish`] encodes all blocks and
/// returns the complete segment payload.
pub struct ImageWriter<'c> {
    blocking: BlockingInfo,
    mode: ImageMode,
    image_size: Vec2<usize>,
    codec: &'c dyn BlockCodec,
    pad: u8,

    /// Decoded blocks under construction, by stored block index.
    blocks: BTreeMap<usize, ByteVec>,
}

impl<'c> ImageWriter<'c> {

    /// A writer producing the data of the image segment
    /// described by this subheader.
    pub fn new(subheader: &ImageSubheader, codec: &'c dyn BlockCodec, pad: u8) -> Result<Self> {
        Ok(ImageWriter {
            blocking: BlockingInfo::from_subheader(subheader)?,
            mode: subheader.mode,
            image_size: subheader.size,
            codec,
            pad,
            blocks: BTreeMap::new(),
        })
    }

    /// Store a rectangle of pixels, one row-major buffer per band.
    /// All bands of the image must be provided.
    pub fn write_pixels(&mut self, start: Vec2<usize>, size: Vec2<usize>, bands: &[&[u8]]) -> UnitResult {
        if start.0 + size.0 > self.image_size.0 || start.1 + size.1 > self.image_size.1 {
            return Err(Error::invalid("the pixel rectangle exceeds the image"));
        }

        if bands.len() != self.blocking.band_count {
            return Err(Error::invalid("every band of the image must be provided"));
        }

        let bytes_per_pixel = self.blocking.bytes_per_pixel;
        let expected = size.area() * bytes_per_pixel;
        if bands.iter().any(|band| band.len() != expected) {
            return Err(Error::invalid("pixel buffer length does not match the rectangle"));
        }

        let Vec2(block_height, block_width) = self.blocking.block_size;
        let pad = self.pad;
        let block_length = self.blocking.block_length;
        let blocks_per_plane = self.blocking.blocks_per_plane();
        let block_cols = self.blocking.block_count.1;

        for row in start.0 .. start.0 + size.0 {
            let block_row = row / block_height;

            for col in start.1 .. start.1 + size.1 {
                let block_col = col / block_width;
                let local = Vec2(row % block_height, col % block_width);
                let source = ((row - start.0) * size.1 + (col - start.1)) * bytes_per_pixel;

                for (band, pixels) in bands.iter().enumerate() {
                    let plane = match self.mode {
                        ImageMode::BandSequential => band,
                        _ => 0,
                    };

                    let block_index = plane * blocks_per_plane + block_row * block_cols + block_col;
                    let block = self.blocks.entry(block_index)
                        .or_insert_with(|| vec![pad; block_length]);

                    let target = sample_offset(
                        self.mode, self.blocking.block_size,
                        self.blocking.band_count, bytes_per_pixel,
                        local, if self.mode == ImageMode::BandSequential { 0 } else { band },
                    );

                    block[target .. target + bytes_per_pixel]
                        .copy_from_slice(&pixels[source .. source + bytes_per_pixel]);
                }
            }
        }

        Ok(())
    }

    /// Encode all blocks in storage order and return the segment payload.
    /// Blocks that never received pixels are emitted as all pad bytes.
    pub fn finish(mut self) -> Result<ByteVec> {
        let total = self.blocking.total_blocks(self.mode);
        let encoded_len = self.codec.encoded_len(self.blocking.block_length);
        let mut payload = Vec::with_capacity(total * encoded_len);

        for index in 0 .. total {
            let decoded = self.blocks.remove(&index)
                .unwrap_or_else(|| vec![self.pad; self.blocking.block_length]);

            let encoded = self.codec.compress(&decoded)?;
            if encoded.len() != encoded_len {
                return Err(Error::invalid("codec produced blocks of varying length"));
            }

            payload.extend_from_slice(&encoded);
        }

        Ok(payload)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::Identity;

    fn subheader(mode: ImageMode, bands: usize) -> ImageSubheader {
        let mut subheader = ImageSubheader::new(Vec2(5, 7));
        subheader.mode = mode;
        subheader.block_count = Vec2(2, 3);
        subheader.block_size = Vec2(3, 3);
        subheader.bands = (0 .. bands)
            .map(|_| crate::meta::BandInfo::default())
            .collect();

        subheader
    }

    #[test]
    fn blocking_info_checks_coverage() {
        let mut subheader = subheader(ImageMode::BlockInterleaved, 2);
        let blocking = BlockingInfo::from_subheader(&subheader).unwrap();
        assert_eq!(blocking.block_length, 3 * 3 * 2);
        assert_eq!(blocking.blocks_per_plane(), 6);

        subheader.block_count = Vec2(1, 3); // covers only 3 of 5 rows
        assert!(BlockingInfo::from_subheader(&subheader).is_err());
    }

    #[test]
    fn band_sequential_blocks_hold_one_band() {
        let subheader = subheader(ImageMode::BandSequential, 3);
        let blocking = BlockingInfo::from_subheader(&subheader).unwrap();
        assert_eq!(blocking.block_length, 3 * 3);
        assert_eq!(blocking.total_blocks(ImageMode::BandSequential), 18);
    }

    #[test]
    fn sample_offsets_differ_by_mode() {
        let size = Vec2(2, 4);
        let local = Vec2(1, 2);

        assert_eq!(sample_offset(ImageMode::PixelInterleaved, size, 3, 1, local, 2), (1 * 4 + 2) * 3 + 2);
        assert_eq!(sample_offset(ImageMode::RowInterleaved, size, 3, 1, local, 2), (1 * 3 + 2) * 4 + 2);
        assert_eq!(sample_offset(ImageMode::BlockInterleaved, size, 3, 1, local, 2), (2 * 2 + 1) * 4 + 2);
        assert_eq!(sample_offset(ImageMode::BandSequential, size, 3, 1, local, 0), 1 * 4 + 2);
    }

    #[test]
    fn sampled_coords_anchor_at_the_window_start() {
        // window rows 1..=9, step 3 samples 1, 4, 7
        let in_first_block: Vec<usize> = sampled_coords(1, 9, 3, 0, 5).collect();
        let in_second_block: Vec<usize> = sampled_coords(1, 9, 3, 5, 5).collect();

        assert_eq!(in_first_block, vec![1, 4]);
        assert_eq!(in_second_block, vec![7]);
    }

    #[test]
    fn unwritten_blocks_are_padded() {
        let subheader = subheader(ImageMode::BlockInterleaved, 1);
        let writer = ImageWriter::new(&subheader, &Identity, 9).unwrap();
        let payload = writer.finish().unwrap();

        assert_eq!(payload.len(), 6 * 9);
        assert!(payload.iter().all(|&byte| byte == 9));
    }
}
