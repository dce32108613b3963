
//! Writing pixels into a blocked image segment and reading them back,
//! for every interleave mode, with sub-windows and downsampling.

use std::io::Cursor;

use rand::Rng;

use nsif::block::{ImageReader, ImageWriter, SubWindow};
use nsif::compression::Identity;
use nsif::math::Vec2;
use nsif::meta::{BandInfo, ImageMode, ImageSubheader, SegmentData};

const PAD: u8 = 0xEE;

/// A deterministic pixel pattern that never produces the pad byte.
fn value(row: usize, col: usize, band: usize) -> u8 {
    ((row * 31 + col * 7 + band * 13) % 199) as u8
}

/// A 10 x 13 pixel image in a 3 x 3 grid of 4 x 5 blocks,
/// so the right and bottom edge blocks are partially padded.
fn subheader(mode: ImageMode, bands: usize) -> ImageSubheader {
    let mut subheader = ImageSubheader::new(Vec2(10, 13));
    subheader.mode = mode;
    subheader.block_count = Vec2(3, 3);
    subheader.block_size = Vec2(4, 5);
    subheader.bands = (0 .. bands).map(|_| BandInfo::default()).collect();
    subheader
}

/// Row-major pattern pixels for one rectangle, one buffer per band.
fn rectangle_bands(start: Vec2<usize>, size: Vec2<usize>, bands: usize) -> Vec<Vec<u8>> {
    (0 .. bands)
        .map(|band| {
            let mut pixels = Vec::with_capacity(size.area());
            for row in start.0 .. start.0 + size.0 {
                for col in start.1 .. start.1 + size.1 {
                    pixels.push(value(row, col, band));
                }
            }
            pixels
        })
        .collect()
}

/// What a window read should produce, computed pixel by pixel.
fn expected_window(window: &SubWindow) -> Vec<Vec<u8>> {
    window.bands.iter()
        .map(|&band| {
            let mut pixels = Vec::new();
            let mut row = window.start.0;
            while row < window.start.0 + window.size.0 {
                let mut col = window.start.1;
                while col < window.start.1 + window.size.1 {
                    pixels.push(value(row, col, band));
                    col += window.downsample.1;
                }
                row += window.downsample.0;
            }
            pixels
        })
        .collect()
}

/// Write the full pattern image and return the segment payload.
fn write_full(subheader: &ImageSubheader) -> Vec<u8> {
    let mut writer = ImageWriter::new(subheader, &Identity, PAD).unwrap();

    let bands = rectangle_bands(Vec2(0, 0), subheader.size, subheader.bands.len());
    let refs: Vec<&[u8]> = bands.iter().map(|band| band.as_slice()).collect();
    writer.write_pixels(Vec2(0, 0), subheader.size, &refs).unwrap();

    writer.finish().unwrap()
}

fn read_window(subheader: &ImageSubheader, payload: &[u8], window: &SubWindow) -> Vec<Vec<u8>> {
    let data = SegmentData::Bytes(payload.to_vec());
    let reader = ImageReader::new(subheader, &data, &Identity).unwrap();

    let mut stream = nsif::io::Tracking::new(Cursor::new(payload));
    reader.read_window(&mut stream, window).unwrap()
}

const ALL_MODES: [ImageMode; 4] = [
    ImageMode::BlockInterleaved,
    ImageMode::PixelInterleaved,
    ImageMode::RowInterleaved,
    ImageMode::BandSequential,
];

#[test]
fn full_images_round_trip_in_every_mode() {
    for mode in ALL_MODES {
        let subheader = subheader(mode, 2);
        let payload = write_full(&subheader);

        let window = SubWindow::entire(&subheader);
        let pixels = read_window(&subheader, &payload, &window);

        assert_eq!(pixels, expected_window(&window), "mode {:?}", mode);

        // the pattern never produces the pad byte, so none may surface
        assert!(
            pixels.iter().flatten().all(|&byte| byte != PAD),
            "pad bytes leaked out of the edge blocks in mode {:?}", mode,
        );
    }
}

#[test]
fn sub_windows_read_only_their_pixels() {
    for mode in ALL_MODES {
        let subheader = subheader(mode, 3);
        let payload = write_full(&subheader);

        // crosses block boundaries in both directions, reorders the bands
        let window = SubWindow::new(Vec2(3, 4), Vec2(5, 6), vec![2, 0]);
        let pixels = read_window(&subheader, &payload, &window);

        assert_eq!(window.output_size(), Vec2(5, 6));
        assert_eq!(pixels, expected_window(&window), "mode {:?}", mode);
    }
}

#[test]
fn downsampling_matches_naive_decimation() {
    for mode in [ImageMode::RowInterleaved, ImageMode::BandSequential] {
        let subheader = subheader(mode, 2);
        let payload = write_full(&subheader);

        let window = SubWindow::new(Vec2(1, 2), Vec2(8, 9), vec![0, 1])
            .downsampled(Vec2(3, 2));

        let pixels = read_window(&subheader, &payload, &window);

        // rows 1, 4, 7 and columns 2, 4, 6, 8, 10
        assert_eq!(window.output_size(), Vec2(3, 5));
        assert_eq!(pixels, expected_window(&window), "mode {:?}", mode);
    }
}

#[test]
fn invalid_windows_are_refused() {
    let subheader = subheader(ImageMode::BlockInterleaved, 2);
    let payload = write_full(&subheader);

    let data = SegmentData::Bytes(payload.clone());
    let reader = ImageReader::new(&subheader, &data, &Identity).unwrap();
    let mut stream = nsif::io::Tracking::new(Cursor::new(payload.as_slice()));

    // reaches one pixel past the bottom edge
    let too_tall = SubWindow::new(Vec2(1, 0), Vec2(10, 13), vec![0]);
    assert!(reader.read_window(&mut stream, &too_tall).is_err());

    // band index out of range
    let bad_band = SubWindow::new(Vec2(0, 0), Vec2(2, 2), vec![2]);
    assert!(reader.read_window(&mut stream, &bad_band).is_err());

    // zero is not a valid decimation step
    let zero_step = SubWindow::new(Vec2(0, 0), Vec2(2, 2), vec![0])
        .downsampled(Vec2(0, 1));
    assert!(reader.read_window(&mut stream, &zero_step).is_err());
}

#[test]
fn invalid_rectangles_are_refused_by_the_writer() {
    let subheader = subheader(ImageMode::PixelInterleaved, 2);
    let mut writer = ImageWriter::new(&subheader, &Identity, PAD).unwrap();

    let pixels = vec![0_u8; 4];

    // reaches past the right edge
    assert!(writer.write_pixels(Vec2(0, 12), Vec2(2, 2), &[&pixels, &pixels]).is_err());

    // too few bands
    assert!(writer.write_pixels(Vec2(0, 0), Vec2(2, 2), &[&pixels]).is_err());

    // buffer does not match the rectangle
    assert!(writer.write_pixels(Vec2(0, 0), Vec2(2, 3), &[&pixels, &pixels]).is_err());
}

#[test]
fn partial_writes_equal_one_large_write() {
    for mode in ALL_MODES {
        let subheader = subheader(mode, 2);
        let mut writer = ImageWriter::new(&subheader, &Identity, PAD).unwrap();

        // three rectangles covering the image, none aligned to the grid
        let rectangles = [
            (Vec2(0, 0), Vec2(6, 13)),
            (Vec2(6, 0), Vec2(4, 5)),
            (Vec2(6, 5), Vec2(4, 8)),
        ];

        for (start, size) in rectangles {
            let bands = rectangle_bands(start, size, 2);
            let refs: Vec<&[u8]> = bands.iter().map(|band| band.as_slice()).collect();
            writer.write_pixels(start, size, &refs).unwrap();
        }

        assert_eq!(writer.finish().unwrap(), write_full(&subheader), "mode {:?}", mode);
    }
}

#[test]
fn sixteen_bit_samples_keep_their_byte_order() {
    let mut subheader = ImageSubheader::new(Vec2(4, 6));
    subheader.mode = ImageMode::PixelInterleaved;
    subheader.block_count = Vec2(2, 2);
    subheader.block_size = Vec2(2, 3);
    subheader.bits_per_pixel = 16;
    subheader.bands = vec![BandInfo::default(), BandInfo::default()];

    // two bytes per sample, the second derived from the first
    let bands: Vec<Vec<u8>> = (0 .. 2_usize)
        .map(|band| {
            let mut pixels = Vec::new();
            for row in 0 .. 4 {
                for col in 0 .. 6 {
                    let high = value(row, col, band);
                    pixels.push(high);
                    pixels.push(high.wrapping_add(1));
                }
            }
            pixels
        })
        .collect();

    let mut writer = ImageWriter::new(&subheader, &Identity, PAD).unwrap();
    let refs: Vec<&[u8]> = bands.iter().map(|band| band.as_slice()).collect();
    writer.write_pixels(Vec2(0, 0), subheader.size, &refs).unwrap();
    let payload = writer.finish().unwrap();

    let window = SubWindow::entire(&subheader);
    let pixels = read_window(&subheader, &payload, &window);
    assert_eq!(pixels, bands);
}

#[test]
fn random_windows_match_a_naive_reference() {
    let payloads: Vec<(ImageSubheader, Vec<u8>)> = ALL_MODES.iter()
        .map(|&mode| {
            let subheader = subheader(mode, 3);
            let payload = write_full(&subheader);
            (subheader, payload)
        })
        .collect();

    let mut random = rand::thread_rng();

    for _ in 0 .. 60 {
        let (subheader, payload) = &payloads[random.gen_range(0 .. payloads.len())];

        let start = Vec2(random.gen_range(0 .. 10), random.gen_range(0 .. 13));
        let size = Vec2(
            random.gen_range(0 ..= 10 - start.0),
            random.gen_range(0 ..= 13 - start.1),
        );

        let bands = (0 .. random.gen_range(1 ..= 3))
            .map(|_| random.gen_range(0 .. 3))
            .collect();

        let window = SubWindow::new(start, size, bands)
            .downsampled(Vec2(random.gen_range(1 ..= 3), random.gen_range(1 ..= 3)));

        assert_eq!(
            read_window(subheader, payload, &window),
            expected_window(&window),
            "window {:?} of mode {:?}", window, subheader.mode,
        );
    }
}
