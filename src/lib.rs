#![forbid(unsafe_code)]
#![warn(missing_copy_implementations, unused_extern_crates)]

//! Read and write NITF 2.1 / NSIF 1.0 segmented imagery containers.
//!
//! A file is a [`meta::Record`]: a file header followed by six lists of
//! segments (images, graphics, labels, texts, data extensions and
//! reserved extensions). Every segment is a fixed-layout subheader plus
//! an opaque payload. Image payloads are tiled into equally sized
//! blocks, accessed through [`block::ImageReader`] and
//! [`block::ImageWriter`].
//!
//! Metadata beyond the fixed layouts travels in tagged record
//! extensions (TREs): self-describing records whose layout is looked up
//! in a process-wide registry of [`tre::TreDescription`]s. Records with
//! no registered description survive a read-write cycle byte for byte.
//!
//! Reading is forgiving where the data allows it: malformed records
//! become [`error::Warning`]s on the parsed objects instead of failing
//! the whole file. Structural contradictions, like a subheader that
//! does not occupy its declared length, are hard errors.
//!
//! # Example
//!
//! ```no_run
//! use nsif::prelude::*;
//!
//! fn main() -> nsif::error::Result<()> {
//!     let record = Record::read_from_file("scene.ntf")?;
//!
//!     for warning in &record.warnings {
//!         eprintln!("note: {}", warning);
//!     }
//!
//!     for image in &record.images {
//!         println!(
//!             "image `{}`: {} x {} pixels, {} bands",
//!             image.subheader.id,
//!             image.subheader.size.0, image.subheader.size.1,
//!             image.subheader.bands.len(),
//!         );
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod io;
pub mod math;
pub mod field;
pub mod tre;
pub mod meta;
pub mod block;
pub mod compression;
pub mod handle;

pub mod prelude {

    // main entry points
    pub use crate::meta::{Record, Version, Writer};

    // core data types
    pub use crate::meta::{
        ImageSegment, GraphicSegment, LabelSegment, TextSegment,
        DataExtensionSegment, ReservedExtensionSegment, SegmentData,
        ImageSubheader, GraphicSubheader, LabelSubheader, TextSubheader,
        DataExtensionSubheader, ReservedExtensionSubheader,
        ImageMode, Security,
    };

    pub use crate::block::{BlockingInfo, ImageReader, ImageWriter, SubWindow};
    pub use crate::compression::{BlockCodec, Compression, Identity};
    pub use crate::field::{Field, FieldKind};
    pub use crate::tre::{Descriptor, Tre, TreCollection, TreDescription};
    pub use crate::math::Vec2;

    // secondary data types
    pub use crate::error::{Error, Result, UnitResult, Warning};
    pub use crate::tre::registry;
}
