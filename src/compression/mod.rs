
//! Contains the compression code definition and the pluggable
//! per-block codec interface.
//!
//! The container itself only records a two-character compression code in
//! each image subheader. The actual codecs (JPEG families and vendor
//! schemes) are external collaborators: callers inject a [`BlockCodec`]
//! when opening an image for reading or writing. Uncompressed and
//! masked-uncompressed images use the built-in [`Identity`] codec.

use crate::error::{Error, Result};

/// A byte vector.
pub type ByteVec = Vec<u8>;

/// The compression code of an image segment (the `IC` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {

    /// Store uncompressed blocks (`NC`).
    /// Blocks can be located by plain arithmetic and read directly.
    Uncompressed,

    /// Store uncompressed blocks with a block mask (`NM`).
    /// The pixel bytes themselves are identical to `NC`.
    UncompressedMasked,

    /// Any other two-character code from the standard, like `C3` or `C8`.
    /// Requires the caller to inject a matching codec.
    Other([u8; 2]),
}

impl Compression {

    /// Parse the two-character wire code.
    pub fn from_code(code: &str) -> Result<Self> {
        Ok(match code {
            "NC" => Compression::Uncompressed,
            "NM" => Compression::UncompressedMasked,

            other => {
                let bytes = other.as_bytes();
                if bytes.len() != 2 {
                    return Err(Error::invalid("compression code must be two characters"));
                }

                Compression::Other([bytes[0], bytes[1]])
            },
        })
    }

    /// The two-character wire code.
    pub fn code(&self) -> String {
        match self {
            Compression::Uncompressed => "NC".to_owned(),
            Compression::UncompressedMasked => "NM".to_owned(),
            Compression::Other(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Whether the pixel bytes are stored without a codec.
    pub fn is_uncompressed(&self) -> bool {
        matches!(self, Compression::Uncompressed | Compression::UncompressedMasked)
    }

    /// Whether the subheader carries a compression rate field.
    /// Uncompressed variants omit it.
    pub(crate) fn has_rate_field(&self) -> bool {
        !self.is_uncompressed()
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} compression", self.code())
    }
}


/// Compresses and decompresses single image blocks.
///
/// Block offsets are computed as `block_index * encoded_block_len`,
/// so a codec must produce the same encoded length for every block
/// of an image. Codecs that cannot guarantee this cannot be used
/// with this container layout.
pub trait BlockCodec {

    /// The on-disk byte length of every encoded block,
    /// given the uncompressed block byte length.
    fn encoded_len(&self, decoded_len: usize) -> usize;

    /// Decode one block. Must produce exactly `decoded_len` bytes.
    fn decompress(&self, encoded: &[u8], decoded_len: usize) -> Result<ByteVec>;

    /// Encode one block. Must produce exactly `self.encoded_len(decoded.len())` bytes.
    fn compress(&self, decoded: &[u8]) -> Result<ByteVec>;
}

/// The codec for uncompressed images: bytes pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl BlockCodec for Identity {

    fn encoded_len(&self, decoded_len: usize) -> usize { decoded_len }

    fn decompress(&self, encoded: &[u8], decoded_len: usize) -> Result<ByteVec> {
        if encoded.len() != decoded_len {
            return Err(Error::invalid("uncompressed block has unexpected length"));
        }

        Ok(encoded.to_vec())
    }

    fn compress(&self, decoded: &[u8]) -> Result<ByteVec> {
        Ok(decoded.to_vec())
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in ["NC", "NM", "C3", "C8", "I1"] {
            assert_eq!(Compression::from_code(code).unwrap().code(), code);
        }

        assert!(Compression::from_code("XYZ").is_err());
    }

    #[test]
    fn identity_is_lossless() {
        let bytes = [1_u8, 2, 3, 4];
        let encoded = Identity.compress(&bytes).unwrap();
        assert_eq!(Identity.encoded_len(4), encoded.len());
        assert_eq!(Identity.decompress(&encoded, 4).unwrap(), bytes);
        assert!(Identity.decompress(&encoded, 7).is_err());
    }
}
