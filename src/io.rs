
//! Specialized binary input and output.
//! Uses the error handling for this crate.

pub use std::io::{Read, Write};
use std::io::{Seek, SeekFrom};

use crate::error::{Result, UnitResult};

/// Skip reading uninteresting bytes without allocating.
#[inline]
pub fn skip_bytes(read: &mut impl Read, count: u64) -> UnitResult {
    let skipped = std::io::copy(
        &mut read.by_ref().take(count),
        &mut std::io::sink()
    )?;

    if skipped != count {
        return Err(crate::error::Error::invalid("reference to out-of-bounds bytes (truncated stream?)"));
    }

    Ok(())
}

/// Read exactly `count` bytes into a new vector.
#[inline]
pub fn read_bytes(read: &mut impl Read, count: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0_u8; count];
    read.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Read exactly `COUNT` bytes into a stack array.
#[inline]
pub fn read_array<const COUNT: usize>(read: &mut impl Read) -> Result<[u8; COUNT]> {
    let mut bytes = [0_u8; COUNT];
    read.read_exact(&mut bytes)?;
    Ok(bytes)
}


/// Keep track of what byte we are at.
/// Used to compute segment data offsets while parsing,
/// and to skip back to a previous place after writing some information.
#[derive(Debug)]
pub struct Tracking<T> {

    /// Do not expose to prevent seeking without updating position
    inner: T,

    position: u64,
}

impl<T: Read> Read for Tracking<T> {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let count = self.inner.read(buffer)?;
        self.position += count as u64;
        Ok(count)
    }
}

impl<T: Write> Write for Tracking<T> {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        let count = self.inner.write(buffer)?;
        self.position += count as u64;
        Ok(count)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T> Tracking<T> {

    /// If `inner` is a reference, it must never be seeked directly,
    /// but only through this `Tracking` instance.
    pub fn new(inner: T) -> Self {
        Tracking { inner, position: 0 }
    }

    /// Current number of bytes written or read.
    pub fn byte_position(&self) -> u64 {
        self.position
    }

    /// Destructure this tracker, returning the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> Tracking<T> {

    /// Set the reader to the specified byte position.
    /// If it is only a couple of bytes forward, no seek system call is performed.
    pub fn seek_read_to(&mut self, target_position: u64) -> UnitResult {
        if target_position > self.position && target_position - self.position < 16 {
            let delta = target_position - self.position;
            skip_bytes(self, delta)?;
        }
        else if target_position != self.position {
            self.inner.seek(SeekFrom::Start(target_position))?;
            self.position = target_position;
        }

        Ok(())
    }
}

impl<T: Write + Seek> Tracking<T> {

    /// Move the writing cursor to the specified target byte index.
    /// If seeking forward, this will write zeroes.
    pub fn seek_write_to(&mut self, target_position: u64) -> UnitResult {
        if target_position < self.position {
            self.inner.seek(SeekFrom::Start(target_position))?;
            self.position = target_position;
        }
        else if target_position > self.position {
            std::io::copy(
                &mut std::io::repeat(0).take(target_position - self.position),
                self
            )?;
        }

        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tracking_read() {
        let bytes: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        let mut read = Tracking::new(Cursor::new(bytes));

        assert_eq!(read_array::<2>(&mut read).unwrap(), [0, 1]);
        assert_eq!(read.byte_position(), 2);

        read.seek_read_to(6).unwrap();
        assert_eq!(read_array::<2>(&mut read).unwrap(), [6, 7]);
        assert_eq!(read.byte_position(), 8);

        read.seek_read_to(1).unwrap();
        assert_eq!(read_bytes(&mut read, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn tracking_write() {
        let mut write = Tracking::new(Cursor::new(Vec::new()));
        write.write_all(b"ab").unwrap();
        write.seek_write_to(4).unwrap();
        write.write_all(b"cd").unwrap();
        assert_eq!(write.into_inner().into_inner(), b"ab\0\0cd");
    }

    #[test]
    fn skipping_past_the_end_fails() {
        let bytes: &[u8] = &[0, 1, 2];
        assert!(skip_bytes(&mut { bytes }, 4).is_err());
    }
}
