//! Random-access byte source backing a volume.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Absolute-offset access to a raw image.
///
/// Every call seeks first, so callers never depend on a current position.
/// Implementations must either transfer exactly `buf.len()` bytes or fail.
pub trait Storage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;
}

impl<T: Read + Write + Seek> Storage for T {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }
}
