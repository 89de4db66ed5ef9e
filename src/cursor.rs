use crate::error::{Error, Result};

/// Big-endian reads over a borrowed byte slice.
///
/// Every read advances the cursor; reading past the end of the buffer is a
/// [`Error::ShortBuffer`], never a panic. Cursors are cheap to clone and can
/// be re-seated to an absolute offset, which is how pointer-following works
/// throughout this crate: a cursor is cloned, seeked to the pointer's
/// target, and read from independently of the cursor that produced it.
#[derive(Clone, Copy)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// A cursor over the same buffer, seeked to `pos`.
    pub(crate) fn at(buf: &'a [u8], pos: u64) -> Result<Self> {
        let pos = usize::try_from(pos).map_err(|_| Error::InvalidPointer(pos))?;
        if pos > buf.len() {
            return Err(Error::InvalidPointer(pos as u64));
        }
        Ok(Self { buf, pos })
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos as u64
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::ShortBuffer);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[allow(dead_code)]
    pub(crate) fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Pointer width is 8 bytes for `version >= 11`, else 4; a value of `0`
    /// is a null terminator, not an offset, and is returned as-is so callers
    /// can check for it.
    pub(crate) fn read_pointer(&mut self, version: u32) -> Result<u64> {
        if version >= 11 {
            Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
        } else {
            Ok(u64::from(self.read_u32()?))
        }
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Reads `len` bytes and decodes everything up to the first NUL (or the
    /// whole field, if none is found) as lossy UTF-8.
    pub(crate) fn read_fixed_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Reads a NUL-terminated, 8-bit string of unbounded length, consuming
    /// the terminator.
    pub(crate) fn read_cstr(&mut self) -> Result<String> {
        let nul = self.buf[self.pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::ShortBuffer)?;

        let s = String::from_utf8_lossy(&self.buf[self.pos..self.pos + nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let buf = [0x00, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&buf);

        assert_eq!(cursor.read_u32().unwrap(), 256);
        assert_eq!(cursor.read_i32().unwrap(), -1);
    }

    #[test]
    fn pointer_width_depends_on_version() {
        let wide = [0, 0, 0, 0, 0, 0, 0, 42];
        assert_eq!(ByteCursor::new(&wide).read_pointer(11).unwrap(), 42);

        let narrow = [0, 0, 0, 42];
        assert_eq!(ByteCursor::new(&narrow).read_pointer(10).unwrap(), 42);
    }

    #[test]
    fn short_buffer_is_an_error_not_a_panic() {
        let buf = [0u8; 2];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(cursor.read_u32(), Err(Error::ShortBuffer)));
    }

    #[test]
    fn fixed_str_trims_at_nul() {
        let mut buf = [0u8; 8];
        buf[..5].copy_from_slice(b"tile\0");
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(cursor.read_fixed_str(8).unwrap(), "tile");
    }

    #[test]
    fn cstr_reads_until_nul_and_consumes_it() {
        let buf = b"abc\0def";
        let mut cursor = ByteCursor::new(buf);
        assert_eq!(cursor.read_cstr().unwrap(), "abc");
        assert_eq!(cursor.read_bytes(3).unwrap(), b"def");
    }

    #[test]
    fn seeking_to_out_of_range_offset_is_invalid_pointer() {
        let buf = [0u8; 4];
        assert!(matches!(
            ByteCursor::at(&buf, 100),
            Err(Error::InvalidPointer(100))
        ));
    }
}
