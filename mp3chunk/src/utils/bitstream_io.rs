//! Bit-level reader over byte slices.
//!
//! Thin wrapper around `bitstream_io` used by the frame header parser.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        self.bs.skip(n)
    }

    pub fn available(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits().map(|pos| self.len - pos)
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

#[test]
fn read_header_fields() -> io::Result<()> {
    let mut reader = BsIoSliceReader::from_slice(&[0xFF, 0xFB, 0x94, 0xC0]);

    assert_eq!(reader.get_n::<u16>(11)?, 0x7FF);
    assert_eq!(reader.get_n::<u8>(2)?, 0b11);
    assert_eq!(reader.get_n::<u8>(2)?, 0b01);
    assert!(reader.get()?);
    assert_eq!(reader.position()?, 16);
    assert_eq!(reader.get_n::<u8>(4)?, 9);
    reader.skip_n(4)?;
    assert_eq!(reader.available()?, 8);
    assert_eq!(reader.get_n::<u8>(2)?, 0b11);

    Ok(())
}

#[test]
fn read_past_end() {
    let mut reader = BsIoSliceReader::from_slice(&[0xFF]);
    let err = reader.get_n::<u16>(12).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}
