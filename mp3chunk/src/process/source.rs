use std::io::{self, Read, Seek, SeekFrom};

/// Random-access provider of compressed stream bytes.
///
/// Implementations fill `buf` with bytes starting at the absolute stream
/// `offset` and return how many were written. A count smaller than
/// `buf.len()` is the end-of-stream signal and is never retried, so
/// implementations must not return short counts for transient reasons.
pub trait DataSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: DataSource + ?Sized> DataSource for &mut T {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// In-memory stream.
#[derive(Debug, Clone)]
pub struct SliceSource<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> SliceSource<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn len(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }
}

impl<T: AsRef<[u8]>> DataSource for SliceSource<T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.as_ref();
        let start = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
        let count = buf.len().min(data.len() - start);

        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }
}

/// Stream backed by any seekable reader, typically a file.
///
/// Short reads from the underlying reader are retried until `buf` is full
/// or the reader reports end of file, so only a true end of file surfaces as
/// a short count.
#[derive(Debug)]
pub struct ReaderSource<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Total length of the underlying stream.
    pub fn stream_len(&mut self) -> io::Result<u64> {
        self.reader.seek(SeekFrom::End(0))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> DataSource for ReaderSource<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

/// Statistics gathered by [`CountingSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub reads: usize,
    pub bytes_requested: u64,
    pub bytes_returned: u64,
}

/// Wraps a source and records every request made to it.
#[derive(Debug)]
pub struct CountingSource<S> {
    inner: S,
    stats: ReadStats,
}

impl<S: DataSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: ReadStats::default(),
        }
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DataSource> DataSource for CountingSource<S> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read_at(offset, buf)?;

        self.stats.reads += 1;
        self.stats.bytes_requested += buf.len() as u64;
        self.stats.bytes_returned += count as u64;

        Ok(count)
    }
}
