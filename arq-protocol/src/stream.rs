//! Chunked source reading with one chunk of lookahead
//!
//! The sender has to flag the last packet of the transfer while it is still
//! sending it, so it must know whether the chunk in hand is the final one
//! before the source reports end of data. [`ChunkReader`] keeps the next
//! chunk buffered to answer that.

use bytes::{Bytes, BytesMut};
use std::io::{self, Read};

/// A chunk read from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk contents; shorter than the chunk size only at the end of data
    pub data: Bytes,
    /// Whether no data follows this chunk
    pub is_final: bool,
}

/// Reads fixed-size chunks from a byte source
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    pending: Option<Bytes>,
    offset: u64,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        ChunkReader {
            source,
            chunk_size,
            pending: None,
            offset: 0,
        }
    }

    /// Bytes handed out so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next chunk, or `None` once the source is exhausted
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        let data = match self.pending.take() {
            Some(data) => data,
            None => self.fill()?,
        };

        if data.is_empty() {
            return Ok(None);
        }

        let next = self.fill()?;
        let is_final = next.is_empty();
        self.pending = Some(next);
        self.offset += data.len() as u64;

        Ok(Some(Chunk { data, is_final }))
    }

    /// Read until the chunk is full or the source hits end of data
    fn fill(&mut self) -> io::Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.chunk_size);
        let mut filled = 0;

        while filled < self.chunk_size {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        buf.truncate(filled);
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Source that hands out at most `step` bytes per read
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_exact_multiple_flags_last_chunk() {
        let mut reader = ChunkReader::new(Cursor::new(vec![7u8; 5000]), 5000);

        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.data.len(), 5000);
        assert!(chunk.is_final);
        assert!(reader.next_chunk().unwrap().is_none());
        assert_eq!(reader.offset(), 5000);
    }

    #[test]
    fn test_trailing_partial_chunk() {
        let mut reader = ChunkReader::new(Cursor::new(vec![1u8; 5001]), 5000);

        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(first.data.len(), 5000);
        assert!(!first.is_final);

        let second = reader.next_chunk().unwrap().unwrap();
        assert_eq!(second.data.len(), 1);
        assert!(second.is_final);

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_empty_source() {
        let mut reader = ChunkReader::new(Cursor::new(Vec::new()), 5000);
        assert!(reader.next_chunk().unwrap().is_none());
        assert_eq!(reader.offset(), 0);
    }

    #[test]
    fn test_short_reads_are_coalesced() {
        let data: Vec<u8> = (0..=255).cycle().take(1200).collect();
        let source = Trickle {
            data: data.clone(),
            pos: 0,
            step: 7,
        };
        let mut reader = ChunkReader::new(source, 1000);

        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(&first.data[..], &data[..1000]);
        let second = reader.next_chunk().unwrap().unwrap();
        assert_eq!(&second.data[..], &data[1000..]);
        assert!(second.is_final);
    }
}
