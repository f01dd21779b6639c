//! Local file input with transparent gzip decompression.
//!
//! The returned reader owns the file handle and the decoder, so both are
//! released when it is dropped, whether reading finished or failed.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;

/// Buffer size for input readers (256KB)
const INPUT_BUF_SIZE: usize = 256 * 1024;

/// Shared byte counter over raw (on-disk) bytes consumed
pub type ByteCounter = Arc<AtomicU64>;

/// Buffered input, decompressed when the file is gzipped
pub type InputReader = BufReader<Box<dyn Read + Send>>;

/// Whether a path names a gzip file (by extension, `.gz` only)
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Open a local input file: file → (gunzip) → buffered reader with byte counter.
///
/// Returns (reader, byte_counter).
pub fn open_input(path: &Path) -> io::Result<(InputReader, ByteCounter)> {
    let file = File::open(path)?;

    let counter = Arc::new(AtomicU64::new(0));
    let counting = CountingReader {
        inner: file,
        count: counter.clone(),
    };

    let inner: Box<dyn Read + Send> = if is_gzip(path) {
        Box::new(MultiGzDecoder::new(counting))
    } else {
        Box::new(counting)
    };

    Ok((BufReader::with_capacity(INPUT_BUF_SIZE, inner), counter))
}

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}
