//! Page-by-page reading of a snapshot file.

use crate::db::Geometry;
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Read-ahead buffer in front of the file; several pages per blocking read.
const READ_BUFFER: usize = 64 * 1024;

/// One database page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based position in the file.
    pub index: u64,
    pub bytes: Vec<u8>,
}

/// Stream the pages of the database file at `path` in file order.
///
/// Every yielded page is exactly `page_size` bytes. A short trailing page, or
/// a total that disagrees with `page_count`, ends the stream with
/// [`ErrorKind::Corrupt`] instead of yielding a partial page.
pub fn read_pages(path: &Path, geometry: Geometry) -> impl Stream<Item = Result<Page>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let file = match File::open(path).await.or_raise(|| ErrorKind::Io) {
            Ok(file) => file,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let mut reader = BufReader::with_capacity(READ_BUFFER, file);
        let page_size = geometry.page_size as usize;
        let mut index = 0u64;
        loop {
            let mut bytes = vec![0u8; page_size];
            let filled = match fill(&mut reader, &mut bytes).await {
                Ok(filled) => filled,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            if filled == 0 {
                break;
            }
            if filled < page_size {
                yield Err(ErrorKind::Corrupt(format!("page {index} is {filled} of {page_size} bytes")).into());
                return;
            }
            if index >= geometry.page_count {
                yield Err(ErrorKind::Corrupt(format!("more than the {} pages SQLite reported", geometry.page_count)).into());
                return;
            }
            yield Ok(Page { index, bytes });
            index += 1;
        }
        if index != geometry.page_count {
            yield Err(ErrorKind::Corrupt(format!("read {index} of {} pages", geometry.page_count)).into());
        }
    })
}

/// Read until `buf` is full or EOF, returning the number of bytes read.
async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await.or_raise(|| ErrorKind::Io)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
