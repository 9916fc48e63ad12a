use crate::error::ErrorKind;
use crate::storage::PageId;

/// Value every byte of a page holds after an erase.
pub const ERASED_VALUE: u8 = 0xFF;

/// One page sized piece of a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) page: PageId,
    /// Offset of the chunk inside its page.
    pub(crate) offset: usize,
    /// Offset of the chunk inside the caller's buffer.
    pub(crate) pos: usize,
    pub(crate) len: usize,
}

/// Splits `[addr, addr + size)` into chunks that never cross a page boundary, in ascending
/// page order.
pub(crate) struct PageChunks {
    page_size: usize,
    addr: usize,
    pos: usize,
    remaining: usize,
}

impl PageChunks {
    pub(crate) fn new(page_size: usize, addr: usize, size: usize) -> Self {
        PageChunks {
            page_size,
            addr,
            pos: 0,
            remaining: size,
        }
    }
}

impl Iterator for PageChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining == 0 || self.page_size == 0 {
            return None;
        }

        let page = PageId(self.addr / self.page_size);
        let offset = self.addr % self.page_size;
        let len = core::cmp::min(self.page_size - offset, self.remaining);
        let chunk = Chunk {
            page,
            offset,
            pos: self.pos,
            len,
        };

        self.addr += len;
        self.pos += len;
        self.remaining -= len;
        Some(chunk)
    }
}

/// Rejects ranges that run past the end of a device of `capacity` bytes.
pub(crate) fn check_range(capacity: usize, addr: usize, size: usize) -> Result<(), ErrorKind> {
    match addr.checked_add(size) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(ErrorKind::OutOfBounds),
    }
}
