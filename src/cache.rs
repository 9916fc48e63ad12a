use crate::error::ErrorKind;
use crate::storage::{PageId, PageStorage};
use alloc::vec::Vec;
use log::{error, trace};

/// Single page cache slot.
///
/// While `page` is `Some`, `buffer` holds exactly what the hardware holds for that page.
pub(crate) struct PageCache {
    buffer: Option<Vec<u8>>,
    page: Option<PageId>,
}

impl PageCache {
    pub(crate) const fn new() -> Self {
        PageCache {
            buffer: None,
            page: None,
        }
    }

    /// Allocate a zeroed slot of `page_size` bytes, replacing any previous one.
    pub(crate) fn allocate(&mut self, page_size: usize) -> Result<(), ErrorKind> {
        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(page_size).is_err() {
            error!("Failure to allocate page buffer of {} bytes.", page_size);
            return Err(ErrorKind::OutOfMemory);
        }
        buffer.resize(page_size, 0u8);
        self.buffer = Some(buffer);
        self.page = None;
        Ok(())
    }

    pub(crate) fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    #[cfg(test)]
    pub(crate) fn cached_page(&self) -> Option<PageId> {
        self.page
    }

    pub(crate) fn invalidate(&mut self) {
        self.page = None;
    }

    /// Make `page` the cached page, loading it from `storage` unless it is already held.
    ///
    /// On failure the slot is invalidated since the buffer may hold part of a transfer.
    pub(crate) fn load<S: PageStorage>(
        &mut self,
        storage: &mut S,
        page: PageId,
    ) -> Result<&mut [u8], ErrorKind> {
        let buffer = self.buffer.as_mut().ok_or(ErrorKind::NotInitialized)?;
        if self.page != Some(page) {
            trace!("cache load page: {}", page.0);
            self.page = None;
            if let Err(e) = storage.read_page(page, buffer) {
                error!("read of page {} failed with code {}", page.0, e.0);
                return Err(e.into());
            }
            self.page = Some(page);
        }
        Ok(&mut buffer[..])
    }

    /// Write the slot back to `page`, which must be the page it was loaded from.
    pub(crate) fn store<S: PageStorage>(
        &mut self,
        storage: &mut S,
        page: PageId,
    ) -> Result<(), ErrorKind> {
        let buffer = self.buffer.as_ref().ok_or(ErrorKind::NotInitialized)?;
        trace!("cache store page: {}", page.0);
        if let Err(e) = storage.write_page(page, buffer) {
            error!("write of page {} failed with code {}", page.0, e.0);
            self.page = None;
            return Err(e.into());
        }
        self.page = Some(page);
        Ok(())
    }

    /// Fill the slot with `value`. The slot no longer mirrors any page afterwards.
    pub(crate) fn fill(&mut self, value: u8) -> Result<&[u8], ErrorKind> {
        let buffer = self.buffer.as_mut().ok_or(ErrorKind::NotInitialized)?;
        self.page = None;
        buffer.fill(value);
        Ok(&buffer[..])
    }
}
