#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod block_device;
mod cache;
pub mod error;
#[cfg(any(test, feature = "std"))]
pub mod image;
pub mod storage;
mod util;

#[cfg(test)]
mod tests_util;

pub use block_device::BlockDevice;
pub use error::ErrorKind;
pub use storage::{Geometry, HardwareError, PageId, PageStorage};
pub use util::ERASED_VALUE;

use cache::PageCache;
use log::{debug, error, info, trace, warn};
use util::{check_range, PageChunks};

/// Byte addressable view of a page granular flash.
///
/// Holds one page worth of cache. Every operation takes `&mut self`; callers sharing a
/// translator between threads have to put their own lock around it.
pub struct PageTranslator<S: PageStorage> {
    storage: S,
    geometry: Geometry,
    cache: PageCache,
}

impl<S: PageStorage> PageTranslator<S> {
    pub fn new(storage: S) -> Self {
        let geometry = storage.geometry();
        info!(
            "page translator page size: {} pages: {}",
            geometry.page_size, geometry.num_pages
        );
        PageTranslator {
            storage,
            geometry,
            cache: PageCache::new(),
        }
    }

    /// Allocate the page buffer. Range operations fail with `NotInitialized` until this
    /// succeeds.
    pub fn setup(&mut self) -> Result<(), ErrorKind> {
        debug!("setup page buffer of {} bytes", self.geometry.page_size);
        self.cache.allocate(self.geometry.page_size)
    }

    /// Release the bus. The page buffer lives as long as the translator does.
    pub fn teardown(&mut self) -> Result<(), ErrorKind> {
        debug!("teardown");
        self.storage.release_bus();
        Ok(())
    }

    pub fn read(&mut self, data: &mut [u8], addr: usize) -> Result<(), ErrorKind> {
        self.check(addr, data.len())?;
        debug!("read addr: {} size: {}", addr, data.len());

        for chunk in PageChunks::new(self.geometry.page_size, addr, data.len()) {
            trace!(
                "rd page: {} offset: {} len: {}",
                chunk.page.0,
                chunk.offset,
                chunk.len
            );
            let page = self.cache.load(&mut self.storage, chunk.page)?;
            data[chunk.pos..chunk.pos + chunk.len]
                .copy_from_slice(&page[chunk.offset..chunk.offset + chunk.len]);
        }

        Ok(())
    }

    /// Read-modify-write `data` into the pages covering `[addr, addr + data.len())`.
    ///
    /// On error the range is left in an undefined state; retrying the whole call is safe since
    /// every page is reloaded from the hardware.
    pub fn program(&mut self, data: &[u8], addr: usize) -> Result<(), ErrorKind> {
        self.check(addr, data.len())?;
        debug!("program addr: {} size: {}", addr, data.len());

        for chunk in PageChunks::new(self.geometry.page_size, addr, data.len()) {
            trace!(
                "wr page: {} offset: {} len: {}",
                chunk.page.0,
                chunk.offset,
                chunk.len
            );
            // The page has to be loaded first, writing the slot blindly would clobber the rest
            // of the page.
            let page = self.cache.load(&mut self.storage, chunk.page)?;
            page[chunk.offset..chunk.offset + chunk.len]
                .copy_from_slice(&data[chunk.pos..chunk.pos + chunk.len]);
            self.cache.store(&mut self.storage, chunk.page)?;
        }

        Ok(())
    }

    /// Erase every page overlapping `[addr, addr + size)`.
    ///
    /// The range is widened outward to whole pages and the end page is inclusive, so a size that
    /// is an exact multiple of the page size also erases the page right after the range. Callers
    /// rely on that extent; it stops at the last page of the device.
    pub fn erase(&mut self, addr: usize, size: usize) -> Result<(), ErrorKind> {
        self.check(addr, size)?;
        debug!("erase addr: {} size: {}", addr, size);

        let page_size = self.geometry.page_size;
        let start_page = addr / page_size;
        let end_page = (addr + size) / page_size;
        let stop = core::cmp::min(end_page + 1, self.geometry.num_pages);

        let erased = self.cache.fill(ERASED_VALUE)?;
        for page in start_page..stop {
            trace!("erase page: {}", page);
            self.storage
                .write_page(PageId(page), erased)
                .map_err(|e| {
                    error!("erase of page {} failed with code {}", page, e.0);
                    ErrorKind::from(e)
                })?;
        }

        // The fill clobbered the slot whatever page it held, inside the range or not.
        self.cache.invalidate();

        Ok(())
    }

    pub fn read_granularity(&self) -> usize {
        self.geometry.page_size
    }

    pub fn program_granularity(&self) -> usize {
        self.geometry.page_size
    }

    pub fn erase_granularity(&self) -> usize {
        self.geometry.page_size
    }

    pub fn total_size(&self) -> usize {
        self.geometry.total_size()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn check(&self, addr: usize, size: usize) -> Result<(), ErrorKind> {
        if !self.cache.is_allocated() {
            warn!("operation on uninitialized block device");
            return Err(ErrorKind::NotInitialized);
        }
        if self.geometry.page_size == 0 {
            return Err(ErrorKind::OutOfBounds);
        }
        check_range(self.total_size(), addr, size).map_err(|e| {
            warn!(
                "range addr: {} size: {} outside of {} bytes",
                addr,
                size,
                self.total_size()
            );
            e
        })
    }
}

impl<S: PageStorage> BlockDevice for PageTranslator<S> {
    fn setup(&mut self) -> Result<(), ErrorKind> {
        PageTranslator::setup(self)
    }

    fn teardown(&mut self) -> Result<(), ErrorKind> {
        PageTranslator::teardown(self)
    }

    fn read(&mut self, data: &mut [u8], addr: usize) -> Result<(), ErrorKind> {
        PageTranslator::read(self, data, addr)
    }

    fn program(&mut self, data: &[u8], addr: usize) -> Result<(), ErrorKind> {
        PageTranslator::program(self, data, addr)
    }

    fn erase(&mut self, addr: usize, size: usize) -> Result<(), ErrorKind> {
        PageTranslator::erase(self, addr, size)
    }

    fn read_granularity(&self) -> usize {
        PageTranslator::read_granularity(self)
    }

    fn program_granularity(&self) -> usize {
        PageTranslator::program_granularity(self)
    }

    fn erase_granularity(&self) -> usize {
        PageTranslator::erase_granularity(self)
    }

    fn total_size(&self) -> usize {
        PageTranslator::total_size(self)
    }
}
