use crate::storage::{Geometry, HardwareError, PageId, PageStorage};
use crate::util::ERASED_VALUE;
use crate::PageTranslator;
use alloc::vec;
use alloc::vec::Vec;

/// Code returned by `RamStorage` for page indices past the end of the device.
const ERR_PAGE_RANGE: i32 = -4010;

/// In-memory flash that records every primitive call.
pub(crate) struct RamStorage {
    geometry: Geometry,
    bytes: Vec<u8>,
    pub(crate) page_reads: Vec<PageId>,
    pub(crate) page_writes: Vec<PageId>,
    pub(crate) bus_releases: usize,
    read_error: Option<i32>,
    write_error: Option<(Option<PageId>, i32)>,
}

impl RamStorage {
    pub(crate) fn new(page_size: usize, num_pages: usize) -> Self {
        RamStorage {
            geometry: Geometry {
                page_size,
                num_pages,
            },
            bytes: vec![ERASED_VALUE; page_size * num_pages],
            page_reads: Vec::new(),
            page_writes: Vec::new(),
            bus_releases: 0,
            read_error: None,
            write_error: None,
        }
    }

    /// Geometry is reported as given but no backing memory is reserved.
    pub(crate) fn without_memory(page_size: usize, num_pages: usize) -> Self {
        let mut storage = RamStorage::new(0, 0);
        storage.geometry = Geometry {
            page_size,
            num_pages,
        };
        storage
    }

    pub(crate) fn page(&self, page: usize) -> &[u8] {
        let page_size = self.geometry.page_size;
        &self.bytes[page * page_size..(page + 1) * page_size]
    }

    pub(crate) fn fill_page(&mut self, page: usize, value: u8) {
        let page_size = self.geometry.page_size;
        for b in &mut self.bytes[page * page_size..(page + 1) * page_size] {
            *b = value;
        }
    }

    pub(crate) fn fail_reads_with(&mut self, code: i32) {
        self.read_error = Some(code);
    }

    pub(crate) fn fail_writes_with(&mut self, code: i32) {
        self.write_error = Some((None, code));
    }

    pub(crate) fn fail_writes_on(&mut self, page: PageId, code: i32) {
        self.write_error = Some((Some(page), code));
    }

    pub(crate) fn heal(&mut self) {
        self.read_error = None;
        self.write_error = None;
    }

    pub(crate) fn clear_log(&mut self) {
        self.page_reads.clear();
        self.page_writes.clear();
    }

    fn range(&self, page: PageId) -> Result<core::ops::Range<usize>, HardwareError> {
        if page.0 >= self.geometry.num_pages {
            return Err(HardwareError(ERR_PAGE_RANGE));
        }
        let start = page.0 * self.geometry.page_size;
        Ok(start..start + self.geometry.page_size)
    }
}

impl PageStorage for RamStorage {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn read_page(&mut self, page: PageId, data: &mut [u8]) -> Result<(), HardwareError> {
        self.page_reads.push(page);
        if let Some(code) = self.read_error {
            // Simulate a transfer that died halfway through.
            let half = data.len() / 2;
            for b in &mut data[..half] {
                *b = 0x5A;
            }
            return Err(HardwareError(code));
        }
        let range = self.range(page)?;
        data.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_page(&mut self, page: PageId, data: &[u8]) -> Result<(), HardwareError> {
        self.page_writes.push(page);
        match self.write_error {
            Some((None, code)) => return Err(HardwareError(code)),
            Some((Some(failing), code)) if failing == page => return Err(HardwareError(code)),
            _ => {}
        }
        let range = self.range(page)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn release_bus(&mut self) {
        self.bus_releases += 1;
    }
}

pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn make_translator(storage: RamStorage) -> PageTranslator<RamStorage> {
    let mut translator = PageTranslator::new(storage);
    translator.setup().unwrap();
    translator
}

/// Deterministic payload of `len` bytes.
pub(crate) fn payload(len: usize) -> Vec<u8> {
    rust_counter_strings::generate(len).as_bytes().to_vec()
}
