#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub page_size: usize,
    pub num_pages: usize,
}

impl Geometry {
    pub fn total_size(&self) -> usize {
        self.page_size.saturating_mul(self.num_pages)
    }
}

/// Opaque error code reported by the storage primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareError(pub i32);

/// Page granular flash primitive sitting underneath the translator.
///
/// Implementations transfer exactly one page per call. Partial reads or writes are not a
/// recognized outcome: either the whole page moved or an error is returned.
pub trait PageStorage {
    fn geometry(&self) -> Geometry;
    fn read_page(&mut self, page: PageId, data: &mut [u8]) -> Result<(), HardwareError>;
    fn write_page(&mut self, page: PageId, data: &[u8]) -> Result<(), HardwareError>;
    /// Release the exclusively held bus. Releasing twice must be harmless.
    fn release_bus(&mut self);
}
