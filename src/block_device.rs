use crate::error::ErrorKind;

/// Byte addressed block device as seen by filesystems and other upper layers.
pub trait BlockDevice {
    /// Prepare the device for use. Must run before any range operation.
    fn setup(&mut self) -> Result<(), ErrorKind>;

    /// Release the underlying peripheral.
    fn teardown(&mut self) -> Result<(), ErrorKind>;

    /// Fill `data` with the bytes starting at `addr`.
    fn read(&mut self, data: &mut [u8], addr: usize) -> Result<(), ErrorKind>;

    /// Store `data` at `addr`, leaving every other byte untouched.
    fn program(&mut self, data: &[u8], addr: usize) -> Result<(), ErrorKind>;

    /// Reset every page overlapping `[addr, addr + size)` to the erased value.
    fn erase(&mut self, addr: usize, size: usize) -> Result<(), ErrorKind>;

    fn read_granularity(&self) -> usize;
    fn program_granularity(&self) -> usize;
    fn erase_granularity(&self) -> usize;
    fn total_size(&self) -> usize;

    fn is_valid_read(&self, addr: usize, size: usize) -> bool {
        is_valid_range(addr, size, self.read_granularity(), self.total_size())
    }

    fn is_valid_program(&self, addr: usize, size: usize) -> bool {
        is_valid_range(addr, size, self.program_granularity(), self.total_size())
    }

    fn is_valid_erase(&self, addr: usize, size: usize) -> bool {
        is_valid_range(addr, size, self.erase_granularity(), self.total_size())
    }
}

fn is_valid_range(addr: usize, size: usize, granularity: usize, capacity: usize) -> bool {
    if granularity == 0 {
        return false;
    }
    let in_bounds = matches!(addr.checked_add(size), Some(end) if end <= capacity);
    in_bounds && addr % granularity == 0 && size % granularity == 0
}
