//! Flash image kept in a file or any other seekable stream.
//!
//! The image starts with a fixed header recording the geometry, followed by the pages back to
//! back. It stands in for the real chip when working on a host.

use crate::error::ErrorKind;
use crate::storage::{Geometry, HardwareError, PageId, PageStorage};
use crate::util::ERASED_VALUE;
use log::{error, info, warn};
use std::io::{self, Read, Seek, SeekFrom, Write};
use zerocopy::{AsBytes, FromBytes};

#[derive(Debug, AsBytes, FromBytes, PartialEq, Eq, Clone)]
#[repr(C)]
struct ImageMagic([u8; 4]);

#[derive(Debug, AsBytes, FromBytes, Clone, PartialEq, Eq)]
#[repr(C)]
struct Crc(u32);

const CRC_INIT: Crc = Crc(0x00000000);

const CRC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);

const IMAGE_MAGIC: ImageMagic = ImageMagic(*b"PGBD");

const IMAGE_VERSION: u32 = 0;

/// Stream failed while transferring a page.
pub const ERR_IO: i32 = -4020;
/// Page index past the end of the image.
pub const ERR_PAGE_RANGE: i32 = -4021;
/// Buffer handed to a page transfer is not exactly one page long.
pub const ERR_PAGE_LENGTH: i32 = -4022;

#[derive(Debug, AsBytes, FromBytes, Clone)]
#[repr(C)]
struct ImageHeader {
    magic: ImageMagic,
    crc: Crc,
    version: u32,
    page_size: u32,
    num_pages: u32,
    reserved: [u8; 44],
}

pub const HEADER_SIZE: usize = core::mem::size_of::<ImageHeader>();

impl Default for ImageHeader {
    fn default() -> Self {
        ImageHeader {
            magic: IMAGE_MAGIC,
            crc: CRC_INIT,
            version: IMAGE_VERSION,
            page_size: 0,
            num_pages: 0,
            reserved: [0u8; 44],
        }
    }
}

impl ImageHeader {
    fn from_geometry(geometry: &Geometry) -> Result<Self, ErrorKind> {
        let page_size = u32::try_from(geometry.page_size).map_err(|_| ErrorKind::OutOfBounds)?;
        let num_pages = u32::try_from(geometry.num_pages).map_err(|_| ErrorKind::OutOfBounds)?;
        if page_size == 0 {
            error!("Refusing to format an image with a zero page size.");
            return Err(ErrorKind::InvalidImage);
        }
        let mut header = ImageHeader {
            page_size,
            num_pages,
            ..Default::default()
        };
        header.fix_crc();
        Ok(header)
    }

    fn fix_crc(&mut self) {
        self.crc = CRC_INIT;
        self.crc = Crc(CRC.checksum(self.as_bytes()));
    }

    fn validate(&self) -> Result<Geometry, ErrorKind> {
        if self.magic != IMAGE_MAGIC {
            error!("Image magic mismatch: {:x?}", self.magic.0);
            return Err(ErrorKind::InvalidImage);
        }
        if self.version != IMAGE_VERSION {
            error!("Unsupported image version: {}", self.version);
            return Err(ErrorKind::InvalidImage);
        }
        let mut expected = self.clone();
        expected.fix_crc();
        if expected.crc != self.crc {
            error!(
                "Image header crc mismatch: 0x{:08x} != 0x{:08x}",
                self.crc.0, expected.crc.0
            );
            return Err(ErrorKind::InvalidImage);
        }
        if self.page_size == 0 {
            error!("Image declares a zero page size.");
            return Err(ErrorKind::InvalidImage);
        }
        Ok(Geometry {
            page_size: self.page_size as usize,
            num_pages: self.num_pages as usize,
        })
    }
}

/// `PageStorage` backed by a seekable byte stream.
pub struct ImageStorage<T: Read + Write + Seek> {
    inner: T,
    geometry: Geometry,
}

impl<T: Read + Write + Seek> ImageStorage<T> {
    /// Write a fresh header and fill every page with the erased value.
    pub fn format(mut inner: T, geometry: Geometry) -> Result<Self, ErrorKind> {
        let header = ImageHeader::from_geometry(&geometry)?;
        info!(
            "format image page size: {} pages: {}",
            geometry.page_size, geometry.num_pages
        );

        let erased = vec![ERASED_VALUE; geometry.page_size];
        let result = inner.seek(SeekFrom::Start(0)).and_then(|_| {
            inner.write_all(header.as_bytes())?;
            for _ in 0..geometry.num_pages {
                inner.write_all(&erased)?;
            }
            inner.flush()
        });
        result.map_err(io_error)?;

        Ok(ImageStorage { inner, geometry })
    }

    /// Open an image previously written by `format`.
    pub fn open(mut inner: T) -> Result<Self, ErrorKind> {
        let mut header = ImageHeader::default();
        inner
            .seek(SeekFrom::Start(0))
            .and_then(|_| inner.read_exact(header.as_bytes_mut()))
            .map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    error!("Image too short to hold a header.");
                    ErrorKind::InvalidImage
                } else {
                    io_error(e)
                }
            })?;
        let geometry = header.validate()?;
        info!(
            "open image page size: {} pages: {}",
            geometry.page_size, geometry.num_pages
        );
        Ok(ImageStorage { inner, geometry })
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn seek_page(&mut self, page: PageId, len: usize) -> Result<(), HardwareError> {
        if page.0 >= self.geometry.num_pages {
            error!("page {} outside of image", page.0);
            return Err(HardwareError(ERR_PAGE_RANGE));
        }
        if len != self.geometry.page_size {
            error!("page transfer of {} bytes", len);
            return Err(HardwareError(ERR_PAGE_LENGTH));
        }
        let pos = HEADER_SIZE + page.0 * self.geometry.page_size;
        self.inner
            .seek(SeekFrom::Start(pos as u64))
            .map_err(|e| HardwareError(io_code(e)))?;
        Ok(())
    }
}

impl<T: Read + Write + Seek> PageStorage for ImageStorage<T> {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn read_page(&mut self, page: PageId, data: &mut [u8]) -> Result<(), HardwareError> {
        self.seek_page(page, data.len())?;
        self.inner
            .read_exact(data)
            .map_err(|e| HardwareError(io_code(e)))
    }

    fn write_page(&mut self, page: PageId, data: &[u8]) -> Result<(), HardwareError> {
        self.seek_page(page, data.len())?;
        self.inner
            .write_all(data)
            .map_err(|e| HardwareError(io_code(e)))
    }

    fn release_bus(&mut self) {
        if let Err(e) = self.inner.flush() {
            warn!("flush on release failed: {}", e);
        }
    }
}

fn io_code(e: io::Error) -> i32 {
    error!("image io failure: {}", e);
    ERR_IO
}

fn io_error(e: io::Error) -> ErrorKind {
    ErrorKind::Hardware(io_code(e))
}
