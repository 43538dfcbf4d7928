//! Device geometry and fixed parameters

use crate::error::{Error, Result};

/// Size layout of one flash device
///
/// Fixed per device instance and validated at handle construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Total device size in bytes
    pub total_size: u32,
    /// Smallest erase unit in bytes
    pub sector_size: u32,
    /// Larger erase unit in bytes
    pub block_size: u32,
    /// Program page size in bytes
    pub page_size: u32,
}

impl Geometry {
    /// 16 MiB device with 4 KiB sectors, 64 KiB blocks, 256 B pages
    pub const W25Q128JV: Self = Self {
        total_size: 16 * 1024 * 1024,
        sector_size: 4096,
        block_size: 64 * 1024,
        page_size: 256,
    };

    /// Check the divisibility rules between the size fields
    ///
    /// Sectors must tile blocks, blocks must tile the device, and a page may
    /// not exceed a sector.
    pub fn validate(&self) -> Result<()> {
        if self.total_size == 0 || self.sector_size == 0 || self.block_size == 0 || self.page_size == 0
        {
            return Err(Error::InvalidGeometry);
        }
        if self.block_size % self.sector_size != 0 || self.total_size % self.block_size != 0 {
            return Err(Error::InvalidGeometry);
        }
        if self.page_size > self.sector_size {
            return Err(Error::InvalidGeometry);
        }
        Ok(())
    }
}

/// Fixed write parameters of the device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashParameters {
    /// Smallest programmable unit in bytes
    pub write_block_size: u32,
    /// Byte value of erased flash
    pub erase_value: u8,
}

/// Erase-page layout of the device
///
/// Reported in erase-sector units: `page_size` here is the sector size, not
/// the program page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLayout {
    /// Number of erase pages
    pub page_count: u32,
    /// Size of each erase page in bytes
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_geometry_is_valid() {
        assert!(Geometry::W25Q128JV.validate().is_ok());
    }

    #[test]
    fn zero_fields_are_rejected() {
        let mut g = Geometry::W25Q128JV;
        g.page_size = 0;
        assert_eq!(g.validate(), Err(Error::InvalidGeometry));
    }

    #[test]
    fn sectors_must_tile_blocks() {
        let g = Geometry {
            total_size: 1 << 20,
            sector_size: 4096,
            block_size: 4096 * 3 + 1,
            page_size: 256,
        };
        assert_eq!(g.validate(), Err(Error::InvalidGeometry));
    }

    #[test]
    fn blocks_must_tile_the_device() {
        let g = Geometry {
            total_size: (1 << 20) + 4096,
            sector_size: 4096,
            block_size: 64 * 1024,
            page_size: 256,
        };
        assert_eq!(g.validate(), Err(Error::InvalidGeometry));
    }

    #[test]
    fn pages_may_not_exceed_a_sector() {
        let g = Geometry {
            total_size: 1 << 20,
            sector_size: 256,
            block_size: 64 * 1024,
            page_size: 4096,
        };
        assert_eq!(g.validate(), Err(Error::InvalidGeometry));
    }
}
