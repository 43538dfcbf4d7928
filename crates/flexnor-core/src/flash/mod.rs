//! Flash device handle and operations

mod device;
mod geometry;

pub use device::NorFlash;
pub use geometry::{FlashParameters, Geometry, PageLayout};
