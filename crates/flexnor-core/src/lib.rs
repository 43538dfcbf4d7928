//! flexnor-core - Serial NOR flash driver core
//!
//! This crate provides the control logic for a serial NOR flash device that
//! sits behind a command-sequence-programmable memory-bus controller. The
//! controller executes bus transactions described by a fixed lookup table of
//! instruction sequences and exposes the device through a memory-mapped read
//! window; this crate owns the table, the operation dispatch, and the
//! ordering rules (write-enable, busy polling, controller reset) that keep
//! the device consistent.
//!
//! It is `no_std` compatible for use in embedded environments.
//!
//! # Features
//!
//! - `std` - Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```ignore
//! use flexnor_core::controller::{Controller, Port};
//! use flexnor_core::flash::{Geometry, NorFlash};
//!
//! fn bring_up<C: Controller>(controller: &mut C) {
//!     let mut flash = NorFlash::new(controller, Port::A1, Geometry::W25Q128JV)
//!         .expect("valid geometry");
//!     match flash.init() {
//!         Ok(()) => log::info!("flash ready, {} bytes", flash.geometry().total_size),
//!         Err(e) => log::error!("bring-up failed: {}", e),
//!     }
//! }
//! ```
//!
//! # Execute-in-place hazard
//!
//! When the flash being driven also backs the code the processor is
//! executing, program and erase run inside a critical section. Every
//! function and every byte of data reached from inside that section must
//! already live outside the flash under modification; see [`flash::NorFlash`]
//! for details.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod controller;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod seq;

mod xip;

pub use error::{Error, Result};
