//! ST7701 RGB Panel Driver
//!
//! The ST7701 takes its configuration over a 3-wire 9-bit SPI (the control
//! bus) and its pixels over a parallel RGB interface (the data plane). This
//! module covers the control bus side: reset, chip select and the register
//! transcript that switches the controller into RGB mode.
//!
//! ### Usage
//! 1. build a [`driver::St7701`] from a [`interface::ControlBus`], the chip-select
//!    and reset lines, and a delay
//! 1. call [`driver::St7701::init`], keep the returned [`driver::PanelReady`]
//! 1. hand the token to [`crate::rgb::configure_data_plane`]
//!
//! The sequencer stays alive afterwards, the panel has to remain addressable.
#![allow(clippy::missing_errors_doc)]

pub mod cmd;
pub mod driver;
pub mod init;
pub mod interface;
pub mod pins;
