//! 9-bit control bus on SPI2
//!
//! The ST7701 expects a D/C bit in front of every byte. The SPI peripheral does
//! this with a 1-bit command phase carrying the tag and an 8-bit address phase
//! carrying the byte, no data phase at all.
use core::ptr;

use esp_idf_svc::sys::*;

use crate::st7701::interface::{ControlBus, Tag};

pub const SPI_CLOCK_HZ: i32 = 40_000_000;
const MAX_TRANSFER_SZ: i32 = 64;

pub struct SpiControlBus {
    handle: spi_device_handle_t,
}

// The handle is only used from the display task
unsafe impl Send for SpiControlBus {}

impl SpiControlBus {
    /// Initialize SPI2 with only SCK and MOSI and add the panel as its device.
    /// Chip select is driven separately.
    pub fn new(sclk: i32, mosi: i32) -> Result<Self, EspError> {
        #[allow(clippy::needless_update)]
        let bus_config = spi_bus_config_t {
            sclk_io_num: sclk,
            __bindgen_anon_1: spi_bus_config_t__bindgen_ty_1 { mosi_io_num: mosi },
            __bindgen_anon_2: spi_bus_config_t__bindgen_ty_2 { miso_io_num: -1 },
            __bindgen_anon_3: spi_bus_config_t__bindgen_ty_3 { quadwp_io_num: -1 },
            __bindgen_anon_4: spi_bus_config_t__bindgen_ty_4 { quadhd_io_num: -1 },
            data4_io_num: -1,
            data5_io_num: -1,
            data6_io_num: -1,
            data7_io_num: -1,
            max_transfer_sz: MAX_TRANSFER_SZ,
            flags: SPICOMMON_BUSFLAG_MASTER,
            ..Default::default()
        };
        esp!(unsafe {
            spi_bus_initialize(
                spi_host_device_t_SPI2_HOST,
                &bus_config,
                spi_common_dma_t_SPI_DMA_CH_AUTO,
            )
        })?;

        let device_config = spi_device_interface_config_t {
            command_bits: 1,
            address_bits: 8,
            mode: 0,
            clock_speed_hz: SPI_CLOCK_HZ,
            spics_io_num: -1,
            queue_size: 1,
            ..Default::default()
        };
        let mut handle: spi_device_handle_t = ptr::null_mut();
        esp!(unsafe {
            spi_bus_add_device(spi_host_device_t_SPI2_HOST, &device_config, &mut handle)
        })?;

        log::info!("Control bus on SPI2 (sck {}, mosi {}) @ {} Hz", sclk, mosi, SPI_CLOCK_HZ);
        Ok(SpiControlBus { handle })
    }
}

impl ControlBus for SpiControlBus {
    type Error = EspError;

    fn transfer(&mut self, tag: Tag, byte: u8) -> Result<(), Self::Error> {
        let mut transaction = spi_transaction_t {
            cmd: tag as u16,
            addr: u64::from(byte),
            length: 0,
            rxlength: 0,
            ..Default::default()
        };
        esp!(unsafe { spi_device_transmit(self.handle, &mut transaction) })
    }
}
