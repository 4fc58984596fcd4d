//! TWAI (CAN) driver
use enumset::EnumSet;
use esp_idf_svc::sys::*;

use crate::bus::{Alert, BusConfiguration, BusDriver, BusMode, CanFrame};
use crate::esp::ms_to_ticks;

/// The TWAI peripheral. There is one, the driver itself is global state in
/// ESP-IDF.
#[derive(Debug, Default)]
pub struct TwaiBus;

impl BusDriver for TwaiBus {
    type Error = EspError;

    fn install(&mut self, config: &BusConfiguration) -> Result<(), EspError> {
        let mode = match config.mode {
            BusMode::Normal => twai_mode_t_TWAI_MODE_NORMAL,
            BusMode::NoAck => twai_mode_t_TWAI_MODE_NO_ACK,
            BusMode::ListenOnly => twai_mode_t_TWAI_MODE_LISTEN_ONLY,
        };

        #[allow(clippy::needless_update)]
        let general_config = twai_general_config_t {
            mode,
            tx_io: config.tx_pin,
            rx_io: config.rx_pin,
            clkout_io: -1,
            bus_off_io: -1,
            tx_queue_len: config.tx_queue_depth,
            rx_queue_len: config.rx_queue_depth,
            alerts_enabled: config.alerts.as_repr(),
            clkout_divider: 0,
            intr_flags: ESP_INTR_FLAG_LEVEL1 as i32,
            ..Default::default()
        };

        let params = config.timing.params();
        #[allow(clippy::needless_update)]
        let timing_config = twai_timing_config_t {
            brp: params.brp,
            tseg_1: params.tseg_1,
            tseg_2: params.tseg_2,
            sjw: params.sjw,
            triple_sampling: false,
            ..Default::default()
        };

        let (acceptance_code, acceptance_mask) = config.filter.registers();
        let filter_config = twai_filter_config_t {
            acceptance_code,
            acceptance_mask,
            single_filter: true,
        };

        esp!(unsafe { twai_driver_install(&general_config, &timing_config, &filter_config) })
    }

    fn start(&mut self) -> Result<(), EspError> {
        esp!(unsafe { twai_start() })
    }
}

impl TwaiBus {
    /// Next frame from the receive queue, `None` if none arrived within `timeout_ms`
    pub fn receive(&mut self, timeout_ms: u32) -> Result<Option<CanFrame>, EspError> {
        let mut message = twai_message_t::default();
        let code = unsafe { twai_receive(&mut message, ms_to_ticks(timeout_ms)) };
        if code == ESP_ERR_TIMEOUT as esp_err_t {
            return Ok(None);
        }
        esp!(code)?;

        // SAFETY: the flags union is a plain u32 bitfield either way
        let (extended, remote) = unsafe {
            let flags = &message.__bindgen_anon_1.__bindgen_anon_1;
            (flags.extd() != 0, flags.rtr() != 0)
        };
        let dlc = message.data_length_code.min(8);
        Ok(Some(CanFrame {
            id: message.identifier,
            extended,
            remote,
            dlc,
            data: message.data,
        }))
    }

    /// Alerts raised since the last call, empty if none within `timeout_ms`
    pub fn read_alerts(&mut self, timeout_ms: u32) -> Result<EnumSet<Alert>, EspError> {
        let mut bits: u32 = 0;
        let code = unsafe { twai_read_alerts(&mut bits, ms_to_ticks(timeout_ms)) };
        if code == ESP_ERR_TIMEOUT as esp_err_t {
            return Ok(EnumSet::empty());
        }
        esp!(code)?;
        Ok(EnumSet::from_repr_truncated(bits))
    }
}
