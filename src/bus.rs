//! CAN (TWAI) Bus Configurator
//!
//! Sizes the receive/transmit queues, picks bit timing and acceptance filter,
//! enables the alerts the telemetry loop watches, then installs and starts the
//! driver. A failure here is reported and absorbed: the dashboard keeps running
//! without live telemetry.
//!
//! The receive queue is filled from interrupt context and drained by the
//! telemetry task. Its depth is the only protection against a burst of frames
//! arriving while the task is busy, so it is sized well above the driver
//! default of 5.
use core::fmt;

use enumset::{EnumSet, EnumSetType};

/// Receive queue depth. A burst of this many frames between two drains is
/// absorbed without loss.
pub const RX_QUEUE_DEPTH: u32 = 64;
pub const TX_QUEUE_DEPTH: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusMode {
    #[default]
    Normal,
    /// Transmit without requiring acknowledgement, for bench self tests
    NoAck,
    /// Receive only, never drives the bus
    ListenOnly,
}

/// Bit timing presets for the 80 MHz APB clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitTiming {
    B125K,
    B250K,
    #[default]
    B500K,
    B1M,
}

/// Raw TWAI timing parameters of a [`BitTiming`] preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingParams {
    pub brp: u32,
    pub tseg_1: u8,
    pub tseg_2: u8,
    pub sjw: u8,
}

impl BitTiming {
    pub fn params(self) -> TimingParams {
        let brp = match self {
            BitTiming::B125K => 32,
            BitTiming::B250K => 16,
            BitTiming::B500K => 8,
            BitTiming::B1M => 4,
        };
        TimingParams {
            brp,
            tseg_1: 15,
            tseg_2: 4,
            sjw: 3,
        }
    }

    pub fn bitrate(self) -> u32 {
        match self {
            BitTiming::B125K => 125_000,
            BitTiming::B250K => 250_000,
            BitTiming::B500K => 500_000,
            BitTiming::B1M => 1_000_000,
        }
    }
}

/// Acceptance filter in the usual CAN sense: a `1` mask bit must match `filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptanceFilter {
    #[default]
    AcceptAll,
    Standard { filter: u16, mask: u16 },
    Extended { filter: u32, mask: u32 },
}

impl AcceptanceFilter {
    /// `(acceptance_code, acceptance_mask)` for the single-filter TWAI register
    /// layout, where mask bits are inverted (`1` means don't care).
    pub fn registers(self) -> (u32, u32) {
        match self {
            AcceptanceFilter::AcceptAll => (0, u32::MAX),
            AcceptanceFilter::Standard { filter, mask } => {
                (u32::from(filter) << 21, !(u32::from(mask) << 21))
            }
            AcceptanceFilter::Extended { filter, mask } => (filter << 3, !(mask << 3)),
        }
    }
}

/// Driver alert conditions, bit positions as in the TWAI alert mask
#[derive(Debug, EnumSetType)]
#[enumset(repr = "u32")]
pub enum Alert {
    TxIdle = 0,
    TxSuccess = 1,
    RxData = 2,
    BelowErrorWarning = 3,
    ErrorActive = 4,
    RecoveryInProgress = 5,
    BusRecovered = 6,
    ArbitrationLost = 7,
    AboveErrorWarning = 8,
    BusError = 9,
    TxFailed = 10,
    /// A frame was dropped because the receive queue was full
    RxQueueFull = 11,
    ErrorPassive = 12,
    BusOff = 13,
    RxFifoOverrun = 14,
    TxRetried = 15,
    PeripheralReset = 16,
}

/// Queue sizing, timing, filter and alerts for the TWAI driver. Built once at
/// boot; changing it means reinstalling the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfiguration {
    pub tx_pin: i32,
    pub rx_pin: i32,
    pub mode: BusMode,
    pub rx_queue_depth: u32,
    pub tx_queue_depth: u32,
    pub timing: BitTiming,
    pub filter: AcceptanceFilter,
    pub alerts: EnumSet<Alert>,
}

impl BusConfiguration {
    /// Telemetry defaults: normal mode, deep receive queue, 500 kbit/s, no
    /// filtering, alerts for dropped frames and bus health.
    pub fn new(tx_pin: i32, rx_pin: i32) -> Self {
        BusConfiguration {
            tx_pin,
            rx_pin,
            mode: BusMode::Normal,
            rx_queue_depth: RX_QUEUE_DEPTH,
            tx_queue_depth: TX_QUEUE_DEPTH,
            timing: BitTiming::B500K,
            filter: AcceptanceFilter::AcceptAll,
            alerts: Alert::RxQueueFull | Alert::BusError | Alert::ErrorPassive,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: BusMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn rx_queue_depth(mut self, depth: u32) -> Self {
        self.rx_queue_depth = depth;
        self
    }

    #[must_use]
    pub fn tx_queue_depth(mut self, depth: u32) -> Self {
        self.tx_queue_depth = depth;
        self
    }

    #[must_use]
    pub fn timing(mut self, timing: BitTiming) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: AcceptanceFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn alerts(mut self, alerts: EnumSet<Alert>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Flag a receive queue that cannot hold `profile`'s burst between drains
    pub fn check_burst(&self, profile: BurstProfile) -> Result<(), BusError> {
        let required = profile.required_depth();
        if self.rx_queue_depth < required {
            log::warn!(
                "rx queue depth {} cannot absorb a burst of {} frames",
                self.rx_queue_depth,
                required
            );
            return Err(BusError::QueueUndersized {
                depth: self.rx_queue_depth,
                required,
            });
        }
        Ok(())
    }
}

/// Worst case arrival pattern: `frames` land back to back, `drained` of them
/// are consumed by the telemetry task while the burst is still arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstProfile {
    pub frames: u32,
    pub drained: u32,
}

impl BurstProfile {
    /// `frames` queued before the consumer gets to run at all
    pub fn undrained(frames: u32) -> Self {
        BurstProfile { frames, drained: 0 }
    }

    pub fn required_depth(&self) -> u32 {
        self.frames.saturating_sub(self.drained)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("TWAI driver install failed")]
    InstallFailed,
    #[error("TWAI driver start failed")]
    StartFailed,
    #[error("rx queue depth {depth} is below the required {required}")]
    QueueUndersized { depth: u32, required: u32 },
}

/// Peripheral driver behind [`configure_and_start`]
pub trait BusDriver {
    type Error: fmt::Debug;

    fn install(&mut self, config: &BusConfiguration) -> Result<(), Self::Error>;

    fn start(&mut self) -> Result<(), Self::Error>;
}

/// Install the driver with `config`, then start reception. One attempt, no retry.
pub fn configure_and_start<D: BusDriver>(
    driver: &mut D,
    config: &BusConfiguration,
) -> Result<(), BusError> {
    log::info!(
        "Installing TWAI driver: tx {} rx {}, {:?} @ {} bit/s, rx queue {}, tx queue {}",
        config.tx_pin,
        config.rx_pin,
        config.mode,
        config.timing.bitrate(),
        config.rx_queue_depth,
        config.tx_queue_depth
    );

    driver.install(config).map_err(|e| {
        log::error!("Failed to install TWAI driver: {:?}", e);
        BusError::InstallFailed
    })?;
    log::info!("TWAI driver installed");

    driver.start().map_err(|e| {
        log::error!("Failed to start TWAI driver: {:?}", e);
        BusError::StartFailed
    })?;
    log::info!("TWAI driver started, alerts {:?}", config.alerts);

    Ok(())
}

/// Log the conditions in an alert set. Returns true if frames were lost.
pub fn log_alerts(alerts: EnumSet<Alert>) -> bool {
    if alerts.contains(Alert::RxQueueFull) {
        log::warn!("CAN rx queue full, frames dropped");
    }
    if alerts.contains(Alert::RxFifoOverrun) {
        log::warn!("CAN rx FIFO overrun");
    }
    if alerts.contains(Alert::BusError) {
        log::warn!("CAN bus error");
    }
    if alerts.contains(Alert::ErrorPassive) {
        log::warn!("CAN controller is error passive");
    }
    if alerts.contains(Alert::BusOff) {
        log::error!("CAN controller is bus off");
    }
    alerts.contains(Alert::RxQueueFull) || alerts.contains(Alert::RxFifoOverrun)
}

/// One received frame, undecoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u32,
    pub extended: bool,
    pub remote: bool,
    pub dlc: u8,
    pub data: [u8; 8],
}

impl CanFrame {
    pub fn new(id: u32, extended: bool, payload: &[u8]) -> Option<Self> {
        if payload.len() > 8 {
            return None;
        }
        let mut data = [0; 8];
        data[..payload.len()].copy_from_slice(payload);
        Some(CanFrame {
            id,
            extended,
            remote: false,
            dlc: payload.len() as u8,
            data,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(8))]
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}", self.id)?;
        } else {
            write!(f, "{:03X}", self.id)?;
        }
        write!(f, " [{}]", self.dlc)?;
        if self.remote {
            return write!(f, " RTR");
        }
        for byte in self.payload() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
