//! ST7701 Panel Command Sequencer
//!
//! Brings the panel out of reset into RGB operation by replaying the vendor
//! transcript from [`crate::st7701::init`] over the control bus.
//!
//! ## Bring-up order
//!
//! 1. [`St7701::reset`] - hardware reset pulse on the expander line
//! 1. [`St7701::run_init_sequence`] - chip select, transcript, chip select release
//! 1. the RGB data plane ([`crate::rgb::configure_data_plane`]), which needs the
//!    [`PanelReady`] token handed out by step 2
//!
//! [`St7701::init`] does steps 1 and 2.
//!
//! ## Transfer failures
//!
//! Each transfer returns a `Result`. The first failure ends the transcript and is
//! returned to the caller, there is no retry. Chip select is released on that
//! path as well, so the line is never left asserted.

pub use display_interface::DisplayError;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::st7701::init::{InitStep, ST7701_INIT};
use crate::st7701::interface::{ControlBus, PanelInterface};

/// Proof that the command transcript ran to completion.
///
/// Only [`St7701::run_init_sequence`] creates one. Steps that must come after the
/// panel is in RGB mode (data plane, backlight) take it as an argument.
#[derive(Debug)]
pub struct PanelReady {
    _private: (),
}

impl PanelReady {
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        PanelReady { _private: () }
    }
}

/// ST7701 command sequencer
///
/// ## Type Parameters
///
/// - `BUS` - 9-bit control bus
/// - `CS` - chip select output (active low)
/// - `RST` - reset output (active low)
/// - `DELAY` - delay provider, should yield to other tasks
pub struct St7701<BUS, CS, RST, DELAY> {
    /// The control bus interface
    pub interface: PanelInterface<BUS, CS, RST, DELAY>,
    transcript: &'static [InitStep],
}

impl<BUS, CS, RST, DELAY> St7701<BUS, CS, RST, DELAY>
where
    BUS: ControlBus,
    CS: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create the sequencer for the panel revision on this board. Nothing is
    /// sent until [`Self::init`] or [`Self::run_init_sequence`].
    pub fn new(bus: BUS, cs: CS, rst: RST, delay: DELAY) -> Self {
        Self::with_transcript(bus, cs, rst, delay, ST7701_INIT)
    }

    /// Same, but replaying another transcript (other panel revision)
    pub fn with_transcript(
        bus: BUS,
        cs: CS,
        rst: RST,
        delay: DELAY,
        transcript: &'static [InitStep],
    ) -> Self {
        St7701 {
            interface: PanelInterface::new(bus, cs, rst, delay),
            transcript,
        }
    }

    /// Reset and run the command transcript
    pub fn init(&mut self) -> Result<PanelReady, DisplayError> {
        log::info!("Initializing ST7701 panel");
        self.reset()?;
        self.run_init_sequence()
    }

    pub fn reset(&mut self) -> Result<(), DisplayError> {
        log::debug!("ST7701 hardware reset");
        self.interface.reset()
    }

    pub fn write_command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.interface.write_command(command)
    }

    pub fn write_data(&mut self, data: u8) -> Result<(), DisplayError> {
        self.interface.write_data(data)
    }

    /// Replay the register transcript with chip select held for its whole length.
    pub fn run_init_sequence(&mut self) -> Result<PanelReady, DisplayError> {
        self.interface.cs_enable()?;

        let replayed = self.replay();
        let released = self.interface.cs_disable();

        replayed?;
        released?;

        log::info!(
            "ST7701 transcript complete ({} commands)",
            self.transcript.len()
        );
        Ok(PanelReady { _private: () })
    }

    fn replay(&mut self) -> Result<(), DisplayError> {
        for (index, step) in self.transcript.iter().enumerate() {
            log::trace!(
                "step {}: cmd 0x{:02X} + {} bytes",
                index,
                step.cmd,
                step.data.len()
            );
            self.interface.cmd_with_data(step.cmd, step.data)?;
            if step.delay_ms > 0 {
                self.interface.delay_ms(step.delay_ms);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::st7701::interface::Tag;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::MockError;
    use std::io::ErrorKind;

    /// Fails on the n-th transfer
    struct FlakyWire {
        remaining: usize,
    }

    impl ControlBus for FlakyWire {
        type Error = ();

        fn transfer(&mut self, _tag: Tag, _byte: u8) -> Result<(), Self::Error> {
            if self.remaining == 0 {
                return Err(());
            }
            self.remaining -= 1;
            Ok(())
        }
    }

    #[test]
    fn failed_transfer_still_releases_chip_select_once() {
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut rst = PinMock::new(&[]);
        let wire = FlakyWire { remaining: 7 };
        let mut panel = St7701::new(wire, cs.clone(), rst.clone(), NoopDelay);

        let result = panel.run_init_sequence();

        assert!(matches!(result, Err(DisplayError::BusWriteError)));
        cs.done();
        rst.done();
    }

    #[test]
    fn chip_select_failure_skips_transcript() {
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low).with_error(MockError::Io(ErrorKind::Other)),
        ]);
        let mut rst = PinMock::new(&[]);
        // zero budget: any transfer would fail the test with BusWriteError instead
        let wire = FlakyWire { remaining: 0 };
        let mut panel = St7701::new(wire, cs.clone(), rst.clone(), NoopDelay);

        assert!(matches!(
            panel.run_init_sequence(),
            Err(DisplayError::CSError)
        ));
        cs.done();
        rst.done();
    }
}
