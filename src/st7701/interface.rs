//! Control bus interface of the ST7701
//!
//! The panel takes 9-bit words on a 3-wire SPI: one D/C bit followed by the byte.
//! There is no separate D/C pin, the bit travels on the wire, so the transfer
//! primitive takes the tag together with the byte.
use display_interface::DisplayError;
use embedded_hal::{delay::DelayNs, digital::OutputPin};

/// Chip-select settle time, after both assert and release
pub const CS_SETTLE_MS: u32 = 10;
/// Reset pulse width (reset line held low)
pub const RESET_PULSE_MS: u32 = 10;
/// Time the controller needs after reset before it takes commands
pub const RESET_RECOVERY_MS: u32 = 50;

/// The leading bit of every 9-bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Command = 0,
    Data = 1,
}

/// Blocking single-byte transfer on the panel control bus.
///
/// One transaction in flight at a time: `transfer` returns once the word is on
/// the wire.
pub trait ControlBus {
    type Error: core::fmt::Debug;

    fn transfer(&mut self, tag: Tag, byte: u8) -> Result<(), Self::Error>;
}

impl<T: ControlBus + ?Sized> ControlBus for &mut T {
    type Error = T::Error;

    fn transfer(&mut self, tag: Tag, byte: u8) -> Result<(), Self::Error> {
        (**self).transfer(tag, byte)
    }
}

/// Control bus plus the two side-band lines the ST7701 needs
pub struct PanelInterface<BUS, CS, RST, DELAY> {
    /// 9-bit SPI
    bus: BUS,
    /// Chip select, active low. Not driven by the SPI peripheral because it sits
    /// on the IO expander.
    cs: CS,
    /// Reset, active low
    rst: RST,
    pub(crate) delay: DELAY,
}

impl<BUS, CS, RST, DELAY> PanelInterface<BUS, CS, RST, DELAY> {
    pub fn new(bus: BUS, cs: CS, rst: RST, delay: DELAY) -> Self {
        PanelInterface {
            bus,
            cs,
            rst,
            delay,
        }
    }
}

impl<BUS, CS, RST, DELAY> PanelInterface<BUS, CS, RST, DELAY>
where
    BUS: ControlBus,
    CS: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Send a command byte (tag 0)
    pub fn write_command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.bus.transfer(Tag::Command, command).map_err(|e| {
            log::error!("Control bus write error for command 0x{:02X}: {:?}", command, e);
            DisplayError::BusWriteError
        })
    }

    /// Send one parameter byte (tag 1)
    pub fn write_data(&mut self, data: u8) -> Result<(), DisplayError> {
        self.bus.transfer(Tag::Data, data).map_err(|e| {
            log::error!("Control bus write error for data 0x{:02X}: {:?}", data, e);
            DisplayError::BusWriteError
        })
    }

    /// Command followed by its parameters
    pub fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.write_command(command)?;
        data.iter().try_for_each(|&byte| self.write_data(byte))
    }

    /// Assert chip select and let it settle
    pub fn cs_enable(&mut self) -> Result<(), DisplayError> {
        self.cs.set_low().map_err(|_| DisplayError::CSError)?;
        self.delay.delay_ms(CS_SETTLE_MS);
        Ok(())
    }

    /// Release chip select and let it settle
    pub fn cs_disable(&mut self) -> Result<(), DisplayError> {
        self.cs.set_high().map_err(|_| DisplayError::CSError)?;
        self.delay.delay_ms(CS_SETTLE_MS);
        Ok(())
    }

    /// Hardware reset: pulse low, then wait for the controller to come up.
    /// The delays are minimums from the datasheet and not configurable.
    pub fn reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_RECOVERY_MS);
        Ok(())
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[derive(Default)]
    struct Wire(Vec<(Tag, u8)>);

    impl ControlBus for Wire {
        type Error = core::convert::Infallible;

        fn transfer(&mut self, tag: Tag, byte: u8) -> Result<(), Self::Error> {
            self.0.push((tag, byte));
            Ok(())
        }
    }

    struct BrokenWire;

    impl ControlBus for BrokenWire {
        type Error = &'static str;

        fn transfer(&mut self, _tag: Tag, _byte: u8) -> Result<(), Self::Error> {
            Err("no ack")
        }
    }

    #[test]
    fn command_and_data_differ_only_in_tag() {
        let mut cs = PinMock::new(&[]);
        let mut rst = PinMock::new(&[]);
        let mut wire = Wire::default();
        let mut interface = PanelInterface::new(&mut wire, cs.clone(), rst.clone(), NoopDelay);

        interface.write_command(0x3A).unwrap();
        interface.write_data(0x3A).unwrap();
        interface.cmd_with_data(0xC0, &[0x77, 0x00]).unwrap();

        assert_eq!(
            wire.0,
            vec![
                (Tag::Command, 0x3A),
                (Tag::Data, 0x3A),
                (Tag::Command, 0xC0),
                (Tag::Data, 0x77),
                (Tag::Data, 0x00),
            ]
        );
        cs.done();
        rst.done();
    }

    #[test]
    fn reset_pulses_low_then_high() {
        let mut cs = PinMock::new(&[]);
        let mut rst = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut interface =
            PanelInterface::new(Wire::default(), cs.clone(), rst.clone(), NoopDelay);

        interface.reset().unwrap();

        cs.done();
        rst.done();
    }

    #[test]
    fn failed_transfer_maps_to_bus_write_error() {
        let mut cs = PinMock::new(&[]);
        let mut rst = PinMock::new(&[]);
        let mut interface = PanelInterface::new(BrokenWire, cs.clone(), rst.clone(), NoopDelay);

        assert!(matches!(
            interface.write_command(0x11),
            Err(DisplayError::BusWriteError)
        ));
        cs.done();
        rst.done();
    }
}
