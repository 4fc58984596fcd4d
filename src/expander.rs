//! TCA9554 IO expander
//!
//! Panel reset and chip select are not on GPIOs but on the expander's output
//! port. [`ExioPin`] turns one expander line into an `OutputPin` so the panel
//! sequencer does not need to know.
use core::cell::RefCell;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, PinState};
use embedded_hal::i2c::I2c;

pub const TCA9554_ADDRESS: u8 = 0x20;

const REG_OUTPUT: u8 = 0x01;
const REG_CONFIG: u8 = 0x03;

/// Expander with a cached copy of its output register, so setting one line is a
/// single register write.
pub struct Tca9554<I2C> {
    i2c: I2C,
    address: u8,
    output: u8,
}

impl<I2C: I2c> Tca9554<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, TCA9554_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Tca9554 {
            i2c,
            address,
            // power-on state of the output register
            output: 0xFF,
        }
    }

    /// Drive all eight lines as outputs, starting from `initial` levels
    pub fn init_outputs(&mut self, initial: u8) -> Result<(), I2C::Error> {
        self.output = initial;
        self.i2c.write(self.address, &[REG_OUTPUT, self.output])?;
        self.i2c.write(self.address, &[REG_CONFIG, 0x00])
    }

    /// Set line `pin` (1..=8) to `level`
    pub fn set_pin(&mut self, pin: u8, level: PinState) -> Result<(), I2C::Error> {
        let Some(mask) = pin_mask(pin) else {
            log::warn!("EXIO{} does not exist, ignoring", pin);
            return Ok(());
        };
        self.output = match level {
            PinState::High => self.output | mask,
            PinState::Low => self.output & !mask,
        };
        self.i2c.write(self.address, &[REG_OUTPUT, self.output])
    }

    pub fn output_state(&self) -> u8 {
        self.output
    }
}

fn pin_mask(pin: u8) -> Option<u8> {
    match pin {
        1..=8 => Some(1 << (pin - 1)),
        _ => None,
    }
}

/// One expander line as an output pin. Several of these share the expander
/// through a `RefCell`; all users run on the display task.
pub struct ExioPin<'a, I2C> {
    expander: &'a RefCell<Tca9554<I2C>>,
    pin: u8,
}

impl<'a, I2C> ExioPin<'a, I2C> {
    pub fn new(expander: &'a RefCell<Tca9554<I2C>>, pin: u8) -> Self {
        ExioPin { expander, pin }
    }
}

impl<I2C: I2c> ErrorType for ExioPin<'_, I2C> {
    type Error = ErrorKind;
}

impl<I2C: I2c> ExioPin<'_, I2C> {
    fn drive(&mut self, level: PinState) -> Result<(), ErrorKind> {
        let mut expander = self
            .expander
            .try_borrow_mut()
            .map_err(|_| ErrorKind::Other)?;
        expander.set_pin(self.pin, level).map_err(|e| {
            log::error!("EXIO{} write failed: {:?}", self.pin, e);
            ErrorKind::Other
        })
    }
}

impl<I2C: I2c> OutputPin for ExioPin<'_, I2C> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High)
    }
}
