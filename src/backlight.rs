//! Backlight brightness on a PWM channel
use embedded_hal::pwm::SetDutyCycle;

use crate::st7701::driver::PanelReady;

/// LEDC channel setup and the brightness scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklightConfig {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
    /// Brightness levels run from 0 to this
    pub max_level: u8,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        BacklightConfig {
            frequency_hz: 20_000,
            resolution_bits: 8,
            max_level: 100,
        }
    }
}

/// `min(level, max_level) * full_scale / max_level`
pub fn duty_for_level(level: u8, max_level: u8, full_scale: u16) -> u16 {
    if max_level == 0 {
        return 0;
    }
    let level = u32::from(level.min(max_level));
    (level * u32::from(full_scale) / u32::from(max_level)) as u16
}

pub struct Backlight<PWM> {
    pwm: PWM,
    max_level: u8,
    level: u8,
}

impl<PWM: SetDutyCycle> Backlight<PWM> {
    /// The PWM shares hardware with the RGB timing engine, so this waits for
    /// the panel to be up. Starts dark.
    pub fn new(
        pwm: PWM,
        config: &BacklightConfig,
        _ready: &PanelReady,
    ) -> Result<Self, PWM::Error> {
        let mut backlight = Backlight {
            pwm,
            max_level: config.max_level,
            level: 0,
        };
        backlight.set_level(0)?;
        Ok(backlight)
    }

    /// Set brightness, levels above the maximum are capped
    pub fn set_level(&mut self, level: u8) -> Result<(), PWM::Error> {
        let duty = duty_for_level(level, self.max_level, self.pwm.max_duty_cycle());
        log::debug!("Backlight level {} -> duty {}", level, duty);
        self.pwm.set_duty_cycle(duty)?;
        self.level = level.min(self.max_level);
        Ok(())
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}
