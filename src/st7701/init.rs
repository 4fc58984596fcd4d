//! Register programming transcript for the ST7701 panel revision on this board.
//!
//! The table is replayed verbatim by [`crate::st7701::driver::St7701::run_init_sequence`].
//! Order matters: every `CN2BKXSEL` write switches the register bank, and the
//! entries that follow it are only meaningful in that bank. Values come from the
//! panel vendor, do not tidy them up.

use crate::st7701::cmd::{Bk0, Bk1, Bk3, Cmd};

/// One command byte, its parameter bytes, and how long to wait after the last
/// parameter before sending anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitStep {
    pub cmd: u8,
    pub data: &'static [u8],
    pub delay_ms: u32,
}

impl InitStep {
    pub const fn new(cmd: u8, data: &'static [u8]) -> Self {
        Self {
            cmd,
            data,
            delay_ms: 0,
        }
    }

    /// Same step, followed by a settle delay
    pub const fn then_wait(self, delay_ms: u32) -> Self {
        Self { delay_ms, ..self }
    }
}

const SELECT_NONE: &[u8] = &[0x77, 0x01, 0x00, 0x00, 0x00];
const SELECT_BK0: &[u8] = &[0x77, 0x01, 0x00, 0x00, 0x10];
const SELECT_BK1: &[u8] = &[0x77, 0x01, 0x00, 0x00, 0x11];
const SELECT_BK3: &[u8] = &[0x77, 0x01, 0x00, 0x00, 0x13];

/// Wait after sleep-out before touching the charge pumps again
pub const SLEEP_OUT_DELAY_MS: u32 = 120;
/// Wait after the BK3 power control write that follows sleep-out
pub const POWER_CONTROL_DELAY_MS: u32 = 10;
/// Wait after display-on
pub const DISPLAY_ON_DELAY_MS: u32 = 20;

pub const ST7701_INIT: &[InitStep] = &[
    InitStep::new(Cmd::CN2BKXSEL, SELECT_BK3),
    InitStep::new(Bk3::REG_EF, &[0x08]),
    // BK0
    InitStep::new(Cmd::CN2BKXSEL, SELECT_BK0),
    InitStep::new(Bk0::LNESET, &[0x77, 0x00]),
    InitStep::new(Bk0::PORCTRL, &[0x11, 0x0C]),
    InitStep::new(Bk0::INVSET, &[0x07, 0x02]),
    InitStep::new(Bk0::RGBCTRL, &[0x30]),
    InitStep::new(
        Bk0::PVGAMCTRL,
        &[
            0x06, 0xCF, 0x14, 0x0C, 0x0F, 0x03, 0x00, 0x0A, 0x07, 0x1B, 0x03, 0x12, 0x10, 0x25,
            0x36, 0x1E,
        ],
    ),
    InitStep::new(
        Bk0::NVGAMCTRL,
        &[
            0x0C, 0xD4, 0x18, 0x0C, 0x0E, 0x06, 0x03, 0x06, 0x08, 0x23, 0x06, 0x12, 0x10, 0x30,
            0x2F, 0x1F,
        ],
    ),
    // BK1
    InitStep::new(Cmd::CN2BKXSEL, SELECT_BK1),
    InitStep::new(Bk1::VRHS, &[0x73]),
    InitStep::new(Bk1::VCOMS, &[0x7C]),
    InitStep::new(Bk1::VGHSS, &[0x83]),
    InitStep::new(Bk1::TESTCMD, &[0x80]),
    InitStep::new(Bk1::VGLS, &[0x49]),
    InitStep::new(Bk1::PWCTRL1, &[0x87]),
    InitStep::new(Bk1::PWCTRL2, &[0x33]),
    InitStep::new(Bk1::PCLKS1, &[0x10, 0x1F]),
    InitStep::new(Bk1::PDR1, &[0x03]),
    InitStep::new(Bk1::SPD1, &[0x08]),
    InitStep::new(Bk1::SPD2, &[0x08]),
    InitStep::new(Bk1::MIPISET1, &[0x88]),
    // GIP timing
    InitStep::new(Bk1::GIP_E0, &[0x00, 0x00, 0x02, 0x00, 0x00, 0x0C]),
    InitStep::new(
        Bk1::GIP_E1,
        &[0x05, 0x96, 0x07, 0x96, 0x06, 0x96, 0x08, 0x96, 0x00, 0x44, 0x44],
    ),
    InitStep::new(
        Bk1::GIP_E2,
        &[
            0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00,
        ],
    ),
    InitStep::new(Bk1::GIP_E3, &[0x00, 0x00, 0x33, 0x33]),
    InitStep::new(Bk1::GIP_E4, &[0x44, 0x44]),
    InitStep::new(
        Bk1::GIP_E5,
        &[
            0x0D, 0xD4, 0x28, 0x8C, 0x0F, 0xD6, 0x28, 0x8C, 0x09, 0xD0, 0x28, 0x8C, 0x0B, 0xD2,
            0x28, 0x8C,
        ],
    ),
    InitStep::new(Bk1::GIP_E6, &[0x00, 0x00, 0x33, 0x33]),
    InitStep::new(Bk1::GIP_E7, &[0x44, 0x44]),
    InitStep::new(
        Bk1::GIP_E8,
        &[
            0x0E, 0xD5, 0x28, 0x8C, 0x10, 0xD7, 0x28, 0x8C, 0x0A, 0xD1, 0x28, 0x8C, 0x0C, 0xD3,
            0x28, 0x8C,
        ],
    ),
    InitStep::new(Bk1::GIP_EB, &[0x00, 0x01, 0xE4, 0xE4, 0x44, 0x00]),
    InitStep::new(
        Bk1::GIP_ED,
        &[
            0xF3, 0xC1, 0xBA, 0x0F, 0x66, 0x77, 0x44, 0x55, 0x55, 0x44, 0x77, 0x66, 0xF0, 0xAB,
            0x1C, 0x3F,
        ],
    ),
    InitStep::new(Bk1::GIP_EF, &[0x10, 0x0D, 0x04, 0x08, 0x3F, 0x1F]),
    // BK3, power-up around sleep-out
    InitStep::new(Cmd::CN2BKXSEL, SELECT_BK3),
    InitStep::new(Bk3::REG_E8, &[0x00, 0x0E]),
    InitStep::new(Cmd::SLPOUT, &[]).then_wait(SLEEP_OUT_DELAY_MS),
    InitStep::new(Bk3::REG_E8, &[0x00, 0x0C]).then_wait(POWER_CONTROL_DELAY_MS),
    InitStep::new(Bk3::REG_E8, &[0x40, 0x00]),
    // Back to system commands
    InitStep::new(Cmd::CN2BKXSEL, SELECT_NONE),
    // No rotation: software rotation is not available on the RGB interface either
    InitStep::new(Cmd::MADCTL, &[0x00]),
    InitStep::new(Cmd::COLMOD, &[0x66]),
    InitStep::new(Cmd::DISPON, &[]).then_wait(DISPLAY_ON_DELAY_MS),
];

/// Number of single-byte transfers one replay of `steps` puts on the control bus
pub fn transfer_count(steps: &[InitStep]) -> usize {
    steps.iter().map(|step| 1 + step.data.len()).sum()
}

/// Sum of the settle delays in `steps`
pub fn total_delay_ms(steps: &[InitStep]) -> u32 {
    steps.iter().map(|step| step.delay_ms).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_shape_matches_vendor_sequence() {
        assert_eq!(ST7701_INIT.len(), 43);
        assert_eq!(transfer_count(ST7701_INIT), 230);
        assert_eq!(
            total_delay_ms(ST7701_INIT),
            SLEEP_OUT_DELAY_MS + POWER_CONTROL_DELAY_MS + DISPLAY_ON_DELAY_MS
        );
    }

    #[test]
    fn transcript_starts_in_bk3_and_ends_with_display_on() {
        let first = ST7701_INIT[0];
        assert_eq!(first.cmd, Cmd::CN2BKXSEL);
        assert_eq!(first.data, SELECT_BK3);

        let last = ST7701_INIT[ST7701_INIT.len() - 1];
        assert_eq!(last.cmd, Cmd::DISPON);
        assert!(last.data.is_empty());
        assert_eq!(last.delay_ms, DISPLAY_ON_DELAY_MS);
    }

    #[test]
    fn sleep_out_is_followed_by_its_delay() {
        let slpout = ST7701_INIT
            .iter()
            .position(|step| step.cmd == Cmd::SLPOUT)
            .expect("sleep-out missing");
        assert_eq!(ST7701_INIT[slpout].delay_ms, 120);
        assert_eq!(ST7701_INIT[slpout + 1].data, &[0x00, 0x0C]);
        assert_eq!(ST7701_INIT[slpout + 1].delay_ms, 10);
    }

    #[test]
    fn system_commands_follow_command2_disable() {
        let disable = ST7701_INIT
            .iter()
            .rposition(|step| step.cmd == Cmd::CN2BKXSEL)
            .expect("bank select missing");
        assert_eq!(ST7701_INIT[disable].data, SELECT_NONE);
        let tail: Vec<u8> = ST7701_INIT[disable + 1..].iter().map(|s| s.cmd).collect();
        assert_eq!(tail, vec![Cmd::MADCTL, Cmd::COLMOD, Cmd::DISPON]);
    }
}
