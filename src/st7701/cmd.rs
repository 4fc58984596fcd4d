/// System function commands, valid regardless of the selected register bank.
pub struct Cmd;
impl Cmd {
    pub const SLPOUT: u8 = 0x11;
    pub const DISPON: u8 = 0x29;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;

    /// Command2 bank select. Everything written after it lands in the bank it
    /// names, until the next bank select.
    pub const CN2BKXSEL: u8 = 0xFF;
}

/// Command2 BK0: display line and gamma setup
pub struct Bk0;
impl Bk0 {
    pub const PVGAMCTRL: u8 = 0xB0;
    pub const NVGAMCTRL: u8 = 0xB1;
    pub const LNESET: u8 = 0xC0;
    pub const PORCTRL: u8 = 0xC1;
    pub const INVSET: u8 = 0xC2;
    pub const RGBCTRL: u8 = 0xCC;
}

/// Command2 BK1: power and gate-in-panel (GIP) timing
pub struct Bk1;
impl Bk1 {
    pub const VRHS: u8 = 0xB0;
    pub const VCOMS: u8 = 0xB1;
    pub const VGHSS: u8 = 0xB2;
    pub const TESTCMD: u8 = 0xB3;
    pub const VGLS: u8 = 0xB5;
    pub const PWCTRL1: u8 = 0xB7;
    pub const PWCTRL2: u8 = 0xB8;
    pub const PCLKS1: u8 = 0xB9;
    pub const PDR1: u8 = 0xBB;
    pub const SPD1: u8 = 0xC1;
    pub const SPD2: u8 = 0xC2;
    pub const MIPISET1: u8 = 0xD0;
    pub const GIP_E0: u8 = 0xE0;
    pub const GIP_E1: u8 = 0xE1;
    pub const GIP_E2: u8 = 0xE2;
    pub const GIP_E3: u8 = 0xE3;
    pub const GIP_E4: u8 = 0xE4;
    pub const GIP_E5: u8 = 0xE5;
    pub const GIP_E6: u8 = 0xE6;
    pub const GIP_E7: u8 = 0xE7;
    pub const GIP_E8: u8 = 0xE8;
    pub const GIP_EB: u8 = 0xEB;
    pub const GIP_ED: u8 = 0xED;
    pub const GIP_EF: u8 = 0xEF;
}

/// Command2 BK3: vendor-private registers, only documented by value
pub struct Bk3;
impl Bk3 {
    pub const REG_E8: u8 = 0xE8;
    pub const REG_EF: u8 = 0xEF;
}

/*
Bank select payloads (after 0xFF):
77 01 00 00 00 - Command2 disabled, system commands only
77 01 00 00 10 - BK0
77 01 00 00 11 - BK1
77 01 00 00 13 - BK3
*/
