//! Pin definitions for the ST7701 panel board and its peripherals
//!
//! GPIO numbers are used directly by the ESP-IDF drivers that are configured
//! through `esp_idf_svc::sys` (SPI control bus, RGB data plane, TWAI).

/// Pin configuration constants for the panel, bus and peripherals
pub struct Pins;

#[allow(dead_code)]
impl Pins {
    // SPI control bus (3-wire, 9-bit)
    /// SPI Clock pin
    pub const LCD_SCK: i32 = 2;
    /// SPI Master Out Slave In
    pub const LCD_MOSI: i32 = 1;

    // RGB data plane
    pub const RGB_HSYNC: i32 = 38;
    pub const RGB_VSYNC: i32 = 39;
    pub const RGB_DE: i32 = 40;
    pub const RGB_PCLK: i32 = 41;
    /// Display enable is not wired
    pub const RGB_DISP: i32 = -1;
    /// D0..D15 in RGB565 order: B0-B4, G0-G5, R0-R4
    pub const RGB_DATA: [i32; 16] = [5, 45, 48, 47, 21, 14, 13, 12, 11, 10, 9, 46, 3, 8, 18, 17];

    /// Backlight PWM
    pub const LCD_BACKLIGHT: i32 = 6;

    // I2C to the IO expander
    pub const I2C_SDA: i32 = 15;
    pub const I2C_SCL: i32 = 7;

    // CAN transceiver
    pub const CAN_TX: i32 = 44;
    pub const CAN_RX: i32 = 43;
}

/// Lines on the TCA9554 IO expander, numbered like the board silkscreen (1-based)
pub struct Exio;

#[allow(dead_code)]
impl Exio {
    /// Panel reset (active low)
    pub const LCD_RESET: u8 = 1;
    /// Touch controller reset
    pub const TOUCH_RESET: u8 = 2;
    /// Panel chip select (active low)
    pub const LCD_CS: u8 = 3;
    /// SD card chip select
    pub const SD_CS: u8 = 4;
}
