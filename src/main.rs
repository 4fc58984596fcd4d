//! Dashboard firmware
//!
//! Boot order: CAN first, since it runs on its own, then the display (expander,
//! panel transcript, data plane, draw buffers, flush callback, backlight). A
//! failure in either half is logged and the other half keeps running.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!(
        "can-dashboard is firmware for ESP-IDF targets, build it for xtensa-esp32s3-espidf"
    )
}

#[cfg(target_os = "espidf")]
mod firmware {
    use core::cell::RefCell;
    use std::time::{Duration, Instant};

    use anyhow::anyhow;

    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{Gpio15, Gpio6, Gpio7};
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver, I2C0};
    use esp_idf_svc::hal::ledc::config::TimerConfig;
    use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, CHANNEL0, TIMER0};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;

    use can_dashboard::backlight::Backlight;
    use can_dashboard::bus::{configure_and_start, log_alerts};
    use can_dashboard::config::{self, CanvasLayout};
    use can_dashboard::display::{bring_up, Display};
    use can_dashboard::esp::control_bus::SpiControlBus;
    use can_dashboard::esp::heap::EspDmaAllocator;
    use can_dashboard::esp::rgb_panel::{EspRgbPanel, EspRgbPanelFactory};
    use can_dashboard::esp::twai::TwaiBus;
    use can_dashboard::expander::{ExioPin, Tca9554};
    use can_dashboard::splash::{self, BusStatus, STATUS_AREA};
    use can_dashboard::st7701::driver::St7701;
    use can_dashboard::st7701::pins::{Exio, Pins};

    /// Status line refresh period
    const STATUS_REFRESH: Duration = Duration::from_millis(500);
    /// Wait for the first frame of a drain pass; the rest are taken without waiting
    const RX_WAIT_MS: u32 = 10;

    type Expander = Tca9554<I2cDriver<'static>>;
    type PanelPin = ExioPin<'static, I2cDriver<'static>>;

    struct Dashboard {
        display: Display<SpiControlBus, PanelPin, PanelPin, FreeRtos, EspRgbPanel, EspDmaAllocator>,
        backlight: Backlight<LedcDriver<'static>>,
    }

    impl Dashboard {
        fn render(&mut self, status: &BusStatus) {
            let result = self.display.gfx.refresh(|target| {
                // drawing into a stripe cannot fail
                let _ = splash::draw(target, status);
            });
            if let Err(e) = result {
                log::error!("Render failed: {}", e);
            }
        }
    }

    // https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
    pub fn run() -> anyhow::Result<()> {
        // It is necessary to call this function once. Otherwise some patches to the runtime
        // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
        esp_idf_svc::sys::link_patches();

        // Bind the log crate to the ESP Logging facilities
        esp_idf_svc::log::EspLogger::initialize_default();

        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let mut twai = TwaiBus::default();
        let mut status = BusStatus::default();
        match configure_and_start(&mut twai, &config::bus_config()) {
            Ok(()) => status.online = true,
            Err(e) => log::warn!("Continuing without CAN telemetry: {}", e),
        }

        let mut dashboard = match start_display(
            peripherals.i2c0,
            pins.gpio15,
            pins.gpio7,
            peripherals.ledc.timer0,
            peripherals.ledc.channel0,
            pins.gpio6,
        ) {
            Ok(dashboard) => Some(dashboard),
            Err(e) => {
                log::error!("Display unavailable: {:?}", e);
                None
            }
        };

        if let Some(dashboard) = dashboard.as_mut() {
            dashboard.render(&status);
            // light up only once there is something to see
            if let Err(e) = dashboard.backlight.set_level(config::DEFAULT_BRIGHTNESS) {
                log::error!("Backlight: {:?}", e);
            }
        }

        let mut last_render = Instant::now();
        loop {
            if status.online {
                drain(&mut twai, &mut status);
            } else {
                FreeRtos::delay_ms(100);
            }

            if last_render.elapsed() >= STATUS_REFRESH {
                if let Some(dashboard) = dashboard.as_mut() {
                    dashboard.display.gfx.invalidate(STATUS_AREA);
                    dashboard.render(&status);
                }
                last_render = Instant::now();
            }
        }
    }

    /// Empty the receive queue, then check the alerts
    fn drain(twai: &mut TwaiBus, status: &mut BusStatus) {
        let mut wait = RX_WAIT_MS;
        loop {
            match twai.receive(wait) {
                Ok(Some(frame)) => {
                    log::debug!("rx {}", frame);
                    status.frames = status.frames.wrapping_add(1);
                    wait = 0;
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("twai_receive: {:?}", e);
                    break;
                }
            }
        }

        match twai.read_alerts(0) {
            Ok(alerts) => {
                if log_alerts(alerts) {
                    status.dropped_alerts = status.dropped_alerts.wrapping_add(1);
                }
            }
            Err(e) => log::warn!("twai_read_alerts: {:?}", e),
        }
    }

    fn start_display(
        i2c: I2C0,
        sda: Gpio15,
        scl: Gpio7,
        timer: TIMER0,
        channel: CHANNEL0,
        backlight_pin: Gpio6,
    ) -> anyhow::Result<Dashboard> {
        log::info!("Configuring I2C for the IO expander");
        let i2c = I2cDriver::new(i2c, sda, scl, &I2cConfig::new().baudrate(400.kHz().into()))?;

        // Panel pins borrow the expander for the rest of the firmware's life
        let expander: &'static RefCell<Expander> =
            Box::leak(Box::new(RefCell::new(Tca9554::new(i2c))));
        expander
            .borrow_mut()
            .init_outputs(0xFF)
            .map_err(|e| anyhow!("IO expander init failed: {:?}", e))?;

        let bus = SpiControlBus::new(Pins::LCD_SCK, Pins::LCD_MOSI)?;
        let sequencer = St7701::new(
            bus,
            ExioPin::new(expander, Exio::LCD_CS),
            ExioPin::new(expander, Exio::LCD_RESET),
            FreeRtos,
        );

        let display = bring_up(
            sequencer,
            &mut EspRgbPanelFactory,
            &config::data_plane_config(),
            &EspDmaAllocator,
            &CanvasLayout::default(),
        )?;

        let backlight_config = config::backlight_config();
        let resolution = match backlight_config.resolution_bits {
            8 => Resolution::Bits8,
            10 => Resolution::Bits10,
            12 => Resolution::Bits12,
            bits => return Err(anyhow!("Unsupported backlight resolution: {} bits", bits)),
        };
        let timer = LedcTimerDriver::new(
            timer,
            &TimerConfig::default()
                .frequency(backlight_config.frequency_hz.Hz().into())
                .resolution(resolution),
        )?;
        let pwm = LedcDriver::new(channel, timer, backlight_pin)?;
        let backlight = Backlight::new(pwm, &backlight_config, display.ready())
            .map_err(|e| anyhow!("Backlight init failed: {:?}", e))?;
        log::info!(
            "Backlight on GPIO{} @ {} Hz",
            Pins::LCD_BACKLIGHT,
            backlight_config.frequency_hz
        );

        Ok(Dashboard { display, backlight })
    }
}
