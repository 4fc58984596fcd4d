//! Test doubles shared by the integration tests
//!
//! Bus, pins, clock and panel all append to one event log, so ordering across
//! them can be asserted.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use can_dashboard::buffers::{DmaAllocator, SystemDmaAllocator};
use can_dashboard::bus::{Alert, BusConfiguration, BusDriver, CanFrame};
use can_dashboard::rgb::{DataPlaneConfig, RgbPanel, RgbPanelFactory};
use can_dashboard::st7701::driver::St7701;
use can_dashboard::st7701::interface::{ControlBus, Tag};
use core::alloc::Layout;
use core::ptr::NonNull;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use enumset::EnumSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Transfer(Tag, u8),
    Cs(bool),
    Rst(bool),
    Sleep(u32),
    PanelCreated,
    PanelReset,
    PanelInit,
    Draw(u16, u16, u16, u16, usize),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Transfers only
pub fn transfers(log: &Log) -> Vec<(Tag, u8)> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Transfer(tag, byte) => Some((*tag, *byte)),
            _ => None,
        })
        .collect()
}

pub struct RecordingBus {
    log: Log,
    /// Transfers that still succeed, `None` for unlimited
    budget: Option<usize>,
}

impl RecordingBus {
    pub fn new(log: &Log) -> Self {
        RecordingBus {
            log: log.clone(),
            budget: None,
        }
    }

    pub fn failing_after(log: &Log, transfers: usize) -> Self {
        RecordingBus {
            log: log.clone(),
            budget: Some(transfers),
        }
    }
}

impl ControlBus for RecordingBus {
    type Error = &'static str;

    fn transfer(&mut self, tag: Tag, byte: u8) -> Result<(), Self::Error> {
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Err("wire broken");
            }
            *budget -= 1;
        }
        self.log.borrow_mut().push(Event::Transfer(tag, byte));
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub enum Line {
    Cs,
    Rst,
}

pub struct RecordingPin {
    log: Log,
    line: Line,
}

impl RecordingPin {
    pub fn new(log: &Log, line: Line) -> Self {
        RecordingPin {
            log: log.clone(),
            line,
        }
    }

    fn record(&mut self, high: bool) {
        let event = match self.line {
            Line::Cs => Event::Cs(high),
            Line::Rst => Event::Rst(high),
        };
        self.log.borrow_mut().push(event);
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true);
        Ok(())
    }
}

/// Delay that only advances a counter
pub struct FakeClock {
    log: Log,
    elapsed_ns: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new(log: &Log) -> (Self, Rc<Cell<u64>>) {
        let elapsed = Rc::new(Cell::new(0));
        (
            FakeClock {
                log: log.clone(),
                elapsed_ns: elapsed.clone(),
            },
            elapsed,
        )
    }
}

impl DelayNs for FakeClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Sleep(ms));
        self.elapsed_ns
            .set(self.elapsed_ns.get() + u64::from(ms) * 1_000_000);
    }
}

pub type TestPanel = St7701<RecordingBus, RecordingPin, RecordingPin, FakeClock>;

/// Sequencer wired to recording doubles, plus its elapsed-time counter
pub fn sequencer(log: &Log) -> (TestPanel, Rc<Cell<u64>>) {
    sequencer_with_bus(log, RecordingBus::new(log))
}

pub fn sequencer_with_bus(log: &Log, bus: RecordingBus) -> (TestPanel, Rc<Cell<u64>>) {
    let (clock, elapsed) = FakeClock::new(log);
    let panel = St7701::new(
        bus,
        RecordingPin::new(log, Line::Cs),
        RecordingPin::new(log, Line::Rst),
        clock,
    );
    (panel, elapsed)
}

pub struct FakePanel {
    log: Log,
}

impl RgbPanel for FakePanel {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::PanelReset);
        Ok(())
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::PanelInit);
        Ok(())
    }

    fn draw_bitmap(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
        pixels: &[u8],
    ) -> Result<(), Self::Error> {
        self.log
            .borrow_mut()
            .push(Event::Draw(x_start, y_start, x_end, y_end, pixels.len()));
        Ok(())
    }
}

pub struct FakeFactory {
    log: Log,
    pub refuse: bool,
}

impl FakeFactory {
    pub fn new(log: &Log) -> Self {
        FakeFactory {
            log: log.clone(),
            refuse: false,
        }
    }

    pub fn panel(log: &Log) -> FakePanel {
        FakePanel { log: log.clone() }
    }
}

impl RgbPanelFactory for FakeFactory {
    type Panel = FakePanel;
    type Error = &'static str;

    fn create(&mut self, _config: &DataPlaneConfig) -> Result<FakePanel, Self::Error> {
        if self.refuse {
            return Err("ESP_ERR_NO_MEM");
        }
        self.log.borrow_mut().push(Event::PanelCreated);
        Ok(FakePanel {
            log: self.log.clone(),
        })
    }
}

/// Refuses the allocation with the given index (0 based), system memory otherwise
#[derive(Clone)]
pub struct FailingAllocator {
    fail_at: usize,
    calls: Rc<Cell<usize>>,
}

impl FailingAllocator {
    pub fn new(fail_at: usize) -> Self {
        FailingAllocator {
            fail_at,
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

unsafe impl DmaAllocator for FailingAllocator {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_at {
            return None;
        }
        SystemDmaAllocator.allocate_zeroed(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        SystemDmaAllocator.deallocate(ptr, layout)
    }
}

/// TWAI stand-in: a bounded receive queue filled "from interrupt context" by
/// [`SimulatedTwai::arrive`] and drained by the test.
#[derive(Default)]
pub struct SimulatedTwai {
    pub fail_install: bool,
    pub fail_start: bool,
    capacity: usize,
    running: bool,
    queue: VecDeque<CanFrame>,
    alerts_enabled: EnumSet<Alert>,
    pending_alerts: EnumSet<Alert>,
    pub dropped: usize,
}

impl BusDriver for SimulatedTwai {
    type Error = &'static str;

    fn install(&mut self, config: &BusConfiguration) -> Result<(), Self::Error> {
        if self.fail_install {
            return Err("ESP_ERR_INVALID_STATE");
        }
        self.capacity = config.rx_queue_depth as usize;
        self.alerts_enabled = config.alerts;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        if self.fail_start {
            return Err("ESP_ERR_INVALID_STATE");
        }
        self.running = true;
        Ok(())
    }
}

impl SimulatedTwai {
    /// Driver install is refused
    pub fn failing_install() -> Self {
        SimulatedTwai {
            fail_install: true,
            ..Default::default()
        }
    }

    /// Installs, then refuses to start
    pub fn failing_start() -> Self {
        SimulatedTwai {
            fail_start: true,
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A frame comes off the wire
    pub fn arrive(&mut self, frame: CanFrame) {
        if !self.running {
            return;
        }
        if self.queue.len() >= self.capacity {
            self.dropped += 1;
            self.raise(Alert::RxQueueFull);
            return;
        }
        self.queue.push_back(frame);
    }

    fn raise(&mut self, alert: Alert) {
        if self.alerts_enabled.contains(alert) {
            self.pending_alerts.insert(alert);
        }
    }

    pub fn receive(&mut self) -> Option<CanFrame> {
        self.queue.pop_front()
    }

    pub fn read_alerts(&mut self) -> EnumSet<Alert> {
        core::mem::take(&mut self.pending_alerts)
    }
}

pub fn frame(n: u32) -> CanFrame {
    CanFrame::new(0x100 + (n & 0xFF), false, &n.to_le_bytes()).unwrap()
}
