//! Buffered, interrupt-driven USART driver.
//!
//! A [`SerialPort`] owns one USART register block and two ring buffers. The
//! receive-complete ISR moves bytes from DATA into the inbound buffer; the
//! data-register-empty ISR moves bytes from the outbound buffer into DATA.
//! Application code only ever touches the buffers.
//!
//! ```text
//!  wire ──► DATA ──read_data()──► [ rx ring ] ──peek()/get()──► app
//!  wire ◄── DATA ◄─write_data()── [ tx ring ] ◄──send()──────── app
//! ```
//!
//! # Example
//!
//! ```ignore
//! static USART_C0: DefaultSerialPort<MmioUsart> =
//!     SerialPort::new(unsafe { MmioUsart::for_port(Port::C0) }, 32_000_000);
//!
//! USART_C0.init(UsartConfig::default())?;
//! USART_C0.send(b"hello\r\n");
//! let echo = USART_C0.get();
//! ```

use core::fmt;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

#[cfg(feature = "timeout")]
use embedded_hal::delay::DelayNs;

use super::baud::{self, BaudError, DivisorPolicy};
use super::peripheral::UsartRegisters;
use super::registers::{self as reg, CtrlB, InterruptLevel};
use crate::constants::{DEFAULT_BAUD, DEFAULT_RX_BUFFER, DEFAULT_TX_BUFFER};
use crate::io::RingBuffer;

// ── Public types ───────────────────────────────────────────────────────────

/// One half of the USART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsartPart {
    Receiver,
    Transmitter,
}

impl UsartPart {
    const fn mask(self) -> CtrlB {
        match self {
            UsartPart::Receiver => CtrlB::RXEN,
            UsartPart::Transmitter => CtrlB::TXEN,
        }
    }
}

/// Settings applied by [`SerialPort::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsartConfig {
    pub baud: u32,
    /// BSCALE exponent (0..=7).
    pub scale: u8,
    /// Level for both the RX-complete and data-register-empty interrupts.
    pub interrupt_level: InterruptLevel,
}

impl UsartConfig {
    pub const fn new(baud: u32) -> Self {
        Self {
            baud,
            scale: 0,
            interrupt_level: InterruptLevel::Low,
        }
    }
}

impl Default for UsartConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD)
    }
}

// ── Driver struct ──────────────────────────────────────────────────────────

/// Buffered USART with `RX` inbound and `TX` outbound ring buffer slots.
///
/// Every method takes `&self` so a single instance can live in a `static`
/// and be reached from both interrupt handlers and foreground code. The
/// inbound buffer is written only by [`read_data`](Self::read_data) and read
/// only by [`peek`](Self::peek)/[`get`](Self::get); the outbound buffer is
/// written only by [`send`](Self::send) and read only by
/// [`write_data`](Self::write_data). Calling a foreground method from two
/// contexts at once breaks that split.
pub struct SerialPort<P, const RX: usize, const TX: usize> {
    usart: P,
    clock_hz: u32,
    policy: DivisorPolicy,
    rx: RingBuffer<u8, RX>,
    tx: RingBuffer<u8, TX>,
    bsel: AtomicU16,
    scale: AtomicU8,
    active: AtomicBool,
}

/// BSEL marker for a baud generator that has not been programmed yet.
const NO_BSEL: u16 = u16::MAX;

/// [`SerialPort`] with the default 32-slot RX and 96-slot TX buffers.
pub type DefaultSerialPort<P> = SerialPort<P, DEFAULT_RX_BUFFER, DEFAULT_TX_BUFFER>;

impl<P, const RX: usize, const TX: usize> SerialPort<P, RX, TX> {
    /// Wrap `usart`, clocked from `clock_hz`, with the feature-selected
    /// divisor policy. The port stays unconfigured until [`init`](Self::init).
    pub const fn new(usart: P, clock_hz: u32) -> Self {
        Self::with_policy(usart, clock_hz, DivisorPolicy::DEFAULT)
    }

    /// Like [`new`](Self::new) with an explicit divisor policy.
    pub const fn with_policy(usart: P, clock_hz: u32, policy: DivisorPolicy) -> Self {
        Self {
            usart,
            clock_hz,
            policy,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            bsel: AtomicU16::new(NO_BSEL),
            scale: AtomicU8::new(0),
            active: AtomicBool::new(false),
        }
    }

    /// The wrapped register handle.
    pub fn usart(&self) -> &P {
        &self.usart
    }

    /// Consume the driver and return the register handle.
    pub fn release(self) -> P {
        self.usart
    }

    /// `true` once [`init`](Self::init) has succeeded.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Rate the baud generator actually produces, `None` until one has been
    /// programmed. Usually differs slightly from the requested rate.
    pub fn baud(&self) -> Option<u32> {
        self.bsel().map(|bsel| baud::actual_baud(self.clock_hz, bsel, self.scale()))
    }

    /// Last BSEL programmed by [`set_baud`](Self::set_baud).
    pub fn bsel(&self) -> Option<u16> {
        match self.bsel.load(Ordering::Relaxed) {
            NO_BSEL => None,
            bsel => Some(bsel),
        }
    }

    /// Last BSCALE programmed by [`set_baud`](Self::set_baud).
    pub fn scale(&self) -> u8 {
        self.scale.load(Ordering::Relaxed)
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn policy(&self) -> DivisorPolicy {
        self.policy
    }

    /// Received bytes waiting to be read.
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Queued bytes not yet handed to the hardware.
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }
}

impl<P, const RX: usize, const TX: usize> SerialPort<P, RX, TX>
where
    P: UsartRegisters,
{
    // ── Configuration ──────────────────────────────────────────────────

    /// Bring the port up.
    ///
    /// Enables receiver and transmitter, sets the RX-complete and
    /// data-register-empty interrupt levels, selects double-speed mode and
    /// 8-bit characters, then programs the baud rate. The configuration is
    /// validated before any register is touched.
    pub fn init(&self, config: UsartConfig) -> Result<(), BaudError> {
        let bsel = self.divisor_for(config.baud, config.scale)?;
        log::debug!(
            "usart: init {} baud, bscale {}, bsel {}, irq level {:?}",
            config.baud,
            config.scale,
            bsel,
            config.interrupt_level
        );

        self.set_part_enabled(UsartPart::Receiver, true);
        self.set_part_enabled(UsartPart::Transmitter, true);

        self.usart.write(reg::CTRLA, config.interrupt_level.ctrla());

        self.usart.modify(reg::CTRLB, CtrlB::CLK2X.bits(), CtrlB::CLK2X.bits());
        self.usart.modify(reg::CTRLC, reg::CHSIZE_8BIT, reg::CHSIZE_MASK);

        self.program_baud(config.scale, bsel);
        self.active.store(true, Ordering::Release);
        Ok(())
    }

    /// Enable or disable the receiver or transmitter.
    pub fn set_part_enabled(&self, part: UsartPart, enable: bool) {
        let mask = part.mask().bits();
        self.usart.modify(reg::CTRLB, if enable { mask } else { 0 }, mask);
    }

    /// Program the baud generator for `baud` with BSCALE `scale`.
    ///
    /// Returns the BSEL value written. On error nothing is written.
    pub fn set_baud(&self, baud: u32, scale: u8) -> Result<u16, BaudError> {
        let bsel = self.divisor_for(baud, scale)?;
        log::debug!("usart: {} baud -> bscale {}, bsel {}", baud, scale, bsel);
        self.program_baud(scale, bsel);
        Ok(bsel)
    }

    fn divisor_for(&self, baud: u32, scale: u8) -> Result<u16, BaudError> {
        baud::divisor(self.clock_hz, baud, scale, self.policy).inspect_err(|e| {
            log::warn!("usart: rejected baud configuration: {}", e);
        })
    }

    fn program_baud(&self, scale: u8, bsel: u16) {
        let (ctrlb, ctrla) = baud::split(bsel, scale);
        // BAUDCTRLA last: writing it latches the new rate.
        self.usart.write(reg::BAUDCTRLB, ctrlb);
        self.usart.write(reg::BAUDCTRLA, ctrla);
        self.scale.store(scale, Ordering::Relaxed);
        self.bsel.store(bsel, Ordering::Relaxed);
    }

    // ── Interrupt entry points ─────────────────────────────────────────

    /// Receive-complete handler: move one byte from DATA into the inbound
    /// buffer. The byte is discarded if the buffer is full.
    #[inline]
    pub fn read_data(&self) {
        let byte = self.usart.read(reg::DATA);
        let _ = self.rx.push(byte);
    }

    /// Data-register-empty handler: move one byte from the outbound buffer
    /// into DATA. Does nothing when the buffer is empty.
    ///
    /// The DRE interrupt is left enabled even when there is nothing to send,
    /// so on hardware it keeps firing until [`send`](Self::send) queues more
    /// data.
    #[inline]
    pub fn write_data(&self) {
        if let Some(byte) = self.tx.pop() {
            self.usart.write(reg::DATA, byte);
        }
    }

    // ── Application I/O ────────────────────────────────────────────────

    /// Take the oldest received byte, if any. Never blocks.
    pub fn peek(&self) -> Option<u8> {
        self.rx.pop()
    }

    /// Wait for a received byte. Spins forever if none arrives.
    pub fn get(&self) -> u8 {
        loop {
            if let Some(byte) = self.peek() {
                return byte;
            }
            spin_loop();
        }
    }

    /// Wait for a received byte until `cancel` is set.
    pub fn get_until(&self, cancel: &AtomicBool) -> Option<u8> {
        loop {
            if let Some(byte) = self.peek() {
                return Some(byte);
            }
            if cancel.load(Ordering::Acquire) {
                return None;
            }
            spin_loop();
        }
    }

    /// Wait up to `timeout_us` microseconds for a received byte.
    #[cfg(feature = "timeout")]
    pub fn get_timeout<D: DelayNs>(&self, delay: &mut D, timeout_us: u32) -> Option<u8> {
        let mut waited = 0;
        loop {
            if let Some(byte) = self.peek() {
                return Some(byte);
            }
            if waited >= timeout_us {
                return None;
            }
            delay.delay_us(1);
            waited += 1;
        }
    }

    /// Queue bytes for transmission and return how many fit.
    ///
    /// Bytes that find the buffer full are dropped; later bytes are still
    /// tried. Transmission is driven by the DRE interrupt, not by this call.
    pub fn send(&self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.tx.push(b).is_ok()).count()
    }

    /// [`send`](Self::send) for UTF-8 text.
    pub fn send_str(&self, text: &str) -> usize {
        self.send(text.as_bytes())
    }
}

impl<P: UsartRegisters, const RX: usize, const TX: usize> fmt::Write for &SerialPort<P, RX, TX> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send_str(s);
        Ok(())
    }
}

impl<P: UsartRegisters, const RX: usize, const TX: usize> fmt::Write for SerialPort<P, RX, TX> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usart::mock::MockUsart;
    use core::fmt::Write;

    const F_PER: u32 = 32_000_000;

    fn make_port() -> SerialPort<MockUsart, 8, 8> {
        SerialPort::with_policy(MockUsart::new(), F_PER, DivisorPolicy::round_half_up())
    }

    fn active_port() -> SerialPort<MockUsart, 8, 8> {
        let port = make_port();
        port.init(UsartConfig::default()).unwrap();
        port
    }

    // ── Configuration tests ───────────────────────────────────────────

    #[test]
    fn new_port_is_unconfigured() {
        let port = make_port();
        assert!(!port.is_active());
        assert_eq!(port.baud(), None);
        assert_eq!(port.bsel(), None);
        assert!(port.release().writes().is_empty());
    }

    #[test]
    fn init_writes_correct_sequence() {
        let port = make_port();
        port.init(UsartConfig::default()).unwrap();
        assert!(port.is_active());
        // 32 MHz / (8 · 104) = 38461
        assert_eq!(port.bsel(), Some(103));
        assert_eq!(port.baud(), Some(38_461));

        let usart = port.release();
        assert_eq!(
            usart.writes(),
            [
                (reg::CTRLB, 0x10),     // RXEN
                (reg::CTRLB, 0x18),     // + TXEN
                (reg::CTRLA, 0x11),     // RXC + DRE at low level
                (reg::CTRLB, 0x1C),     // + CLK2X
                (reg::CTRLC, 0x03),     // 8-bit characters
                (reg::BAUDCTRLB, 0x00), // bscale 0, bsel[11:8] = 0
                (reg::BAUDCTRLA, 103),  // 32 MHz / (8 · 38400) − 1 = 103.17
            ]
        );
    }

    #[test]
    fn init_with_custom_level_and_scale() {
        let port = make_port();
        let config = UsartConfig {
            baud: 9_600,
            scale: 1,
            interrupt_level: InterruptLevel::High,
        };
        port.init(config).unwrap();
        assert_eq!(port.scale(), 1);

        let usart = port.release();
        assert_eq!(usart.reg(reg::CTRLA), 0x33);
        // bsel 207 = 0x0CF
        assert_eq!(usart.reg(reg::BAUDCTRLB), 0x10);
        assert_eq!(usart.reg(reg::BAUDCTRLA), 0xCF);
    }

    #[test]
    fn init_rejects_bad_baud_without_touching_registers() {
        let port = make_port();
        assert_eq!(port.init(UsartConfig::new(0)), Err(BaudError::ZeroBaud));
        assert!(!port.is_active());
        assert!(port.release().writes().is_empty());
    }

    #[test]
    fn set_baud_splits_divisor() {
        let port = active_port();
        port.usart.clear_log();

        // 32 MHz / (8 · 9600) − 1 = 415.67 → 416 = 0x1A0
        assert_eq!(port.set_baud(9_600, 0), Ok(416));
        assert_eq!(port.bsel(), Some(416));
        let usart = port.release();
        assert_eq!(usart.writes(), [(reg::BAUDCTRLB, 0x01), (reg::BAUDCTRLA, 0xA0)]);
    }

    #[test]
    fn baud_reports_generated_rate() {
        let port = make_port();
        // 32 MHz / (8 · 417) = 9592.3
        port.set_baud(9_600, 0).unwrap();
        assert_eq!(port.baud(), Some(9_592));

        // 32 MHz / (2 · 8 · 208) = 9615.4
        port.set_baud(9_600, 1).unwrap();
        assert_eq!(port.scale(), 1);
        assert_eq!(port.baud(), Some(9_615));

        // bsel 0 is a valid setting: 2 MHz / (8 · 1)
        let fast = SerialPort::<_, 4, 4>::with_policy(MockUsart::new(), 2_000_000, DivisorPolicy::truncate());
        assert_eq!(fast.set_baud(250_000, 0), Ok(0));
        assert_eq!(fast.baud(), Some(250_000));
    }

    #[test]
    fn set_baud_uses_port_policy() {
        let port = SerialPort::<_, 4, 4>::with_policy(MockUsart::new(), F_PER, DivisorPolicy::truncate());
        assert_eq!(port.set_baud(9_600, 0), Ok(415));

        let port = SerialPort::<_, 4, 4>::with_policy(
            MockUsart::new(),
            F_PER,
            DivisorPolicy::truncate().corrected(),
        );
        assert_eq!(port.set_baud(38_400, 0), Ok(104));
    }

    #[test]
    fn set_baud_error_keeps_previous_rate() {
        let port = active_port();
        port.usart.clear_log();
        assert!(port.set_baud(300, 0).is_err());
        assert_eq!(port.bsel(), Some(103));
        assert_eq!(port.baud(), Some(38_461));
        assert!(port.release().writes().is_empty());
    }

    #[test]
    fn set_part_enabled_toggles_bits() {
        let port = active_port();
        port.set_part_enabled(UsartPart::Receiver, false);
        assert_eq!(port.usart.reg(reg::CTRLB), 0x0C);
        port.set_part_enabled(UsartPart::Transmitter, false);
        assert_eq!(port.usart.reg(reg::CTRLB), 0x04);
        port.set_part_enabled(UsartPart::Receiver, true);
        assert_eq!(port.usart.reg(reg::CTRLB), 0x14);
    }

    // ── Receive path tests ────────────────────────────────────────────

    #[test]
    fn read_data_then_peek() {
        let port = active_port();
        port.usart.feed(b"hi");
        port.read_data();
        port.read_data();
        assert_eq!(port.rx_pending(), 2);

        assert_eq!(port.peek(), Some(b'h'));
        assert_eq!(port.peek(), Some(b'i'));
        assert_eq!(port.peek(), None);
    }

    #[test]
    fn read_data_drops_when_full() {
        let port = active_port();
        port.usart.feed(b"0123456789");
        for _ in 0..10 {
            port.read_data();
        }
        // 8 slots, 7 usable: '7', '8', '9' were lost
        assert_eq!(port.rx_pending(), 7);
        for expected in b"0123456" {
            assert_eq!(port.peek(), Some(*expected));
        }
        assert_eq!(port.peek(), None);
    }

    #[test]
    fn get_returns_buffered_byte() {
        let port = active_port();
        port.usart.feed(b"Z");
        port.read_data();
        assert_eq!(port.get(), b'Z');
        assert_eq!(port.rx_pending(), 0);
    }

    #[test]
    fn get_until_honours_cancel() {
        let port = active_port();
        let cancel = AtomicBool::new(true);
        assert_eq!(port.get_until(&cancel), None);

        port.usart.feed(b"q");
        port.read_data();
        // Data already waiting wins over cancellation
        assert_eq!(port.get_until(&cancel), Some(b'q'));
    }

    #[cfg(feature = "timeout")]
    #[test]
    fn get_timeout_expires() {
        struct CountingDelay(u32);
        impl DelayNs for CountingDelay {
            fn delay_ns(&mut self, ns: u32) {
                self.0 += ns;
            }
        }

        let port = active_port();
        let mut delay = CountingDelay(0);
        assert_eq!(port.get_timeout(&mut delay, 50), None);
        assert_eq!(delay.0, 50_000);

        port.usart.feed(b"k");
        port.read_data();
        let mut delay = CountingDelay(0);
        assert_eq!(port.get_timeout(&mut delay, 50), Some(b'k'));
        assert_eq!(delay.0, 0);
    }

    // ── Transmit path tests ───────────────────────────────────────────

    #[test]
    fn send_then_write_data_in_order() {
        let port = active_port();
        assert_eq!(port.send(b"AB"), 2);
        // send() alone never touches the hardware
        assert!(port.usart.sent().is_empty());

        port.write_data();
        port.write_data();
        assert_eq!(port.usart.sent(), b"AB");
        assert_eq!(port.tx_pending(), 0);
    }

    #[test]
    fn write_data_on_empty_buffer_does_nothing() {
        let port = active_port();
        port.usart.clear_log();
        port.write_data();
        port.write_data();
        assert!(port.usart.writes().is_empty());
        // DRE interrupt level untouched
        assert_eq!(port.usart.reg(reg::CTRLA), 0x11);
    }

    #[test]
    fn send_drops_overflow() {
        let port = active_port();
        assert_eq!(port.send(b"abcdefghij"), 7);
        assert_eq!(port.tx_pending(), 7);
        for _ in 0..10 {
            port.write_data();
        }
        assert_eq!(port.usart.sent(), b"abcdefg");
    }

    #[test]
    fn send_keeps_trying_after_a_drop() {
        let port = active_port();
        port.send(b"1234567");
        // Full: this one is dropped
        assert_eq!(port.send(b"x"), 0);
        port.write_data();
        assert_eq!(port.send_str("y"), 1);
        for _ in 0..8 {
            port.write_data();
        }
        assert_eq!(port.usart.sent(), b"1234567y");
    }

    #[test]
    fn fmt_write_queues_text() {
        let port = active_port();
        let mut writer = &port;
        write!(writer, "{}+{}", 2, 3).unwrap();
        while port.tx_pending() > 0 {
            port.write_data();
        }
        assert_eq!(port.usart.sent(), b"2+3");
    }
}
