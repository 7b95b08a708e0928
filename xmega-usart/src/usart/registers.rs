//! ATxmega USART register offsets and bitfield definitions.
//!
//! Offsets are relative to the instance base address (see
//! [`Port::base_address`](super::Port::base_address)). Every register is
//! 8 bits wide. Names follow the XMEGA AU manual.

use bitflags::bitflags;

// ── Register offsets ───────────────────────────────────────────────────────

/// Data register. Reading pops the receive buffer, writing loads the
/// transmit buffer.
pub const DATA: u8 = 0x00;

/// Control register A: interrupt levels.
/// - Bits 5:4 — RXCINTLVL
/// - Bits 3:2 — TXCINTLVL (left off)
/// - Bits 1:0 — DREINTLVL
pub const CTRLA: u8 = 0x03;

/// Control register B: enables and clock doubling.
pub const CTRLB: u8 = 0x04;

/// Control register C: frame format.
/// - Bits 7:6 — CMODE (0 = asynchronous)
/// - Bits 5:4 — PMODE (0 = no parity)
/// - Bit    3 — SBMODE (0 = 1 stop bit)
/// - Bits 2:0 — CHSIZE (3 = 8 bit)
pub const CTRLC: u8 = 0x05;

/// Baud rate control A: BSEL\[7:0\].
pub const BAUDCTRLA: u8 = 0x06;

/// Baud rate control B.
/// - Bits 7:4 — BSCALE
/// - Bits 3:0 — BSEL\[11:8\]
pub const BAUDCTRLB: u8 = 0x07;

// ── Field positions ────────────────────────────────────────────────────────

/// Shift of the RXCINTLVL group in CTRLA.
pub const RXCINTLVL_SHIFT: u8 = 4;

/// Shift of the DREINTLVL group in CTRLA.
pub const DREINTLVL_SHIFT: u8 = 0;

/// Mask of the CHSIZE group in CTRLC.
pub const CHSIZE_MASK: u8 = 0x07;

/// CHSIZE value for 8-bit characters.
pub const CHSIZE_8BIT: u8 = 0x03;

/// Shift of BSCALE in BAUDCTRLB.
pub const BSCALE_SHIFT: u8 = 4;

bitflags! {
    /// CTRLB bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlB: u8 {
        /// Receiver enable.
        const RXEN = 1 << 4;
        /// Transmitter enable.
        const TXEN = 1 << 3;
        /// Double transmission speed (divisor uses 8 instead of 16).
        const CLK2X = 1 << 2;
    }
}

/// Interrupt priority level for one CTRLA group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptLevel {
    /// Interrupt disabled.
    Off = 0,
    /// Low priority.
    #[default]
    Low = 1,
    /// Medium priority.
    Medium = 2,
    /// High priority.
    High = 3,
}

impl InterruptLevel {
    /// CTRLA value enabling RX-complete and data-register-empty interrupts at
    /// this level. TX-complete stays off.
    pub const fn ctrla(self) -> u8 {
        ((self as u8) << RXCINTLVL_SHIFT) | ((self as u8) << DREINTLVL_SHIFT)
    }
}
