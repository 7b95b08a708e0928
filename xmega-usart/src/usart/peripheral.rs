//! Hardware seam: register access for one USART instance.

use core::ptr::{read_volatile, write_volatile};

/// Byte-wide register access to a single USART instance.
///
/// Offsets are the constants in [`registers`](super::registers). Methods take
/// `&self` because the same instance is touched from interrupt handlers and
/// from foreground code; implementations perform each access as one
/// indivisible load or store.
pub trait UsartRegisters {
    /// Read the register at `offset`.
    fn read(&self, offset: u8) -> u8;

    /// Write `value` to the register at `offset`.
    fn write(&self, offset: u8, value: u8);

    /// Read-modify-write: `new = (current & !mask) | value`.
    fn modify(&self, offset: u8, value: u8, mask: u8) -> u8 {
        let new = (self.read(offset) & !mask) | value;
        self.write(offset, new);
        new
    }
}

impl<R: UsartRegisters + ?Sized> UsartRegisters for &R {
    fn read(&self, offset: u8) -> u8 {
        (**self).read(offset)
    }

    fn write(&self, offset: u8, value: u8) {
        (**self).write(offset, value)
    }
}

/// Memory-mapped USART instance.
#[derive(Debug)]
pub struct MmioUsart {
    base: usize,
}

impl MmioUsart {
    /// Wrap the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a USART register block, and no other
    /// `MmioUsart` may exist for the same block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Wrap the register block of a known instance.
    ///
    /// # Safety
    ///
    /// Must only be called once per port, on a device that has it.
    pub const unsafe fn for_port(port: Port) -> Self {
        Self::new(port.base_address())
    }

    pub const fn base(&self) -> usize {
        self.base
    }
}

impl UsartRegisters for MmioUsart {
    #[inline]
    fn read(&self, offset: u8) -> u8 {
        // SAFETY: `new` guarantees the block exists; offsets stay inside it.
        unsafe { read_volatile((self.base + offset as usize) as *const u8) }
    }

    #[inline]
    fn write(&self, offset: u8, value: u8) {
        // SAFETY: see `read`.
        unsafe { write_volatile((self.base + offset as usize) as *mut u8, value) }
    }
}

// SAFETY: each access is a single byte-wide volatile operation, which the
// core performs indivisibly. Exclusive ownership of the block is part of
// `MmioUsart::new`'s contract.
unsafe impl Send for MmioUsart {}
unsafe impl Sync for MmioUsart {}

/// USART instances on the XMEGA A/AU family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    C0,
    C1,
    D0,
    D1,
    E0,
    E1,
    F0,
    F1,
}

impl Port {
    /// Every instance, in vector-table order.
    pub const ALL: [Port; 8] = [
        Port::C0,
        Port::C1,
        Port::D0,
        Port::D1,
        Port::E0,
        Port::E1,
        Port::F0,
        Port::F1,
    ];

    /// Number of instances.
    pub const COUNT: usize = Self::ALL.len();

    /// Register block base address.
    pub const fn base_address(self) -> usize {
        match self {
            Port::C0 => 0x08A0,
            Port::C1 => 0x08B0,
            Port::D0 => 0x09A0,
            Port::D1 => 0x09B0,
            Port::E0 => 0x0AA0,
            Port::E1 => 0x0AB0,
            Port::F0 => 0x0BA0,
            Port::F1 => 0x0BB0,
        }
    }

    /// TXD pin within the owning I/O port: pin 3 for USARTx0, pin 7 for USARTx1.
    ///
    /// The board glue drives this pin high and sets it as output before
    /// calling [`SerialPort::init`](super::SerialPort::init).
    pub const fn tx_pin(self) -> u8 {
        match self {
            Port::C0 | Port::D0 | Port::E0 | Port::F0 => 3,
            Port::C1 | Port::D1 | Port::E1 | Port::F1 => 7,
        }
    }

    /// Position in [`Port::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}
