//! ATxmega USART driver.
//!
//! Provides the buffered [`SerialPort`] driver, the [`UsartRegisters`]
//! hardware seam with its memory-mapped implementation, and the baud
//! divisor arithmetic.

pub mod baud;
pub mod registers;
mod peripheral;
mod serial_port;

#[cfg(test)]
pub(crate) mod mock;

pub use baud::{BaudError, DivisorPolicy, Rounding};
pub use peripheral::{MmioUsart, Port, UsartRegisters};
pub use registers::InterruptLevel;
pub use serial_port::{DefaultSerialPort, SerialPort, UsartConfig, UsartPart};
