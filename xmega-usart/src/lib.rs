//! # xmega-usart
//!
//! A `no_std`, zero-allocation, interrupt-driven serial driver for the
//! [ATxmega](https://www.microchip.com/en-us/products/microcontrollers-and-microprocessors/8-bit-mcus/avr-mcus/avr-xmega)
//! USART peripheral. Fixed-capacity ring buffers decouple the byte rate on
//! the wire from the rate at which application code produces and consumes
//! data; the interrupt handlers move single bytes between the buffers and
//! the DATA register.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Buffer | [`io`] | Lock-free SPSC [`RingBuffer`](io::RingBuffer) |
//! | Hardware | [`usart::registers`] / [`usart::UsartRegisters`] | Register map and access trait |
//! | Driver | [`usart`] | [`SerialPort`](usart::SerialPort): config, ISR entry points, I/O |
//! | Glue | [`dispatch`] | [`IsrTable`](dispatch::IsrTable) routing vectors to ports |
//!
//! ## Quick start
//!
//! ```ignore
//! use xmega_usart::dispatch::{IsrTable, Vector};
//! use xmega_usart::usart::{DefaultSerialPort, MmioUsart, Port, SerialPort, UsartConfig};
//!
//! const F_PER: u32 = 32_000_000;
//!
//! static USART_C0: DefaultSerialPort<MmioUsart> =
//!     SerialPort::new(unsafe { MmioUsart::for_port(Port::C0) }, F_PER);
//!
//! static ISR_TABLE: IsrTable<'static> = IsrTable::new().with(Port::C0, &USART_C0);
//!
//! // USARTC0_RXC vector:
//! ISR_TABLE.dispatch(Port::C0, Vector::ReceiveComplete);
//! // USARTC0_DRE vector:
//! ISR_TABLE.dispatch(Port::C0, Vector::DataRegisterEmpty);
//!
//! // Foreground:
//! USART_C0.init(UsartConfig::default())?;
//! USART_C0.send(b"ready\r\n");
//! loop {
//!     let byte = USART_C0.get();
//!     USART_C0.send(&[byte]);
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `float-baud` | yes | Round-half-up divisor by default (otherwise truncation) |
//! | `bsel-correction` | no | Add one to every computed divisor by default |
//! | `timeout` | yes | [`SerialPort::get_timeout`](usart::SerialPort::get_timeout) (requires `embedded-hal`) |
//!
//! ## Defaults
//!
//! - **Baud rate:** 38 400 ([`constants::DEFAULT_BAUD`])
//! - **RX buffer:** 32 slots ([`constants::DEFAULT_RX_BUFFER`])
//! - **TX buffer:** 96 slots ([`constants::DEFAULT_TX_BUFFER`])
//! - **Frame:** 8 data bits, no parity, 1 stop bit, double-speed clock

#![no_std]

pub mod constants;
pub mod dispatch;
pub mod io;
pub mod usart;
