//! Interrupt dispatch for USART instances.
//!
//! The application owns its [`SerialPort`](crate::usart::SerialPort) values and
//! binds them to hardware instances in an [`IsrTable`]. The vector handlers
//! then forward to the table, so which ports exist is decided where the
//! table is built rather than by per-port copies of the driver.
//!
//! ```ignore
//! static USART_C0: DefaultSerialPort<MmioUsart> =
//!     SerialPort::new(unsafe { MmioUsart::for_port(Port::C0) }, F_PER);
//! static USART_D0: DefaultSerialPort<MmioUsart> =
//!     SerialPort::new(unsafe { MmioUsart::for_port(Port::D0) }, F_PER);
//!
//! static ISR_TABLE: IsrTable<'static> = IsrTable::new()
//!     .with(Port::C0, &USART_C0)
//!     .with(Port::D0, &USART_D0);
//!
//! // Bound to the USARTC0_RXC vector by the runtime:
//! fn usartc0_rxc() {
//!     ISR_TABLE.dispatch(Port::C0, Vector::ReceiveComplete);
//! }
//! ```

use thiserror::Error;

use crate::usart::{Port, SerialPort, UsartRegisters};

/// Interrupt-context half of a USART driver.
pub trait UsartIsr: Sync {
    /// Receive-complete (RXC) vector.
    fn on_receive(&self);

    /// Data-register-empty (DRE) vector.
    fn on_data_register_empty(&self);
}

impl<P, const RX: usize, const TX: usize> UsartIsr for SerialPort<P, RX, TX>
where
    P: UsartRegisters + Sync,
{
    #[inline]
    fn on_receive(&self) {
        self.read_data();
    }

    #[inline]
    fn on_data_register_empty(&self) {
        self.write_data();
    }
}

/// USART interrupt sources handled by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    ReceiveComplete,
    DataRegisterEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("USART {0:?} already has a handler")]
    AlreadyRegistered(Port),
}

/// Maps each [`Port`] to at most one handler.
pub struct IsrTable<'a> {
    handlers: [Option<&'a dyn UsartIsr>; Port::COUNT],
}

impl<'a> IsrTable<'a> {
    pub const fn new() -> Self {
        Self {
            handlers: [None; Port::COUNT],
        }
    }

    /// Const builder for `static` tables.
    ///
    /// # Panics
    ///
    /// If `port` is already bound (at compile time when used in a `static`).
    pub const fn with(mut self, port: Port, handler: &'a dyn UsartIsr) -> Self {
        assert!(self.handlers[port.index()].is_none(), "USART bound twice");
        self.handlers[port.index()] = Some(handler);
        self
    }

    /// Bind `handler` to `port`.
    pub fn register(&mut self, port: Port, handler: &'a dyn UsartIsr) -> Result<(), DispatchError> {
        let slot = &mut self.handlers[port.index()];
        if slot.is_some() {
            return Err(DispatchError::AlreadyRegistered(port));
        }
        *slot = Some(handler);
        log::debug!("usart: {:?} handler registered", port);
        Ok(())
    }

    /// Unbind `port`. Returns `true` if a handler was bound.
    pub fn unregister(&mut self, port: Port) -> bool {
        self.handlers[port.index()].take().is_some()
    }

    pub fn is_registered(&self, port: Port) -> bool {
        self.handlers[port.index()].is_some()
    }

    /// Ports that currently have a handler.
    pub fn registered(&self) -> impl Iterator<Item = Port> + '_ {
        Port::ALL.into_iter().filter(|p| self.is_registered(*p))
    }

    /// Forward `vector` for `port` to its handler.
    ///
    /// Returns `false` if no handler is bound; the interrupt is then ignored.
    #[inline]
    pub fn dispatch(&self, port: Port, vector: Vector) -> bool {
        match self.handlers[port.index()] {
            Some(handler) => {
                match vector {
                    Vector::ReceiveComplete => handler.on_receive(),
                    Vector::DataRegisterEmpty => handler.on_data_register_empty(),
                }
                true
            }
            None => false,
        }
    }
}

impl Default for IsrTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
