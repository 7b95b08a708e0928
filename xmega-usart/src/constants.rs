/// Baud rate programmed by [`UsartConfig::default`](crate::usart::UsartConfig).
pub const DEFAULT_BAUD: u32 = 38_400;

/// Inbound ring buffer slots (31 usable bytes).
pub const DEFAULT_RX_BUFFER: usize = 32;

/// Outbound ring buffer slots (95 usable bytes).
pub const DEFAULT_TX_BUFFER: usize = 96;

/// Largest value of the 12-bit BSEL field.
pub const MAX_BSEL: u16 = 0x0FFF;

/// Largest positive BSCALE exponent.
pub const MAX_BSCALE: u8 = 7;
