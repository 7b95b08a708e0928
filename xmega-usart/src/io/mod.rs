//! Buffering between interrupt handlers and application code.
//!
//! - [`ring_buffer`] — Lock-free single-producer single-consumer ring buffer

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
