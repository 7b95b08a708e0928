//! Baud rate divisor (BSEL) computation.
//!
//! In double-speed mode (CLK2X set) the USART runs at
//! `f_per / (2^bscale · 8 · (bsel + 1))`, so for a target rate
//!
//! ```text
//! bsel = f_per / (2^bscale · 8 · baud) − 1
//! ```
//!
//! The result rarely lands on an integer. [`Rounding`] picks how the
//! remainder is handled and [`DivisorPolicy::bias_correction`] optionally adds
//! one afterwards to compensate a known rounding bias of the baud generator.

use thiserror::Error;

use crate::constants::{MAX_BSCALE, MAX_BSEL};

use super::registers::BSCALE_SHIFT;

/// How the fractional part of the divisor is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Integer arithmetic, remainder discarded.
    Truncate,
    /// `f64` arithmetic, remainder ≥ 0.5 rounds up.
    RoundHalfUp,
}

/// Divisor rounding policy, fixed per port at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisorPolicy {
    pub rounding: Rounding,
    /// Add one to the divisor after rounding.
    pub bias_correction: bool,
}

impl DivisorPolicy {
    /// Policy selected by the `float-baud` and `bsel-correction` features.
    pub const DEFAULT: Self = Self {
        rounding: if cfg!(feature = "float-baud") {
            Rounding::RoundHalfUp
        } else {
            Rounding::Truncate
        },
        bias_correction: cfg!(feature = "bsel-correction"),
    };

    pub const fn truncate() -> Self {
        Self {
            rounding: Rounding::Truncate,
            bias_correction: false,
        }
    }

    pub const fn round_half_up() -> Self {
        Self {
            rounding: Rounding::RoundHalfUp,
            bias_correction: false,
        }
    }

    /// Same rounding, with the +1 bias correction enabled.
    pub const fn corrected(self) -> Self {
        Self {
            rounding: self.rounding,
            bias_correction: true,
        }
    }
}

impl Default for DivisorPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Rejected baud configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BaudError {
    #[error("baud rate must be non-zero")]
    ZeroBaud,
    #[error("reference clock must be non-zero")]
    ZeroClock,
    #[error("bscale {0} out of range (0..={max})", max = MAX_BSCALE)]
    ScaleOutOfRange(u8),
    #[error("{baud} baud is unreachable from {clock_hz} Hz with bscale {scale}")]
    DivisorOutOfRange { clock_hz: u32, baud: u32, scale: u8 },
}

/// Compute BSEL for `baud` from a `clock_hz` reference.
///
/// Fails if the inputs are zero, `scale` exceeds [`MAX_BSCALE`], or the
/// result does not fit the 12-bit BSEL field.
pub fn divisor(clock_hz: u32, baud: u32, scale: u8, policy: DivisorPolicy) -> Result<u16, BaudError> {
    if baud == 0 {
        return Err(BaudError::ZeroBaud);
    }
    if clock_hz == 0 {
        return Err(BaudError::ZeroClock);
    }
    if scale > MAX_BSCALE {
        return Err(BaudError::ScaleOutOfRange(scale));
    }

    let out_of_range = BaudError::DivisorOutOfRange { clock_hz, baud, scale };
    let denominator = (1u64 << scale) * 8 * baud as u64;

    let mut bsel: i64 = match policy.rounding {
        Rounding::Truncate => (clock_hz as u64 / denominator) as i64 - 1,
        Rounding::RoundHalfUp => {
            let exact = clock_hz as f64 / denominator as f64 - 1.0;
            let whole = libm::floor(exact);
            if exact - whole >= 0.5 {
                whole as i64 + 1
            } else {
                whole as i64
            }
        }
    };

    if policy.bias_correction {
        bsel += 1;
    }

    if !(0..=MAX_BSEL as i64).contains(&bsel) {
        return Err(out_of_range);
    }
    Ok(bsel as u16)
}

/// Split BSEL and BSCALE into the `(BAUDCTRLB, BAUDCTRLA)` register values.
pub const fn split(bsel: u16, scale: u8) -> (u8, u8) {
    let ctrlb = ((scale & 0x0F) << BSCALE_SHIFT) | ((bsel >> 8) as u8 & 0x0F);
    let ctrla = (bsel & 0xFF) as u8;
    (ctrlb, ctrla)
}

/// Baud rate actually produced by `bsel` (useful to check the error).
pub fn actual_baud(clock_hz: u32, bsel: u16, scale: u8) -> u32 {
    let denominator = (1u64 << scale) * 8 * (bsel as u64 + 1);
    (clock_hz as u64 / denominator) as u32
}
