//! Fixed-point decimal cells.
//!
//! Decimals keep the scaled integer exactly as stored, together with the
//! precision and scale declared by the column. Conversion to `f64` is offered
//! for callers that accept the loss.

use std::fmt;

/// A decoded decimal value: `mantissa * 10^-scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    precision: u8,
    scale: i8,
}

impl Decimal {
    pub fn new(mantissa: i128, precision: u8, scale: i8) -> Self {
        Self {
            mantissa,
            precision,
            scale,
        }
    }

    /// Return the scaled integer backing this decimal.
    #[inline]
    pub fn mantissa(self) -> i128 {
        self.mantissa
    }

    /// Declared precision (total digit count) of the source column.
    #[inline]
    pub fn precision(self) -> u8 {
        self.precision
    }

    /// Return the scale (number of fractional digits).
    #[inline]
    pub fn scale(self) -> i8 {
        self.scale
    }

    /// Convert the decimal into an `f64` (lossy for high precision inputs).
    pub fn to_f64(self) -> f64 {
        if self.mantissa == 0 {
            return 0.0;
        }
        (self.mantissa as f64) / 10_f64.powi(self.scale as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.mantissa < 0;
        let digits = self.mantissa.unsigned_abs().to_string();
        if negative {
            f.write_str("-")?;
        }
        if self.scale <= 0 {
            f.write_str(&digits)?;
            if self.mantissa != 0 {
                for _ in 0..self.scale.unsigned_abs() {
                    f.write_str("0")?;
                }
            }
            return Ok(());
        }

        let scale = self.scale as usize;
        if digits.len() <= scale {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            return f.write_str(&digits);
        }
        let split = digits.len() - scale;
        f.write_str(&digits[..split])?;
        f.write_str(".")?;
        f.write_str(&digits[split..])
    }
}
