//! formatting defaults for the closed set of numeric kinds that can appear
//! in a section body, resolved at compile time.

use num_traits::ToPrimitive;

/// value type name written into attribute headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ValueKind {
    #[display(fmt = "int")]
    Int,
    #[display(fmt = "float")]
    Float,
    #[display(fmt = "double")]
    Double,
}

/// a number that a [`Table`](crate::Table) knows how to lay out as text.
///
/// Each kind carries its own default precision and a tolerance under which a
/// value collapses to a literal zero. Without the tolerance, floating point
/// noise such as `1e-13` would print as exponential garbage in a body that is
/// otherwise plain fixed-point text.
pub trait Numeric: Copy + ToPrimitive {
    /// digits after the decimal point when the caller does not override it
    const DEFAULT_PRECISION: usize;
    /// magnitudes strictly below this format as zero
    const ZERO_TOLERANCE: f64;

    fn value_kind() -> ValueKind;

    /// render the value, fixed-point or scientific, at the requested
    /// precision (`None` selects [`DEFAULT_PRECISION`](Self::DEFAULT_PRECISION))
    fn format(self, scientific: bool, precision: Option<usize>) -> String;
}

impl Numeric for f64 {
    const DEFAULT_PRECISION: usize = 12;
    const ZERO_TOLERANCE: f64 = 1e-12;

    fn value_kind() -> ValueKind {
        ValueKind::Double
    }

    fn format(self, scientific: bool, precision: Option<usize>) -> String {
        let precision = precision.unwrap_or(Self::DEFAULT_PRECISION);
        let value = if self.abs() < Self::ZERO_TOLERANCE {
            0.0
        } else {
            self
        };

        if scientific {
            format!("{value:.precision$e}")
        } else {
            format!("{value:.precision$}")
        }
    }
}

impl Numeric for f32 {
    const DEFAULT_PRECISION: usize = 6;
    const ZERO_TOLERANCE: f64 = 1e-6;

    fn value_kind() -> ValueKind {
        ValueKind::Float
    }

    fn format(self, scientific: bool, precision: Option<usize>) -> String {
        let precision = precision.unwrap_or(Self::DEFAULT_PRECISION);
        let value = if (self.abs() as f64) < Self::ZERO_TOLERANCE {
            0.0
        } else {
            self
        };

        if scientific {
            format!("{value:.precision$e}")
        } else {
            format!("{value:.precision$}")
        }
    }
}

impl Numeric for i32 {
    const DEFAULT_PRECISION: usize = 0;
    const ZERO_TOLERANCE: f64 = 0.0;

    fn value_kind() -> ValueKind {
        ValueKind::Int
    }

    // integer kinds ignore the scientific flag, there is nothing to gain
    // from an exponent form in an index or code column
    fn format(self, _scientific: bool, _precision: Option<usize>) -> String {
        self.to_string()
    }
}

impl Numeric for i64 {
    const DEFAULT_PRECISION: usize = 0;
    const ZERO_TOLERANCE: f64 = 0.0;

    fn value_kind() -> ValueKind {
        ValueKind::Int
    }

    fn format(self, _scientific: bool, _precision: Option<usize>) -> String {
        self.to_string()
    }
}
