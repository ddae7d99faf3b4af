//! Market index curves used by the market fluctuation deduction

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A term structure of index rates (percent) by horizon in months
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCurve {
    pub index_type: String,

    /// `(horizon_months, rate)` sorted by horizon
    points: Vec<(u32, Decimal)>,
}

impl IndexCurve {
    pub fn new(index_type: impl Into<String>, mut points: Vec<(u32, Decimal)>) -> Self {
        points.sort_by_key(|(months, _)| *months);
        points.dedup_by_key(|(months, _)| *months);
        Self {
            index_type: index_type.into(),
            points,
        }
    }

    /// Rate at a horizon, linearly interpolated between the surrounding points
    ///
    /// Horizons outside the curve take the nearest end point. `None` for an
    /// empty curve.
    pub fn interpolate(&self, months: u32) -> Option<Decimal> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if months <= first.0 {
            return Some(first.1);
        }
        if months >= last.0 {
            return Some(last.1);
        }

        let upper = self.points.iter().position(|(m, _)| *m >= months)?;
        let (m1, r1) = self.points[upper - 1];
        let (m2, r2) = self.points[upper];
        if m2 == months {
            return Some(r2);
        }

        let weight = Decimal::from(months - m1) / Decimal::from(m2 - m1);
        Some(r1 + (r2 - r1) * weight)
    }
}
