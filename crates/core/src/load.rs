//! Residential connected-load estimation.
//!
//! Given counts of three fixed-wattage appliance classes on a single-phase
//! supply, computes the total load, the derived current, and the smallest
//! standard miniature circuit breaker (MCB) rating that covers it.
//!
//! ```
//! use voltcart_core::{Appliances, BreakerRating};
//!
//! let estimate = Appliances::new(10, 2, 0).estimate();
//! assert_eq!(estimate.total_watts, 240);
//! assert_eq!(estimate.breaker, BreakerRating::A6);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// LED bulb draw in watts.
pub const BULB_WATTS: u64 = 9;
/// Ceiling fan draw in watts.
pub const FAN_WATTS: u64 = 75;
/// 1.5 tonne split air conditioner draw in watts.
pub const AC_WATTS: u64 = 1500;
/// Standard single-phase supply voltage.
pub const SUPPLY_VOLTS: f64 = 230.0;

/// Standard MCB ratings, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BreakerRating {
    A6,
    A10,
    A16,
    A20,
    A32,
}

impl BreakerRating {
    /// The rating table, smallest first.
    pub const TABLE: [Self; 5] = [Self::A6, Self::A10, Self::A16, Self::A20, Self::A32];

    /// Rated current in amps.
    #[must_use]
    pub const fn amps(self) -> u32 {
        match self {
            Self::A6 => 6,
            Self::A10 => 10,
            Self::A16 => 16,
            Self::A20 => 20,
            Self::A32 => 32,
        }
    }

    /// Smallest rating whose amps are `>= current`.
    ///
    /// Currents beyond the largest entry still map to 32 A; non-finite or
    /// negative input is treated as zero.
    #[must_use]
    pub fn for_current(current: f64) -> Self {
        let current = if current.is_finite() { current.max(0.0) } else { 0.0 };
        Self::TABLE
            .into_iter()
            .find(|rating| f64::from(rating.amps()) >= current)
            .unwrap_or(Self::A32)
    }
}

impl fmt::Display for BreakerRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} A", self.amps())
    }
}

/// Appliance counts for one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Appliances {
    pub bulbs: u32,
    pub fans: u32,
    pub air_conditioners: u32,
}

impl Appliances {
    #[must_use]
    pub const fn new(bulbs: u32, fans: u32, air_conditioners: u32) -> Self {
        Self {
            bulbs,
            fans,
            air_conditioners,
        }
    }

    /// Build from raw numeric input, clamping negatives to zero.
    #[must_use]
    pub fn from_raw(bulbs: i64, fans: i64, air_conditioners: i64) -> Self {
        let clamp = |n: i64| u32::try_from(n.max(0)).unwrap_or(u32::MAX);
        Self::new(clamp(bulbs), clamp(fans), clamp(air_conditioners))
    }

    /// Total connected load in watts.
    #[must_use]
    pub fn total_watts(&self) -> u64 {
        u64::from(self.bulbs) * BULB_WATTS
            + u64::from(self.fans) * FAN_WATTS
            + u64::from(self.air_conditioners) * AC_WATTS
    }

    /// Compute the full estimate at [`SUPPLY_VOLTS`].
    #[must_use]
    pub fn estimate(&self) -> LoadEstimate {
        let total_watts = self.total_watts();
        #[allow(clippy::cast_precision_loss)] // appliance loads stay far below 2^52 W
        let current_amps = total_watts as f64 / SUPPLY_VOLTS;
        LoadEstimate {
            total_watts,
            current_amps,
            breaker: BreakerRating::for_current(current_amps),
        }
    }
}

/// Result of a load calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadEstimate {
    pub total_watts: u64,
    pub current_amps: f64,
    pub breaker: BreakerRating,
}
