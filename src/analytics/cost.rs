use serde::{Deserialize, Serialize};

/// Per-minute delay cost rates.
///
/// Defaults: passenger time valued at 0.78 per passenger-minute with 150
/// passengers per flight, airline operating cost 74.24 per block minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    pub passenger_per_minute: f64,
    pub passengers_per_flight: f64,
    pub airline_per_minute: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            passenger_per_minute: 0.78,
            passengers_per_flight: 150.0,
            airline_per_minute: 74.24,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostEstimate {
    pub delay_minutes: i64,
    pub passenger_cost: f64,
    pub airline_cost: f64,
    pub total_cost: f64,
}

impl CostRates {
    /// Cost of `delay_minutes` of delay. Early departures cost nothing.
    pub fn estimate(&self, delay_minutes: i64) -> CostEstimate {
        let minutes = delay_minutes.max(0);
        let passenger_cost =
            minutes as f64 * self.passenger_per_minute.max(0.0) * self.passengers_per_flight.max(0.0);
        let airline_cost = minutes as f64 * self.airline_per_minute.max(0.0);

        CostEstimate {
            delay_minutes: minutes,
            passenger_cost,
            airline_cost,
            total_cost: passenger_cost + airline_cost,
        }
    }

    /// Summed estimate over many delays
    pub fn estimate_total(&self, delays: impl IntoIterator<Item = i64>) -> CostEstimate {
        delays
            .into_iter()
            .map(|d| self.estimate(d))
            .fold(CostEstimate::default(), |acc, c| CostEstimate {
                delay_minutes: acc.delay_minutes + c.delay_minutes,
                passenger_cost: acc.passenger_cost + c.passenger_cost,
                airline_cost: acc.airline_cost + c.airline_cost,
                total_cost: acc.total_cost + c.total_cost,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_costs_nothing() {
        let cost = CostRates::default().estimate(0);
        assert_eq!(cost.total_cost, 0.0);
        assert_eq!(CostRates::default().estimate(-20).total_cost, 0.0);
    }

    #[test]
    fn test_cost_is_monotonic() {
        let rates = CostRates::default();
        let totals: Vec<f64> = [0, 10, 30, 60, 120]
            .iter()
            .map(|&d| rates.estimate(d).total_cost)
            .collect();

        for pair in totals.windows(2) {
            assert!(pair[0] <= pair[1], "{:?}", totals);
        }
    }

    #[test]
    fn test_cost_components() {
        let rates = CostRates {
            passenger_per_minute: 1.0,
            passengers_per_flight: 100.0,
            airline_per_minute: 50.0,
        };
        let cost = rates.estimate(10);
        assert_eq!(cost.passenger_cost, 1000.0);
        assert_eq!(cost.airline_cost, 500.0);
        assert_eq!(cost.total_cost, 1500.0);

        let total = rates.estimate_total([10, 0, -5, 2]);
        assert_eq!(total.delay_minutes, 12);
        assert_eq!(total.total_cost, 1800.0);
    }
}
