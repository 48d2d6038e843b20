//! Simulated tariff curve used when REE is unavailable

use rand::Rng;
use smartmeter_shared::electrical::round_to;
use smartmeter_shared::wire::{PricePeriod, PricePoint};

/// Typical price in €/kWh around which the simulation varies
const BASE_PRICE: f64 = 0.12;

/// Generate 24 hourly prices for `date` from the thread RNG
pub fn generate(date: &str) -> Vec<PricePoint> {
    generate_with(date, &mut rand::rng())
}

/// Generate 24 hourly prices for `date` from `rng`
pub fn generate_with<R: Rng>(date: &str, rng: &mut R) -> Vec<PricePoint> {
    (0..24)
        .map(|hour| {
            let period = PricePeriod::for_hour(hour);
            let variation: f64 = match period {
                PricePeriod::Valle => rng.random_range(-0.03..0.01),
                PricePeriod::Punta => rng.random_range(0.02..0.06),
                PricePeriod::Llano => rng.random_range(-0.01..0.02),
            };

            PricePoint {
                hour,
                price: round_to(BASE_PRICE + variation, 3),
                date: date.to_string(),
                period,
                datetime: format!("{date}T{hour:02}:00:00"),
            }
        })
        .collect()
}
