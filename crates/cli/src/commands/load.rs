//! Offline electrical load estimate.

use voltcart_core::Appliances;

/// Print the wattage, current and breaker for the given appliance counts.
/// Negative counts are treated as zero.
#[allow(clippy::print_stdout)]
pub fn estimate(bulbs: i64, fans: i64, ac: i64) {
    let appliances = Appliances::from_raw(bulbs, fans, ac);
    let estimate = appliances.estimate();
    println!(
        "{} bulbs, {} fans, {} AC",
        appliances.bulbs, appliances.fans, appliances.air_conditioners
    );
    println!("Total load:  {} W", estimate.total_watts);
    println!("Current:     {:.2} A", estimate.current_amps);
    println!("Breaker:     {}", estimate.breaker);
}
