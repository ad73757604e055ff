use serde::Serialize;

/// Fleet-wide hourly spend and resource totals, summed over the servers
/// whose price resolved against the catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetTotals {
    pub total_hourly: f64,
    pub total_vcpus: u32,
    pub total_ram_gb: f64,
}

/// Per-unit rates decomposed from the blended fleet rate.
///
/// Serializes as the body of Coroot's custom cloud pricing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedRates {
    pub per_cpu_core: f64,
    pub per_memory_gb: f64,
}
