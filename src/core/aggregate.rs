use crate::core::error::SyncError;
use crate::core::models::catalog::PriceCatalog;
use crate::core::models::rates::{DerivedRates, FleetTotals};
use crate::core::models::server::ServerRecord;

/// CPU:memory unit-cost ratio, matching Coroot's GCP C4 baseline
/// (0.03465 USD/vCPU/hr / 0.003938 USD/GB/hr ~= 8.8).
pub const CPU_MEMORY_RATIO: f64 = 0.03465 / 0.003938;

const RECONSTRUCTION_EPSILON: f64 = 1e-9;

/// A server whose price resolved, with the detail the orchestrator prints.
#[derive(Debug, Clone)]
pub struct PricedServer {
    pub name: String,
    pub server_type: String,
    pub location: String,
    pub monthly: f64,
    pub vcpus: u32,
    pub ram_gb: f64,
}

/// A server with no catalog entry for its `(type, location)`. Excluded from
/// the totals, never zero-filled.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SkippedServer {
    pub name: String,
    pub server_type: String,
    pub location: String,
}

#[derive(Debug)]
pub struct FleetAggregation {
    pub totals: FleetTotals,
    pub priced: Vec<PricedServer>,
    pub skipped: Vec<SkippedServer>,
}

/// Fold the active inventory against the price catalog.
///
/// Servers without a catalog entry are recorded as skips and excluded.
/// Fails when nothing at all could be priced: a fleet with zero priced
/// vCPUs cannot be decomposed.
pub fn aggregate(
    servers: &[ServerRecord],
    catalog: &PriceCatalog,
) -> Result<FleetAggregation, SyncError> {
    let mut totals = FleetTotals::default();
    let mut priced = Vec::new();
    let mut skipped = Vec::new();

    for server in servers {
        match catalog.lookup(&server.server_type, &server.location) {
            Some(entry) => {
                totals.total_hourly += entry.hourly;
                totals.total_vcpus += server.vcpus;
                totals.total_ram_gb += server.ram_gb;
                priced.push(PricedServer {
                    name: server.name.clone(),
                    server_type: server.server_type.clone(),
                    location: server.location.clone(),
                    monthly: entry.monthly,
                    vcpus: server.vcpus,
                    ram_gb: server.ram_gb,
                });
            }
            None => skipped.push(SkippedServer {
                name: server.name.clone(),
                server_type: server.server_type.clone(),
                location: server.location.clone(),
            }),
        }
    }

    if totals.total_vcpus == 0 {
        return Err(SyncError::NoPriceableServers);
    }

    Ok(FleetAggregation {
        totals,
        priced,
        skipped,
    })
}

/// Split the blended hourly rate into per-CPU and per-memory rates.
///
/// Closed-form solve of:
///   per_cpu * vcpus + per_memory * ram = total_hourly
///   per_cpu = ratio * per_memory
/// => per_memory = total_hourly / (ratio * vcpus + ram)
pub fn derive_rates(totals: &FleetTotals, ratio: f64) -> Result<DerivedRates, SyncError> {
    let per_memory_gb =
        totals.total_hourly / (ratio * totals.total_vcpus as f64 + totals.total_ram_gb);
    let per_cpu_core = ratio * per_memory_gb;

    let reconstructed =
        per_cpu_core * totals.total_vcpus as f64 + per_memory_gb * totals.total_ram_gb;
    let drift = (reconstructed - totals.total_hourly).abs();
    if drift >= RECONSTRUCTION_EPSILON {
        return Err(SyncError::AssertionFailure(format!(
            "derived rates reconstruct {:.12} EUR/hr instead of {:.12} (drift {:e})",
            reconstructed, totals.total_hourly, drift
        )));
    }

    Ok(DerivedRates {
        per_cpu_core,
        per_memory_gb,
    })
}
