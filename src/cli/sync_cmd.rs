use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::output::{self, OutputFormat, OutputOptions};
use crate::core::aggregate::{aggregate, derive_rates, SkippedServer, CPU_MEMORY_RATIO};
use crate::core::config::Config;
use crate::core::coroot::CorootClient;
use crate::core::error::SyncError;
use crate::core::hetzner::HetznerClient;
use crate::core::models::rates::{DerivedRates, FleetTotals};

#[derive(Serialize)]
struct SyncReport {
    generated_at: DateTime<Utc>,
    totals: FleetTotals,
    rates: DerivedRates,
    priced_servers: usize,
    skipped: Vec<SkippedServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<String>,
    dry_run: bool,
}

/// One sync run: fetch -> aggregate -> derive -> login -> resolve -> update.
///
/// Strictly sequential; the first failure aborts the rest. Nothing mutates
/// Coroot until the final update call, so there is nothing to roll back.
pub async fn run(dry_run: bool, opts: &OutputOptions) -> Result<(), SyncError> {
    let config = Config::from_env()?;

    let hetzner = HetznerClient::new(&config.hetzner_token);

    output::stage(opts, "Fetching Hetzner pricing catalog...");
    let catalog = hetzner.fetch_catalog().await?;
    output::verbose(opts, &format!("pricing catalog: {} entries", catalog.len()));

    output::stage(opts, "Fetching active servers...");
    let servers = hetzner.fetch_active_servers().await?;

    let fleet = aggregate(&servers, &catalog)?;
    for priced in &fleet.priced {
        output::detail(
            opts,
            &format!(
                "{}: {} @ {} - {:.4} EUR/mo, {} vCPU, {:.0} GB RAM",
                priced.name, priced.server_type, priced.location, priced.monthly, priced.vcpus,
                priced.ram_gb
            ),
        );
    }
    for skip in &fleet.skipped {
        output::warn(
            opts,
            &format!(
                "{}: no price found for {}@{}, skipping",
                skip.name, skip.server_type, skip.location
            ),
        );
    }

    let rates = derive_rates(&fleet.totals, CPU_MEMORY_RATIO)?;
    if opts.is_text() {
        println!();
        println!(
            "Blended rate  : {:.6} EUR/hr ({} vCPU, {:.0} GB)",
            fleet.totals.total_hourly, fleet.totals.total_vcpus, fleet.totals.total_ram_gb
        );
        println!("per_cpu_core  : {:.6} EUR/hr", rates.per_cpu_core);
        println!("per_memory_gb : {:.6} EUR/hr", rates.per_memory_gb);
    }

    let project = if dry_run {
        output::stage(opts, "Dry run, skipping Coroot update.");
        None
    } else {
        let mut coroot = CorootClient::new(&config.coroot_url);

        output::stage(opts, &format!("Logging in to {} ...", config.coroot_url));
        coroot
            .login(&config.coroot_email, &config.coroot_password)
            .await?;

        let project = coroot
            .resolve_project(config.coroot_project.as_deref())
            .await?;
        output::verbose(opts, &format!("resolved project: {}", project));

        output::stage(
            opts,
            &format!(
                "Posting rates to {}/api/project/{}/custom_cloud_pricing ...",
                config.coroot_url, project
            ),
        );
        coroot.update_pricing(&rates).await?;
        output::stage(opts, "Done.");
        Some(project)
    };

    if opts.format == OutputFormat::Json {
        let report = SyncReport {
            generated_at: Utc::now(),
            totals: fleet.totals,
            rates,
            priced_servers: fleet.priced.len(),
            skipped: fleet.skipped,
            project,
            dry_run,
        };
        let json = if opts.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .map_err(|err| SyncError::AssertionFailure(format!("report serialization: {err}")))?;
        println!("{}", json);
    }

    Ok(())
}
