use blinkify_server::adapters::places::AvailabilityProbe;
use blinkify_server::app::{self, AppError, runtime};

/// Probes the configured station once and prints the verdict as JSON.
/// Nothing is persisted and no notification is sent.
fn main() {
    if let Err(err) = probe_once() {
        eprintln!("station probe failed: {err}");
        std::process::exit(1);
    }
}

fn probe_once() -> Result<(), AppError> {
    let config = app::bootstrap()?;
    let client = runtime::build_places_client(&config)?;
    let probe = AvailabilityProbe::new(client, config.place_id.clone());

    let verdict = probe.probe();
    let rendered = serde_json::to_string_pretty(&verdict).map_err(AppError::runtime)?;
    println!("{rendered}");

    if verdict.error.is_some() {
        return Err(AppError::runtime("probe did not produce a verdict"));
    }
    Ok(())
}
