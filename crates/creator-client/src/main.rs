//! `creator`: open the local data and print where the app stands.
//!
//! Usage: `creator [status|wipe|reset-onboarding]`

use anyhow::Context;
use tracing::info;

use creator_client::{init_tracing, App, ClientConfig};
use creator_shared::constants::APP_NAME;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {} core v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let app = App::open(config, None).context("opening local data")?;
    app.start().await;

    match std::env::args().nth(1).as_deref() {
        None | Some("status") => {}
        Some("wipe") => {
            app.wipe().await.context("wiping creator data")?;
            println!("All creator data erased.");
        }
        Some("reset-onboarding") => {
            app.reset_onboarding().await.context("resetting onboarding")?;
            println!("Onboarding will run again on next launch.");
        }
        Some(other) => anyhow::bail!("unknown command: {other}"),
    }

    let status = app.status().await;
    println!("entitlement : {}", status.entitlement);
    println!("price       : {}", status.price_label);
    println!("onboarded   : {}", status.onboarded);
    println!("route       : {:?}", status.route);
    println!("profile     : {}% complete", status.profile_percent);
    for step in &status.next_steps {
        println!("  - {step}");
    }
    println!(
        "pipeline    : {} deals, ${:.2} open, ${:.2} earned",
        status.pipeline.counts.values().sum::<usize>(),
        status.pipeline.open_value,
        status.pipeline.earned_value
    );
    println!("portfolio   : {} items", status.portfolio_items);
    println!("invoices    : {}", status.invoices);

    Ok(())
}
