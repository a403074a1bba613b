//! # creator-client
//!
//! The app core that UI shells embed: configuration, tracing, the purchase
//! oracle strategy, entitlement resolution, navigation gating and the
//! publish-API client, wired together by [`App`].

pub mod config;
pub mod entitlement;
pub mod gate;
pub mod oracle;
pub mod publish;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use entitlement::{EntitlementError, EntitlementManager};
pub use gate::{Gate, OnboardingPhase, Route};
pub use oracle::{select_oracle, EntitlementOracle, OracleError, UnavailableOracle};
pub use publish::{PublishClient, PublishError, PublishStep};
pub use state::{App, AppStatus};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("creator_client=debug,creator_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
