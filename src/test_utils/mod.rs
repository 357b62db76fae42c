//! Test utilities for credo
//!
//! Mock external sources, temporary projects and logging setup shared by unit
//! tests and the integration suite (enable the `test-utils` feature for the
//! latter).
//!
//! # Example
//!
//! ```rust,no_run
//! use credo_cli::modules::{AptModule, Module};
//! use credo_cli::spell::Spell;
//! use credo_cli::test_utils::{MockAptClient, TestProject};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let project = TestProject::new()?;
//! let client = Arc::new(MockAptClient::new().with_package("curl", &["libcurl4"]));
//! let apt = AptModule::new(project.context(), client.clone());
//! apt.resolve(Spell::new("curl").into()).await?;
//! assert_eq!(client.update_calls(), 1);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::TestProject;
pub use mocks::{MockAptClient, MockDownloader};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=credo_cli=debug,apt=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
