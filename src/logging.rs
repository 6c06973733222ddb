//! Tracing setup.
//!
//! Logs go to stderr so stdout stays clean for command output. The
//! configured directive applies on top of `RUST_LOG`, which may extend
//! or override it per module:
//!
//! ```bash
//! RUST_LOG=debug codatlas index .
//! RUST_LOG=codatlas::pipeline=trace codatlas pending
//! ```

use crate::config::LoggingConfig;
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

static INIT: Once = Once::new();

/// Initialize the subscriber once; later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    let directive = config.default.clone();
    INIT.call_once(move || {
        let mut filter = EnvFilter::from_default_env();
        match directive.parse::<Directive>() {
            Ok(parsed) => filter = filter.add_directive(parsed),
            Err(e) => eprintln!("codatlas: Warning: invalid log directive '{directive}': {e}"),
        }

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
    });
}

/// Initialize with the default directive (`codatlas=warn`).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}
