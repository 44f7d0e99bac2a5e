//! Process-wide tracing setup.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,superstore=info,tower_http=info";

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the fmt subscriber once; `RUST_LOG` overrides the default directives.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}
