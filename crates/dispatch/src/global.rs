use std::sync::OnceLock;

use crate::config::Config;
use crate::dispatcher::Dispatcher;

static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();

/// Process-wide dispatcher used by the C entry points.
///
/// Configured from [`Config::discover_or_default`] on first use.
pub fn global() -> &'static Dispatcher {
	GLOBAL.get_or_init(|| {
		let config = Config::discover_or_default();
		tracing::debug!(?config, "Initializing glxmux dispatcher");
		Dispatcher::new(&config)
	})
}

/// Installs `dispatcher` as the process-wide instance.
///
/// Returns it back if [`global`] was already initialized.
pub fn install_global(dispatcher: Dispatcher) -> Result<&'static Dispatcher, Dispatcher> {
	GLOBAL.set(dispatcher)?;
	Ok(global())
}
