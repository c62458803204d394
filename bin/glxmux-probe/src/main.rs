//! glxmux probe.
//!
//! Loads the configured GLX vendors into a dispatcher and prints what was registered and how
//! the requested function names resolve.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use glxmux_abi::{BaselineEntry, VENDOR_ABI_VERSION};
use glxmux_dispatch::{Config, Dispatcher, Resolution};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glxmux-probe")]
#[command(about = "Load GLX vendors and inspect dispatch resolution")]
struct Args {
	/// Configuration file (defaults to $GLXMUX_CONFIG, then the user config dir)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Additional vendor to load
	#[arg(long = "vendor", value_name = "NAME")]
	vendors: Vec<String>,

	/// Additional directory searched for vendor libraries
	#[arg(long = "search-dir", value_name = "DIR")]
	search_dirs: Vec<PathBuf>,

	/// Function name to resolve
	#[arg(short, long = "resolve", value_name = "NAME")]
	resolve: Vec<String>,

	/// Fail unless every requested vendor loaded
	#[arg(long)]
	strict: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn setup_tracing(verbose: bool) {
	let default = if verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
	let mut config = match &args.config {
		Some(path) => {
			let mut config = Config::load(path).with_context(|| format!("loading {}", path.display()))?;
			config.apply_env(|key| std::env::var(key).ok());
			config
		}
		None => Config::discover().context("discovering glxmux config")?,
	};
	config.vendors.libraries.extend(args.vendors.iter().cloned());
	config.vendors.search_dirs.extend(args.search_dirs.iter().cloned());
	Ok(config)
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = load_config(&args)?;
	info!(abi = VENDOR_ABI_VERSION, vendors = ?config.vendors.libraries, "Starting glxmux-probe");

	let dispatcher = Dispatcher::new(&config);
	let wanted = glxmux_loader::configured_vendors(&config);
	let loaded = glxmux_loader::load_into(&dispatcher, &config);
	if args.strict && loaded.len() != wanted.len() {
		bail!("loaded {} of {} vendors", loaded.len(), wanted.len());
	}

	println!("vendors:");
	for vendor in dispatcher.vendors() {
		println!(
			"  {:>2}  {:<16} abi {}  baseline {}/{}  patching {}",
			vendor.id(),
			vendor.name(),
			vendor.abi_version(),
			vendor.baseline().provided(),
			BaselineEntry::ALL.len(),
			if vendor.patch_callbacks().is_some() { "yes" } else { "no" },
		);
	}

	if !args.resolve.is_empty() {
		println!("resolution:");
	}
	for name in &args.resolve {
		match dispatcher.resolve(name) {
			Resolution::Baseline(entry) => {
				let providers: Vec<_> = dispatcher
					.vendors()
					.iter()
					.filter(|v| v.baseline_entry(entry).is_some())
					.map(|v| v.name().to_string())
					.collect();
				println!("  {name:<32} baseline #{:<3} {}", entry.index(), providers.join(", "));
			}
			Resolution::Slot(slot) => {
				let providers: Vec<_> = dispatcher
					.vendors()
					.iter()
					.filter(|v| v.callbacks().get_dispatch_address(name).is_some())
					.map(|v| v.name().to_string())
					.collect();
				println!("  {name:<32} slot     #{:<3} {}", slot.0, providers.join(", "));
			}
		}
	}

	Ok(())
}
