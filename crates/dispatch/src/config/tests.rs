use std::io::Write;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn missing_sections_use_defaults() {
	let config: Config = toml::from_str("").unwrap();
	assert_eq!(config, Config::default());
	assert!(config.dispatch.allow_patching);
	assert!(config.vendors.libraries.is_empty());
}

#[test]
fn load_reads_vendor_list() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	writeln!(
		file,
		r#"
[vendors]
search_dirs = ["/opt/glx"]
libraries = ["mesa", "nvidia"]
force = "nvidia"

[dispatch]
allow_patching = false
"#
	)
	.unwrap();

	let config = Config::load(file.path()).unwrap();
	assert_eq!(config.vendors.search_dirs, vec![PathBuf::from("/opt/glx")]);
	assert_eq!(config.vendors.libraries, vec!["mesa", "nvidia"]);
	assert_eq!(config.vendors.force.as_deref(), Some("nvidia"));
	assert!(!config.dispatch.allow_patching);
}

#[test]
fn load_reports_parse_errors_with_path() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	writeln!(file, "[vendors]\nlibraries = 3").unwrap();

	let err = Config::load(file.path()).unwrap_err();
	assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
}

#[test]
fn load_reports_missing_file() {
	let err = Config::load(Path::new("/nonexistent/glxmux.toml")).unwrap_err();
	assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn env_overrides_force_and_patching() {
	let mut config = Config::default();
	config.apply_env(|key| match key {
		FORCE_VENDOR_ENV => Some("mesa".into()),
		DISALLOW_PATCHING_ENV => Some("1".into()),
		_ => None,
	});
	assert_eq!(config.vendors.force.as_deref(), Some("mesa"));
	assert!(!config.dispatch.allow_patching);
}

#[test]
fn zero_or_empty_env_keeps_patching() {
	for value in ["0", ""] {
		let mut config = Config::default();
		config.apply_env(|key| (key == DISALLOW_PATCHING_ENV).then(|| value.to_string()));
		assert!(config.dispatch.allow_patching, "value {value:?}");
		assert_eq!(config.vendors.force, None);
	}
}
