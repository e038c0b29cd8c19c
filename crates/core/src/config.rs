//! Read-only configuration consumed by the orchestrator.
//!
//! Three layered sources, highest precedence first:
//! 1. process environment variables (case-insensitive lookup),
//! 2. `settings/*.properties` files (`key=value`, `#` comments),
//! 3. nothing — `get` returns `None` and callers supply defaults.
//!
//! Separately, environment YAML files under `environments/` feed the
//! [`Config::target`] dot-notation lookup: `default.yml` loads first and
//! `<HERD_ENV>.yml` deep-merges over it, with `${VAR}` placeholders
//! replaced from the process environment.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde_yaml::Value;

use crate::error::{HerdError, Result};

const ACTIVE_ENV_VAR: &str = "HERD_ENV";
const LIST_SEPARATOR: char = ';';

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Default)]
pub struct Config {
	properties: HashMap<String, String>,
	environment: Value,
}

impl Config {
	/// Loads configuration from `settings/` and `environments/` under the
	/// working directory. Missing directories are fine.
	pub fn load() -> Result<Self> {
		Self::from_dirs(Path::new("settings"), Path::new("environments"))
	}

	pub fn from_dirs(properties_dir: &Path, environments_dir: &Path) -> Result<Self> {
		let mut config = Config { properties: HashMap::new(), environment: Value::Null };
		config.load_properties(properties_dir)?;
		config.load_environment(environments_dir)?;
		Ok(config)
	}

	fn load_properties(&mut self, dir: &Path) -> Result<()> {
		if !dir.is_dir() {
			return Ok(());
		}
		let mut paths: Vec<_> = std::fs::read_dir(dir)?
			.filter_map(|entry| entry.ok().map(|e| e.path()))
			.filter(|path| path.extension().is_some_and(|ext| ext == "properties"))
			.collect();
		paths.sort();
		for path in paths {
			let content = std::fs::read_to_string(&path)?;
			for line in content.lines() {
				let line = line.trim();
				if line.is_empty() || line.starts_with('#') {
					continue;
				}
				if let Some((key, value)) = line.split_once('=') {
					self.properties.insert(key.trim().to_string(), value.trim().to_string());
				}
			}
		}
		Ok(())
	}

	fn load_environment(&mut self, dir: &Path) -> Result<()> {
		let active = std::env::var(ACTIVE_ENV_VAR).unwrap_or_else(|_| "default".into());

		let mut merged = load_yaml(&dir.join("default.yml"))?.unwrap_or(Value::Null);
		if active != "default" {
			if let Some(overlay) = load_yaml(&dir.join(format!("{active}.yml")))? {
				deep_merge(&mut merged, overlay);
			}
		}
		substitute_env_vars(&mut merged);
		self.environment = merged;
		Ok(())
	}

	/// Looks `key` up in the process environment (exact, upper, lower),
	/// then in the properties files (exact, then case-insensitive).
	pub fn get(&self, key: &str) -> Option<String> {
		for candidate in [key.to_string(), key.to_uppercase(), key.to_lowercase()] {
			if let Ok(value) = std::env::var(&candidate) {
				return Some(value);
			}
		}
		if let Some(value) = self.properties.get(key) {
			return Some(value.clone());
		}
		let lowered = key.to_lowercase();
		self.properties
			.iter()
			.find(|(candidate, _)| candidate.to_lowercase() == lowered)
			.map(|(_, value)| value.clone())
	}

	pub fn get_or(&self, key: &str, default: &str) -> String {
		self.get(key).unwrap_or_else(|| default.to_string())
	}

	/// Splits a `;`-separated value into trimmed, non-empty items.
	pub fn get_list(&self, key: &str) -> Vec<String> {
		self.get(key)
			.map(|raw| {
				raw.split(LIST_SEPARATOR)
					.map(str::trim)
					.filter(|item| !item.is_empty())
					.map(String::from)
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn get_bool(&self, key: &str) -> bool {
		self.get(key)
			.map(|raw| matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y" | "on"))
			.unwrap_or(false)
	}

	pub fn get_int(&self, key: &str) -> Option<i64> {
		self.get(key).and_then(|raw| raw.trim().parse().ok())
	}

	/// Parses a value holding an embedded JSON object.
	pub fn get_dict(&self, key: &str) -> serde_json::Map<String, serde_json::Value> {
		self.get(key)
			.and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
			.and_then(|value| value.as_object().cloned())
			.unwrap_or_default()
	}

	/// Looks a key up in the merged environment YAML. Nested values use
	/// dot notation: `target("custom_config.feature_flag_1")`.
	pub fn target(&self, key: &str) -> Option<&Value> {
		let mut current = &self.environment;
		for part in key.split('.') {
			current = current.as_mapping()?.get(Value::String(part.to_string()))?;
		}
		Some(current)
	}

	pub fn target_str(&self, key: &str) -> Option<&str> {
		self.target(key).and_then(Value::as_str)
	}
}

fn load_yaml(path: &Path) -> Result<Option<Value>> {
	if !path.is_file() {
		return Ok(None);
	}
	let content = std::fs::read_to_string(path)?;
	let value = serde_yaml::from_str(&content)
		.map_err(|source| HerdError::Parse { path: path.to_path_buf(), source })?;
	Ok(Some(value))
}

/// Merges `overlay` into `base`; nested mappings merge recursively,
/// everything else replaces.
fn deep_merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
			for (key, overlay_value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(base_value) => deep_merge(base_value, overlay_value),
					None => {
						base_map.insert(key, overlay_value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

/// Replaces `${VAR}` placeholders with process environment values.
/// Unset variables substitute as empty.
fn substitute_env_vars(value: &mut Value) {
	match value {
		Value::String(text) => {
			if PLACEHOLDER_RE.is_match(text) {
				let replaced = PLACEHOLDER_RE
					.replace_all(text, |caps: &regex_lite::Captures<'_>| {
						std::env::var(&caps[1]).unwrap_or_default()
					})
					.into_owned();
				*text = replaced;
			}
		}
		Value::Sequence(items) => items.iter_mut().for_each(substitute_env_vars),
		Value::Mapping(map) => map.iter_mut().for_each(|(_, item)| substitute_env_vars(item)),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	fn write(dir: &Path, name: &str, content: &str) {
		std::fs::create_dir_all(dir).unwrap();
		std::fs::write(dir.join(name), content).unwrap();
	}

	fn config_from(tmp: &TempDir) -> Config {
		Config::from_dirs(&tmp.path().join("settings"), &tmp.path().join("environments")).unwrap()
	}

	#[test]
	fn properties_lookup_is_case_insensitive() {
		let tmp = TempDir::new().unwrap();
		write(&tmp.path().join("settings"), "appium.properties", "# device\ndeviceName=emulator-5554\nappium_url=http://localhost:4723\n");
		let config = config_from(&tmp);

		assert_eq!(config.get("deviceName").as_deref(), Some("emulator-5554"));
		assert_eq!(config.get("DEVICENAME").as_deref(), Some("emulator-5554"));
		assert_eq!(config.get("missing"), None);
		assert_eq!(config.get_or("missing", "fallback"), "fallback");
	}

	#[test]
	fn environment_variables_take_precedence() {
		let tmp = TempDir::new().unwrap();
		write(&tmp.path().join("settings"), "app.properties", "herd_cfg_precedence=from-file\n");
		unsafe { std::env::set_var("HERD_CFG_PRECEDENCE", "from-env") };
		let config = config_from(&tmp);

		assert_eq!(config.get("herd_cfg_precedence").as_deref(), Some("from-env"));
		unsafe { std::env::remove_var("HERD_CFG_PRECEDENCE") };
	}

	#[test]
	fn list_bool_int_and_dict_accessors() {
		let tmp = TempDir::new().unwrap();
		write(
			&tmp.path().join("settings"),
			"run.properties",
			"args=--headless; --incognito ;\nheadless=yes\nretries=3\ncapabilities={\"fullReset\": true}\n",
		);
		let config = config_from(&tmp);

		assert_eq!(config.get_list("args"), vec!["--headless", "--incognito"]);
		assert!(config.get_bool("headless"));
		assert!(!config.get_bool("missing"));
		assert_eq!(config.get_int("retries"), Some(3));
		assert_eq!(config.get_dict("capabilities").get("fullReset"), Some(&serde_json::json!(true)));
	}

	#[test]
	fn environment_yaml_merges_and_substitutes() {
		let tmp = TempDir::new().unwrap();
		let environments = tmp.path().join("environments");
		write(&environments, "default.yml", "url: https://default.example\ncustom_config:\n  feature_flag_1: false\n  keep: true\n");
		write(&environments, "staging.yml", "url: https://${HERD_CFG_STAGING_HOST}\ncustom_config:\n  feature_flag_1: true\n");
		unsafe {
			std::env::set_var("HERD_ENV", "staging");
			std::env::set_var("HERD_CFG_STAGING_HOST", "staging.example");
		}
		let config = config_from(&tmp);
		unsafe {
			std::env::remove_var("HERD_ENV");
			std::env::remove_var("HERD_CFG_STAGING_HOST");
		}

		assert_eq!(config.target_str("url"), Some("https://staging.example"));
		assert_eq!(config.target("custom_config.feature_flag_1"), Some(&Value::Bool(true)));
		assert_eq!(config.target("custom_config.keep"), Some(&Value::Bool(true)));
		assert_eq!(config.target("custom_config.absent"), None);
	}
}
