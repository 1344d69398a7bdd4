use crate::config::{Config, config_path, set_value_in_file};
use anyhow::{Context, Result, bail};
use serde_json::Value;

const MASK: &str = "********";

/// Config as a JSON tree with the API key masked. Unset options stay as `null`.
fn masked(config: &Config) -> Result<Value> {
    let mut tree = serde_json::to_value(config).context("Failed to serialize config")?;
    if let Some(key) = tree.pointer_mut("/store/api_key") {
        if !key.is_null() {
            *key = Value::String(MASK.to_string());
        }
    }
    Ok(tree)
}

pub fn list(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.store.api_key.is_some() {
        shown.store.api_key = Some(MASK.to_string());
    }
    print!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    Ok(())
}

/// Print one value by dotted key, e.g. `display.grouping`.
pub fn get(key: &str, config: &Config) -> Result<()> {
    let tree = masked(config)?;

    let mut current = &tree;
    for part in key.split('.') {
        let Some(section) = current.as_object() else {
            bail!("'{}' is not a section", key);
        };
        let Some(value) = section.get(part) else {
            let known: Vec<&str> = section.keys().map(String::as_str).collect();
            bail!("Unknown key '{}' (expected one of: {})", part, known.join(", "));
        };
        current = value;
    }

    match current {
        Value::String(s) => println!("{}", s),
        Value::Null => println!("(unset)"),
        other => println!("{}", other),
    }
    Ok(())
}

/// Write `key = value` into the config file. Comments in the file are not preserved.
pub fn set(key: &str, value: &str) -> Result<()> {
    let path = config_path()?;
    set_value_in_file(&path, key, value)?;
    let shown = if key.ends_with("api_key") { MASK } else { value };
    println!("✓ {} = {} ({})", key, shown, path.display());
    Ok(())
}
