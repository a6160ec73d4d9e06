//! Get command implementation.

use serde::Serialize;
use shelfdb_core::{DbRef, Environment};

/// Get command result.
#[derive(Debug, Serialize)]
pub struct GetResult {
    /// Reference identifier.
    pub reference: String,
    /// Key that was read.
    pub key: String,
    /// Stored value.
    pub value: String,
}

/// Runs the get command and returns the formatted output.
pub fn run(
    env: &Environment,
    reference: &str,
    key: &str,
    format: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let db: DbRef<'_, str, String> = DbRef::init(reference, env)?;
    let value = db.get(key)?;

    match format {
        "text" => Ok(value),
        "json" => {
            let result = GetResult {
                reference: reference.to_string(),
                key: key.to_string(),
                value,
            };
            Ok(serde_json::to_string_pretty(&result)?)
        }
        other => Err(format!("Unknown format: {other}").into()),
    }
}
