//! Put command implementation.

use shelfdb_core::{DbRef, Environment};

/// Runs the put command.
pub fn run(
    env: &Environment,
    reference: &str,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db: DbRef<'_, str, String> = DbRef::init(reference, env)?;
    db.put(key, &value.to_string())?;
    Ok(())
}
