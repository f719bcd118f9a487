use anyhow::{bail, Result};
use log::warn;

use crate::store::{keys, Store};

/// Get the stored display name, if any.
pub fn name(store: &dyn Store) -> Option<String> {
    store
        .get(keys::NAME)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Store a display name. Whitespace is trimmed; an empty name is rejected.
pub fn set_name(store: &dyn Store, name: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        bail!("Name cannot be empty");
    }

    store.set(keys::NAME, name)
}

/// Forget the stored display name.
pub fn clear_name(store: &dyn Store) {
    if let Err(e) = store.remove(keys::NAME) {
        warn!("Failed to clear name: {:#}", e);
    }
}

/// The greeting line shown at the top of `status`.
pub fn greeting(store: &dyn Store) -> String {
    match name(store) {
        Some(name) => format!("Hello, {}!", name),
        None => "Hello!".to_string(),
    }
}

/// True when nothing has ever been stored, meaning first-run onboarding
/// (the name prompt hint) should display.
pub fn is_first_run(store: &dyn Store) -> bool {
    name(store).is_none() && store.get(keys::STOPWATCH).is_none()
}
