//! Project rules loader.
//!
//! A jail root may carry a plain-text rules file whose contents extend the
//! system prompt for every session started there.

use std::path::Path;
use tracing::{debug, info, warn};

/// Default rules file name, looked up in the jail root.
pub const DEFAULT_RULES_FILE: &str = "nomina-rules.txt";

/// Read `<root>/<rules_file>` if it exists.
///
/// Returns `None` if the file is missing, unreadable, or blank.
pub fn load_project_rules(root: &Path, rules_file: &str) -> Option<String> {
    let path = root.join(rules_file);
    if !path.is_file() {
        debug!(path = %path.display(), "no project rules file");
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) if content.trim().is_empty() => None,
        Ok(content) => {
            info!(path = %path.display(), bytes = content.len(), "Loaded project rules");
            Some(content)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read project rules");
            None
        }
    }
}

/// The system prompt for a session: `base`, then the project rules (if any)
/// after a newline.
pub fn build_system_prompt(base: &str, root: &Path, rules_file: &str) -> String {
    match load_project_rules(root, rules_file) {
        Some(rules) => format!("{base}\n{rules}"),
        None => base.to_string(),
    }
}
