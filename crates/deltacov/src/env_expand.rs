//! Environment variable expansion for configuration files.
//!
//! - `${VAR}` is replaced with the value of `VAR`; an unset variable is an error
//! - `${VAR:-default}` falls back to `default` when `VAR` is unset or empty
//!
//! A `$` not followed by a well-formed `${NAME...}` reference is left alone.

use std::borrow::Cow;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;
use tracing::debug;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex should compile")
});

/// Expand references against the process environment.
pub fn expand_env_vars(text: &str) -> Result<String> {
    expand_with(text, |name| std::env::var(name).ok()).map(Cow::into_owned)
}

/// Expand references using `lookup` to resolve variable names.
pub fn expand_with<F>(text: &str, lookup: F) -> Result<Cow<'_, str>>
where
    F: Fn(&str) -> Option<String>,
{
    if !text.contains("${") {
        return Ok(Cow::Borrowed(text));
    }

    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for cap in REFERENCE.captures_iter(text) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let name = name.as_str();
        out.push_str(&text[last_end..whole.start()]);

        let value = lookup(name);
        match (value, cap.get(2)) {
            (Some(v), Some(default)) if v.is_empty() => {
                debug!("env var ${{{name}}} is empty, using default");
                out.push_str(default.as_str());
            }
            (Some(v), _) => out.push_str(&v),
            (None, Some(default)) => {
                debug!("env var ${{{name}}} not set, using default");
                out.push_str(default.as_str());
            }
            (None, None) => bail!(
                "environment variable '{name}' is not set; use ${{{name}:-default}} to provide a default"
            ),
        }
        last_end = whole.end();
    }

    out.push_str(&text[last_end..]);
    Ok(Cow::Owned(out))
}
