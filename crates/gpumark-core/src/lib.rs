// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod error;
mod time;

pub use error::ConfigError;
pub use time::timestamp_us;

/// Installs the global fmt subscriber, filtered by `RUST_LOG` (default
/// `info`). Returns false when a subscriber was already in place.
pub fn init_tracing() -> bool {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }
    installed
}

/// Splits `src` on `delim`, keeping empty fields.
///
/// A trailing delimiter yields a trailing empty field (`"a,b,"` gives
/// `["a", "b", ""]`), while an empty input yields no fields at all.
pub fn split(src: &str, delim: char) -> Vec<String> {
    if src.is_empty() {
        return Vec::new();
    }
    src.split(delim).map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_empty_fields() {
        assert_eq!(split("a,,b", ','), vec!["a", "", "b"]);
        assert_eq!(split("a,b,", ','), vec!["a", "b", ""]);
        assert_eq!(split("solo", ','), vec!["solo"]);
        assert!(split("", ',').is_empty());
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        assert!(!init_tracing());
    }
}
