// SPDX-License-Identifier: CEPL-1.0
use thiserror::Error;

/// Invalid benchmark or builder configuration.
///
/// Always raised before any device object is created, so the caller can
/// abort scene activation without cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value \"{value}\" for option \"{option}\"{}", accepted_hint(.accepted))]
    InvalidValue {
        option: String,
        value: String,
        accepted: Option<String>,
    },

    #[error("too many components in \"{option}\" option ({count} given, at most {max})")]
    TooManyComponents {
        option: String,
        count: usize,
        max: usize,
    },

    #[error("option \"{option}={value}\" only works with \"{requires}\"")]
    Incompatible {
        option: String,
        value: String,
        requires: String,
    },

    #[error("scene \"{scene}\" has no option \"{option}\" (accepted: {accepted})")]
    UnknownOption {
        scene: String,
        option: String,
        accepted: String,
    },

    #[error("unknown scene \"{name}\" (accepted: {accepted})")]
    UnknownScene { name: String, accepted: String },

    #[error("render pass has {formats} color formats but {load_ops} color load ops")]
    MismatchedAttachments { formats: usize, load_ops: usize },

    #[error("render pass has no color or depth attachments")]
    EmptyRenderPass,

    #[error("{builder}: {parameter} was never set")]
    MissingParameter {
        builder: &'static str,
        parameter: &'static str,
    },
}

fn accepted_hint(accepted: &Option<String>) -> String {
    match accepted {
        Some(list) => format!(" (accepted: {list})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_names_option_and_alternatives() {
        let e = ConfigError::InvalidValue {
            option: "clear-mode".into(),
            value: "blit".into(),
            accepted: Some("cmd,loadop".into()),
        };
        assert_eq!(
            e.to_string(),
            "invalid value \"blit\" for option \"clear-mode\" (accepted: cmd,loadop)"
        );
    }

    #[test]
    fn invalid_value_without_alternatives() {
        let e = ConfigError::InvalidValue {
            option: "num-rts".into(),
            value: "x".into(),
            accepted: None,
        };
        assert_eq!(e.to_string(), "invalid value \"x\" for option \"num-rts\"");
    }
}
