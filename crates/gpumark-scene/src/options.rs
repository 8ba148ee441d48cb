// SPDX-License-Identifier: CEPL-1.0
use std::collections::BTreeMap;

use gpumark_core::{split, ConfigError};

/// One string-typed scene option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneOption {
    pub name: String,
    pub value: String,
    pub default_value: String,
    pub description: String,
    /// Empty means any value is accepted.
    pub acceptable_values: Vec<String>,
    /// Set explicitly since the last reset.
    pub set: bool,
}

impl SceneOption {
    pub fn new(name: &str, default_value: &str, description: &str, acceptable: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: default_value.to_owned(),
            default_value: default_value.to_owned(),
            description: description.to_owned(),
            acceptable_values: split(acceptable, ','),
            set: false,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.acceptable_values.is_empty() || self.acceptable_values.iter().any(|v| v == value)
    }
}

/// Options of one scene, listed in name order.
#[derive(Clone, Debug, Default)]
pub struct SceneOptions {
    map: BTreeMap<String, SceneOption>,
}

impl SceneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, default_value: &str, description: &str, acceptable: &str) {
        self.map.insert(
            name.to_owned(),
            SceneOption::new(name, default_value, description, acceptable),
        );
    }

    pub fn get(&self, name: &str) -> Option<&SceneOption> {
        self.map.get(name)
    }

    /// Current value of a registered option.
    ///
    /// Unregistered names read as the empty string.
    pub fn value(&self, name: &str) -> &str {
        self.map.get(name).map_or("", |o| o.value.as_str())
    }

    pub fn set(&mut self, scene: &str, name: &str, value: &str) -> Result<(), ConfigError> {
        let accepted = self.names().join(",");
        let Some(opt) = self.map.get_mut(name) else {
            return Err(ConfigError::UnknownOption {
                scene: scene.to_owned(),
                option: name.to_owned(),
                accepted,
            });
        };
        if !opt.accepts(value) {
            return Err(ConfigError::InvalidValue {
                option: name.to_owned(),
                value: value.to_owned(),
                accepted: Some(opt.acceptable_values.join(",")),
            });
        }
        opt.value = value.to_owned();
        opt.set = true;
        Ok(())
    }

    pub fn reset(&mut self) {
        for opt in self.map.values_mut() {
            opt.value.clone_from(&opt.default_value);
            opt.set = false;
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneOption> {
        self.map.values()
    }

    /// Explicitly set options as `a=1:b=2`, or `<default>` when none are.
    pub fn describe_set(&self) -> String {
        let set: Vec<String> = self
            .iter()
            .filter(|o| o.set)
            .map(|o| format!("{}={}", o.name, o.value))
            .collect();
        if set.is_empty() {
            "<default>".to_owned()
        } else {
            set.join(":")
        }
    }
}
