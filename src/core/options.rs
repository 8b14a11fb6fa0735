use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option `{0}`")]
    Unknown(String),
    #[error("invalid value `{value}` for option `{name}` (expected one of: {expected})")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
}

/// A named, string-valued scene setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneOption {
    pub name: String,
    pub value: String,
    pub default_value: String,
    pub description: String,
    /// Empty means any value is accepted
    pub acceptable_values: Vec<String>,
    /// Whether the value was set explicitly since the last reset
    pub set: bool,
}

impl SceneOption {
    pub fn new(name: &str, default_value: &str, description: &str, acceptable_values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            value: default_value.to_string(),
            default_value: default_value.to_string(),
            description: description.to_string(),
            acceptable_values: acceptable_values.iter().map(|v| v.to_string()).collect(),
            set: false,
        }
    }

    fn accepts(&self, value: &str) -> bool {
        self.acceptable_values.is_empty() || self.acceptable_values.iter().any(|v| v == value)
    }
}

/// Options registered by a scene, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneOptions {
    options: BTreeMap<String, SceneOption>,
}

impl SceneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an option definition
    pub fn register(&mut self, option: SceneOption) {
        self.options.insert(option.name.clone(), option);
    }

    pub fn get(&self, name: &str) -> Option<&SceneOption> {
        self.options.get(name)
    }

    /// Current value, or None if the option is not registered
    pub fn value(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|o| o.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let option = self
            .options
            .get_mut(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;

        if !option.accepts(value) {
            return Err(OptionError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                expected: option.acceptable_values.join(", "),
            });
        }

        option.value = value.to_string();
        option.set = true;
        Ok(())
    }

    /// Restore every option to its default
    pub fn reset(&mut self) {
        for option in self.options.values_mut() {
            option.value = option.default_value.clone();
            option.set = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneOption> {
        self.options.values()
    }
}
