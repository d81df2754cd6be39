//! Collection options.
//!
//! Each plugin declares a static option list; the driver resolves final
//! values from config overrides before `setup` runs. Resolved values
//! are typed, validated, and immutable for the rest of the run.

use sg_config::OptionOverride;
use std::collections::HashMap;
use thiserror::Error;

/// How costly enabling an option is; surfaced in `plugins list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTier {
    Fast,
    Slow,
}

/// Flag or free-form value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Flag,
    Value,
}

/// A declared collection option.
#[derive(Debug, Clone, Copy)]
pub struct OptionDecl {
    pub name: &'static str,
    pub description: &'static str,
    pub tier: OptionTier,
    pub kind: OptionKind,
    pub default: &'static str,
}

/// Errors from option resolution.
#[derive(Debug, Error)]
pub enum OptionError {
    #[error("plugin {plugin} has no option named {option}")]
    Unknown { plugin: String, option: String },

    #[error("option {plugin}.{option} is a flag; {value:?} is not a boolean")]
    InvalidFlag {
        plugin: String,
        option: String,
        value: String,
    },
}

/// A resolved option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

/// The resolved option set for one plugin.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOptions {
    values: HashMap<&'static str, OptionValue>,
}

impl ResolvedOptions {
    /// Resolve declared options against config overrides.
    pub fn resolve<'a>(
        plugin: &str,
        decls: &[OptionDecl],
        overrides: impl Iterator<Item = &'a OptionOverride>,
    ) -> Result<Self, OptionError> {
        let mut values: HashMap<&'static str, OptionValue> = decls
            .iter()
            .map(|d| Ok((d.name, parse_value(plugin, d, d.default)?)))
            .collect::<Result<_, OptionError>>()?;

        for o in overrides {
            let decl = decls
                .iter()
                .find(|d| d.name == o.option)
                .ok_or_else(|| OptionError::Unknown {
                    plugin: plugin.to_string(),
                    option: o.option.clone(),
                })?;
            values.insert(decl.name, parse_value(plugin, decl, &o.value)?);
        }
        Ok(Self { values })
    }

    /// Flag value; false for non-flags and undeclared names.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(OptionValue::Bool(true)))
    }

    /// String value; `None` for flags, undeclared names, and the empty
    /// string (an empty value option means "not set").
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::Str(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Split a value option on `delimiter`, dropping empty pieces.
    pub fn as_list(&self, name: &str, delimiter: char) -> Vec<String> {
        self.value(name)
            .map(|s| {
                s.split(delimiter)
                    .filter(|piece| !piece.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_value(plugin: &str, decl: &OptionDecl, raw: &str) -> Result<OptionValue, OptionError> {
    match decl.kind {
        OptionKind::Value => Ok(OptionValue::Str(raw.to_string())),
        OptionKind::Flag => match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(OptionValue::Bool(true)),
            "false" | "off" | "no" | "0" | "" => Ok(OptionValue::Bool(false)),
            _ => Err(OptionError::InvalidFlag {
                plugin: plugin.to_string(),
                option: decl.name.to_string(),
                value: raw.to_string(),
            }),
        },
    }
}
