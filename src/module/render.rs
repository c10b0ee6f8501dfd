// ABOUTME: Serializer from module parameters to a Puppet class declaration.
// ABOUTME: Produces `class {'name': key => value, ...}` with Puppet quoting rules.

use std::fmt;

/// A single Puppet parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleValue {
    Bool(bool),
    Str(String),
    Null,
}

impl ModuleValue {
    /// Whether the value counts as set: not null, not false, not an empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            ModuleValue::Bool(b) => *b,
            ModuleValue::Str(s) => !s.is_empty(),
            ModuleValue::Null => false,
        }
    }
}

impl From<bool> for ModuleValue {
    fn from(b: bool) -> Self {
        ModuleValue::Bool(b)
    }
}

impl From<&str> for ModuleValue {
    fn from(s: &str) -> Self {
        ModuleValue::Str(s.to_string())
    }
}

impl From<String> for ModuleValue {
    fn from(s: String) -> Self {
        ModuleValue::Str(s)
    }
}

impl<T: Into<ModuleValue>> From<Option<T>> for ModuleValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ModuleValue::Null)
    }
}

impl fmt::Display for ModuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleValue::Bool(true) => f.write_str("true"),
            ModuleValue::Bool(false) => f.write_str("false"),
            ModuleValue::Null => f.write_str("undef"),
            ModuleValue::Str(s) => {
                // Single-quoted Puppet strings only interpret \\ and \'.
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
        }
    }
}

/// Ordered module parameters. Later `set` calls replace earlier ones in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleParams(Vec<(String, ModuleValue)>);

impl ModuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ModuleValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&ModuleValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Only the entries that are set; false, null and empty strings are dropped.
    pub fn truthy(&self) -> ModuleParams {
        ModuleParams(
            self.0
                .iter()
                .filter(|(_, v)| v.is_truthy())
                .cloned()
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Render a Puppet resource-like class declaration.
pub fn render_class(module_name: &str, params: &ModuleParams) -> String {
    let body = params
        .iter()
        .map(|(k, v)| format!("{k} => {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("class {{{}: {}}}", ModuleValue::from(module_name), body)
}
