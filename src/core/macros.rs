//! Preprocessor macro tables.
//!
//! A [`MacroSet`] is the ordered definition table handed to both the native
//! compiler and the binding generator. Order matters because it mirrors the
//! compiler command line, and names are unique.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single preprocessor definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    /// Macro name
    pub name: String,

    /// Macro value; `None` for boolean-style defines (`-DFOO`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Define {
    /// Create a define without a value.
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    /// Create a `NAME=VALUE` define.
    pub fn key_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Parse a `KEY=VALUE` or bare `KEY` token.
    ///
    /// Only the first `=` separates name from value, so `A=B=C` yields
    /// `("A", "B=C")`. Both halves are trimmed.
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((name, value)) => Define::key_value(name.trim(), value.trim()),
            None => Define::flag(token.trim()),
        }
    }

    /// Render as a compiler/generator command-line flag.
    pub fn to_flag(&self) -> String {
        format!("-D{}", self)
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered table of unique preprocessor definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroSet {
    defines: Vec<Define>,
}

impl MacroSet {
    /// Create an empty macro set.
    pub fn new() -> Self {
        MacroSet::default()
    }

    /// Define a macro. A later definition of an existing name replaces the
    /// earlier value but keeps its position.
    pub fn define(&mut self, define: Define) -> &mut Self {
        match self.defines.iter_mut().find(|d| d.name == define.name) {
            Some(existing) => existing.value = define.value,
            None => self.defines.push(define),
        }
        self
    }

    /// Define a macro only if its name is not already present.
    ///
    /// Returns `true` if the define was inserted.
    pub fn define_if_absent(&mut self, define: Define) -> bool {
        if self.contains(&define.name) {
            return false;
        }
        self.defines.push(define);
        true
    }

    /// Append every define from `other` whose name is not already present.
    pub fn append_missing(&mut self, other: &MacroSet) -> &mut Self {
        for define in other.iter() {
            self.define_if_absent(define.clone());
        }
        self
    }

    /// Check whether a macro with this name is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.defines.iter().any(|d| d.name == name)
    }

    /// Look up a define by name.
    pub fn get(&self, name: &str) -> Option<&Define> {
        self.defines.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Define> {
        self.defines.iter()
    }

    pub fn len(&self) -> usize {
        self.defines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Render every define as a `-D` flag, in order.
    pub fn to_flags(&self) -> Vec<String> {
        self.defines.iter().map(Define::to_flag).collect()
    }

    /// `(name, value)` pairs, in order.
    pub fn pairs(&self) -> Vec<(&str, Option<&str>)> {
        self.defines
            .iter()
            .map(|d| (d.name.as_str(), d.value.as_deref()))
            .collect()
    }
}

impl FromIterator<Define> for MacroSet {
    fn from_iter<I: IntoIterator<Item = Define>>(iter: I) -> Self {
        let mut set = MacroSet::new();
        for define in iter {
            set.define(define);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MacroSet {
    type Item = &'a Define;
    type IntoIter = std::slice::Iter<'a, Define>;

    fn into_iter(self) -> Self::IntoIter {
        self.defines.iter()
    }
}
