//! Parameter types and the token conversion adapter.
//!
//! A command's signature is fixed at registration as a list of [`Param`]s.
//! At dispatch time every token is converted according to that list, so
//! handlers receive typed [`Value`]s without any runtime reflection.

use std::fmt;

/// Declared type of one command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// `true/false`, `yes/no`, `on/off`, `1/0` (case-insensitive).
    Bool,
    /// Exactly one character.
    Char,
    /// Any token.
    Str,
}

impl ParamType {
    /// Short lowercase label used in help and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::Char => "char",
            ParamType::Str => "string",
        }
    }

    /// Convert a raw token, or `None` if it does not parse as this type.
    pub fn convert(&self, token: &str) -> Option<Value> {
        match self {
            ParamType::Int => token.parse().ok().map(Value::Int),
            ParamType::Float => token.parse().ok().map(Value::Float),
            ParamType::Bool => match token.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ParamType::Char => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            },
            ParamType::Str => Some(Value::Str(token.to_string())),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name shown in help (`<first_term>`); falls back to the type label.
    pub name: Option<String>,
    pub kind: ParamType,
}

impl Param {
    pub fn new(kind: ParamType) -> Self {
        Self { name: None, kind }
    }

    pub fn named(name: &str, kind: ParamType) -> Self {
        Self {
            name: Some(name.to_string()),
            kind,
        }
    }

    /// `<name>` for help listings.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) => format!("<{n}>"),
            None => format!("<{}>", self.kind),
        }
    }
}

/// A converted argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl Value {
    fn kind(&self) -> ParamType {
        match self {
            Value::Int(_) => ParamType::Int,
            Value::Float(_) => ParamType::Float,
            Value::Bool(_) => ParamType::Bool,
            Value::Char(_) => ParamType::Char,
            Value::Str(_) => ParamType::Str,
        }
    }
}

/// Error from the typed [`Args`] accessors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgError {
    #[error("missing argument {index}")]
    Missing { index: usize },

    #[error("argument {index} is {found}, not {expected}")]
    WrongType {
        index: usize,
        expected: ParamType,
        found: ParamType,
    },
}

/// Converted arguments passed to a handler, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    fn value(&self, index: usize) -> Result<&Value, ArgError> {
        self.values.get(index).ok_or(ArgError::Missing { index })
    }

    fn mismatch(index: usize, expected: ParamType, found: &Value) -> ArgError {
        ArgError::WrongType {
            index,
            expected,
            found: found.kind(),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, ArgError> {
        match self.value(index)? {
            Value::Int(v) => Ok(*v),
            other => Err(Self::mismatch(index, ParamType::Int, other)),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64, ArgError> {
        match self.value(index)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(Self::mismatch(index, ParamType::Float, other)),
        }
    }

    pub fn bool(&self, index: usize) -> Result<bool, ArgError> {
        match self.value(index)? {
            Value::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(index, ParamType::Bool, other)),
        }
    }

    pub fn char(&self, index: usize) -> Result<char, ArgError> {
        match self.value(index)? {
            Value::Char(v) => Ok(*v),
            other => Err(Self::mismatch(index, ParamType::Char, other)),
        }
    }

    pub fn str(&self, index: usize) -> Result<&str, ArgError> {
        match self.value(index)? {
            Value::Str(v) => Ok(v),
            other => Err(Self::mismatch(index, ParamType::Str, other)),
        }
    }
}

/// First token that failed conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConversionFailure {
    /// 1-based parameter position.
    pub position: usize,
    pub token: String,
    pub expected: ParamType,
}

/// Convert `tokens` against `params`. Callers guarantee equal lengths.
pub(crate) fn convert_all(params: &[Param], tokens: &[String]) -> Result<Args, ConversionFailure> {
    let mut values = Vec::with_capacity(params.len());
    for (i, (param, token)) in params.iter().zip(tokens).enumerate() {
        match param.kind.convert(token) {
            Some(v) => values.push(v),
            None => {
                return Err(ConversionFailure {
                    position: i + 1,
                    token: token.clone(),
                    expected: param.kind,
                });
            },
        }
    }
    Ok(Args::new(values))
}
