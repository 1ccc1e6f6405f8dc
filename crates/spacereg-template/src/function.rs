//! The fixed function set available inside template actions
//!
//! Indexing is by character, never by byte, and out-of-range bounds clamp
//! instead of failing.

use std::fmt;

/// Static type of a template value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Text
    Str,
    /// Signed integer
    Int,
}

impl ValueType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
        }
    }
}

/// A rendered value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Text
    Str(String),
    /// Signed integer
    Int(i64),
}

impl Value {
    fn into_str(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Int(i) => i.to_string(),
        }
    }

    fn as_int(&self) -> i64 {
        match self {
            Self::Int(i) => *i,
            Self::Str(_) => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Template helper functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `substr start end s`
    Substr,
    /// `lower s`
    Lower,
    /// `upper s`
    Upper,
    /// `trim s`
    Trim,
    /// `trimPrefix prefix s`
    TrimPrefix,
    /// `trimSuffix suffix s`
    TrimSuffix,
    /// `replace old new s`
    Replace,
    /// `default fallback s`; also covers a missing `s`
    Default,
    /// `first n s`
    First,
}

const ALL: [Function; 9] = [
    Function::Substr,
    Function::Lower,
    Function::Upper,
    Function::Trim,
    Function::TrimPrefix,
    Function::TrimSuffix,
    Function::Replace,
    Function::Default,
    Function::First,
];

impl Function {
    /// Every supported function
    pub fn all() -> &'static [Function] {
        &ALL
    }

    /// Look up a function by its template name
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Name used in templates
    pub fn name(self) -> &'static str {
        match self {
            Self::Substr => "substr",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Trim => "trim",
            Self::TrimPrefix => "trimPrefix",
            Self::TrimSuffix => "trimSuffix",
            Self::Replace => "replace",
            Self::Default => "default",
            Self::First => "first",
        }
    }

    /// Parameter types; the last one receives a piped value
    pub fn params(self) -> &'static [ValueType] {
        use ValueType::{Int, Str};
        match self {
            Self::Substr => &[Int, Int, Str],
            Self::Lower | Self::Upper | Self::Trim => &[Str],
            Self::TrimPrefix | Self::TrimSuffix | Self::Default => &[Str, Str],
            Self::Replace => &[Str, Str, Str],
            Self::First => &[Int, Str],
        }
    }

    /// Apply to already type-checked arguments
    pub(crate) fn apply(self, args: Vec<Value>) -> Value {
        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or(Value::Str(String::new()));
        let out = match self {
            Self::Substr => {
                let start = next().as_int();
                let end = next().as_int();
                substr(&next().into_str(), start, end)
            }
            Self::Lower => next().into_str().to_lowercase(),
            Self::Upper => next().into_str().to_uppercase(),
            Self::Trim => next().into_str().trim().to_string(),
            Self::TrimPrefix => {
                let prefix = next().into_str();
                let s = next().into_str();
                s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string()
            }
            Self::TrimSuffix => {
                let suffix = next().into_str();
                let s = next().into_str();
                s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string()
            }
            Self::Replace => {
                let old = next().into_str();
                let new = next().into_str();
                let s = next().into_str();
                if old.is_empty() {
                    s
                } else {
                    s.replace(&old, &new)
                }
            }
            Self::Default => {
                let fallback = next().into_str();
                let s = next().into_str();
                if s.is_empty() {
                    fallback
                } else {
                    s
                }
            }
            Self::First => {
                let n = next().as_int();
                let s = next().into_str();
                substr(&s, 0, n)
            }
        };
        Value::Str(out)
    }
}

/// Characters `[start, end)` of `s`. A negative `end` means "to the end";
/// bounds clamp to the string.
pub fn substr(s: &str, start: i64, end: i64) -> String {
    let len = s.chars().count();
    let start = usize::try_from(start.max(0)).unwrap_or(0).min(len);
    let end = if end < 0 {
        len
    } else {
        usize::try_from(end).unwrap_or(len).min(len)
    };
    if end <= start {
        return String::new();
    }
    s.chars().skip(start).take(end - start).collect()
}
