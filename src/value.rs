//! Values held by variables and local declarations.
//!
//! The variable store keeps typed scalars. Values are converted from the JSON
//! found in trigger definitions and from the literal text of `set` statements.

/// A variable value snapshot.
///
/// # Examples
///
/// ```
/// use varactions::Value;
///
/// assert_eq!(Value::parse_literal("42"), Value::Int(42));
/// assert_eq!(Value::parse_literal("\"on\""), Value::String("on".to_string()));
/// assert_eq!(Value::parse_literal("true"), Value::Bool(true));
/// ```
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

impl Value {
    /// Parses the right-hand side of an assignment.
    ///
    /// Double-quoted text is a string, `true`/`false` a bool, numbers become
    /// ints or floats. Anything else is kept verbatim as a string.
    #[must_use]
    pub fn parse_literal(text: &str) -> Self {
        let text = text.trim();
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Self::String(text[1..text.len() - 1].to_string());
        }
        match text {
            "" | "null" => return Self::Null,
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(v) = text.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = text.parse::<f64>() {
            return Self::Float(v);
        }
        Self::String(text.to_string())
    }

    /// Renders the value for shell interpolation (strings unquoted).
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::String(v) => v.clone(),
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| format!("number {n} is out of range")),
            serde_json::Value::String(s) => Ok(Self::String(s)),
            other => Err(format!("expected a scalar, got {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse_literal(" 1 "), Value::Int(1));
        assert_eq!(Value::parse_literal("-3"), Value::Int(-3));
        assert_eq!(Value::parse_literal("2.5"), Value::Float(2.5));
        assert_eq!(Value::parse_literal("false"), Value::Bool(false));
        assert_eq!(Value::parse_literal("\"a b\""), Value::String("a b".into()));
        assert_eq!(Value::parse_literal("idle"), Value::String("idle".into()));
        assert_eq!(Value::parse_literal(""), Value::Null);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Int(42)), "42");
        assert_eq!(format!("{}", Value::String("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_plain_string_drops_quotes() {
        assert_eq!(Value::String("hi".into()).to_plain_string(), "hi");
        assert_eq!(Value::Int(7).to_plain_string(), "7");
        assert_eq!(Value::Null.to_plain_string(), "");
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::try_from(serde_json::json!(3)).unwrap(), Value::Int(3));
        assert_eq!(Value::try_from(serde_json::json!(0.5)).unwrap(), Value::Float(0.5));
        assert_eq!(Value::try_from(serde_json::json!("x")).unwrap(), Value::String("x".into()));
        assert_eq!(Value::try_from(serde_json::Value::Null).unwrap(), Value::Null);
        assert!(Value::try_from(serde_json::json!([1, 2])).is_err());
        assert!(Value::try_from(serde_json::json!({"a": 1})).is_err());
    }
}
