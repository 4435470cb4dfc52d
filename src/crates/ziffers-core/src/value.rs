use serde::{Deserialize, Serialize};
use std::fmt;

/// What a collector reports for one event.
///
/// A pitch gives a scalar, a chord one value per member and a rest (or a
/// pitch lacking the attribute) gives `Silence`. Serializes as plain JSON:
/// numbers, strings, arrays and `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    /// Sample name
    Name(String),
    Chord(Vec<Value>),
    Silence,
}

impl Value {
    pub fn is_silence(&self) -> bool {
        matches!(self, Value::Silence)
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Numeric value truncated to an integer
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().map(|n| n as i64)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Chord(members) => Some(members),
            _ => None,
        }
    }

    /// Scalars of this value: itself, or the members of a chord
    pub fn members(&self) -> Vec<&Value> {
        match self {
            Value::Chord(members) => members.iter().flat_map(Value::members).collect(),
            Value::Silence => Vec::new(),
            scalar => vec![scalar],
        }
    }
}

/// Rests print as `r`, chords as their members in brackets
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Name(name) => f.write_str(name),
            Value::Chord(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", members.join(", "))
            }
            Value::Silence => f.write_str("r"),
        }
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

number_from!(f64, i64, i32, u16);

impl From<String> for Value {
    fn from(name: String) -> Self {
        Value::Name(name)
    }
}

impl From<&str> for Value {
    fn from(name: &str) -> Self {
        Value::Name(name.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Silence, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(members: Vec<T>) -> Self {
        Value::Chord(members.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(62).as_i64(), Some(62));
        assert_eq!(Value::from(8192u16).as_number(), Some(8192.0));
        assert_eq!(Value::from("bd").as_string(), Some("bd"));
        assert!(Value::from(None::<i64>).is_silence());
        assert_eq!(Value::from(Some(3)), Value::Number(3.0));
        assert_eq!(Value::from(vec![60, 64]).as_list().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![60, 64, 67]).to_string(), "[60, 64, 67]");
        assert_eq!(Value::from(0.25).to_string(), "0.25");
        assert_eq!(Value::Silence.to_string(), "r");
    }

    #[test]
    fn test_members() {
        let chord = Value::from(vec![60, 64]);
        assert_eq!(chord.members(), vec![&Value::Number(60.0), &Value::Number(64.0)]);
        assert!(Value::Silence.members().is_empty());
    }

    #[test]
    fn test_plain_json() {
        let values = vec![Value::from(60), Value::from(vec![60, 64]), Value::Silence, Value::from("bd")];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[60.0,[60.0,64.0],null,"bd"]"#);
    }
}
