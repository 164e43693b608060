//! Dynamic value types for mutation requests
//!
//! Values are the untyped payload of a `MutationRequest`. They are narrowed
//! into a typed [`Mutation`](crate::Mutation) before anything is applied.

use serde::{Deserialize, Serialize};

/// A dynamic value as carried over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/None value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64 for wide compatibility)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// 3D vector / RGB color
    Vec3([f64; 3]),
    /// 4D vector / RGBA color
    Vec4([f64; 4]),
    /// Array of values
    Array(Vec<Value>),
}

impl Value {
    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    ///
    /// Floats only convert when they carry no fractional part.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as vec3
    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            Self::Array(arr) if arr.len() == 3 => {
                Some([arr[0].as_float()?, arr[1].as_float()?, arr[2].as_float()?])
            }
            _ => None,
        }
    }

    /// Try to get as vec4
    pub fn as_vec4(&self) -> Option<[f64; 4]> {
        match self {
            Self::Vec4(v) => Some(*v),
            Self::Array(arr) if arr.len() == 4 => Some([
                arr[0].as_float()?,
                arr[1].as_float()?,
                arr[2].as_float()?,
                arr[3].as_float()?,
            ]),
            _ => None,
        }
    }

    /// Short type name for log messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Array(_) => "array",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3([v[0] as f64, v[1] as f64, v[2] as f64])
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4([v[0] as f64, v[1] as f64, v[2] as f64, v[3] as f64])
    }
}

impl From<[f64; 4]> for Value {
    fn from(v: [f64; 4]) -> Self {
        Self::Vec4(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(42).as_int(), Some(42));
        assert_eq!(Value::from(0.5).as_float(), Some(0.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(2.5).as_int(), None);
    }

    #[test]
    fn test_json_numbers_pick_narrowest_variant() {
        let v: Value = serde_json::from_str("1").unwrap();
        assert_eq!(v, Value::Int(1));
        let v: Value = serde_json::from_str("0.25").unwrap();
        assert_eq!(v, Value::Float(0.25));
    }

    #[test]
    fn test_color_arrays() {
        let v: Value = serde_json::from_str("[0, 0, 0, 1]").unwrap();
        assert_eq!(v.as_vec4(), Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(v.as_vec3(), None);

        let mixed = Value::Array(vec![Value::Int(1), Value::Float(0.5), Value::Int(0)]);
        assert_eq!(mixed.as_vec3(), Some([1.0, 0.5, 0.0]));

        let rgb: Value = [1.0f32, 0.5, 0.25].into();
        assert_eq!(serde_json::to_string(&rgb).unwrap(), "[1.0,0.5,0.25]");
    }
}
