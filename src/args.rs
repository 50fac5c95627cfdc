use std::collections::BTreeMap;

use glam::Vec3;
use thiserror::Error;

use crate::color::Color;

/// One positional argument of a variadic drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f32),
    Str(String),
    Array(Vec<f32>),
    Color(Color),
    /// A vector-like value exposing named numeric fields.
    Object(BTreeMap<String, f32>),
    /// A host value with no drawing meaning, kept by type name for errors.
    Other(&'static str),
}

impl Arg {
    /// Wraps a vector as an object carrying `x`, `y`, `z` fields.
    pub fn vector(vector: Vec3) -> Self {
        Self::Object(BTreeMap::from([
            ("x".to_string(), vector.x),
            ("y".to_string(), vector.y),
            ("z".to_string(), vector.z),
        ]))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Color(_) => "color",
            Self::Object(_) => "object",
            Self::Other(name) => *name,
        }
    }

    fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Color> for Arg {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Vec3> for Arg {
    fn from(value: Vec3) -> Self {
        Self::vector(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("expected a position or direction after the color arguments")]
    MissingVector,
    #[error("expected three trailing numbers for x, y, z but found {found}")]
    NotEnoughComponents { found: usize },
    #[error("vector-like argument has no numeric `{0}` field")]
    MissingField(&'static str),
    #[error("expected x, y, z numbers or a vector, got {0}")]
    NotAVector(&'static str),
}

/// Splits a light call into its color arguments and its trailing vector.
///
/// Only the last argument decides the shape: a number means the last three
/// arguments are `x, y, z`; anything else must be a vector-like value with
/// `x`, `y` and `z` fields. Everything before the tail is color input.
pub fn split_light_args(args: &[Arg]) -> Result<(&[Arg], Vec3), ArgumentError> {
    let Some(last) = args.last() else {
        return Err(ArgumentError::MissingVector);
    };
    match last {
        Arg::Number(_) => {
            let found = args
                .iter()
                .rev()
                .take(3)
                .take_while(|arg| arg.as_number().is_some())
                .count();
            if found < 3 {
                return Err(ArgumentError::NotEnoughComponents { found });
            }
            let split = args.len() - 3;
            let tail: Vec<f32> = args[split..].iter().filter_map(Arg::as_number).collect();
            Ok((&args[..split], Vec3::new(tail[0], tail[1], tail[2])))
        }
        Arg::Object(fields) => {
            let vector = vector_from_fields(fields)?;
            Ok((&args[..args.len() - 1], vector))
        }
        other => Err(ArgumentError::NotAVector(other.type_name())),
    }
}

/// Returns only the trailing vector of a light call.
pub fn extract_vector(args: &[Arg]) -> Result<Vec3, ArgumentError> {
    split_light_args(args).map(|(_, vector)| vector)
}

fn vector_from_fields(fields: &BTreeMap<String, f32>) -> Result<Vec3, ArgumentError> {
    let field = |name: &'static str| {
        fields
            .get(name)
            .copied()
            .ok_or(ArgumentError::MissingField(name))
    };
    Ok(Vec3::new(field("x")?, field("y")?, field("z")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f32]) -> Vec<Arg> {
        values.iter().copied().map(Arg::Number).collect()
    }

    #[test]
    fn numeric_tail_takes_last_three() {
        let args = numbers(&[250.0, 250.0, 250.0, 0.5, -0.5, 0.25]);
        let (color, vector) = split_light_args(&args).unwrap();
        assert_eq!(color, &args[..3]);
        assert_eq!(vector, Vec3::new(0.5, -0.5, 0.25));
    }

    #[test]
    fn numeric_tail_ignores_color_arity() {
        let args = numbers(&[150.0, 1.0, 2.0, 3.0]);
        let (color, vector) = split_light_args(&args).unwrap();
        assert_eq!(color, &[Arg::Number(150.0)]);
        assert_eq!(vector, Vec3::new(1.0, 2.0, 3.0));

        let args = vec![Arg::from("red"), Arg::Number(1.0), Arg::Number(2.0), Arg::Number(3.0)];
        let (color, vector) = split_light_args(&args).unwrap();
        assert_eq!(color, &[Arg::from("red")]);
        assert_eq!(vector, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vector_tail_matches_numeric_tail() {
        let numeric = numbers(&[250.0, 250.0, 250.0, 1.0, 2.0, 3.0]);
        let mut object = numbers(&[250.0, 250.0, 250.0]);
        object.push(Arg::vector(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            extract_vector(&numeric).unwrap(),
            extract_vector(&object).unwrap()
        );
        let (color, _) = split_light_args(&object).unwrap();
        assert_eq!(color.len(), 3);
    }

    #[test]
    fn vector_fields_ignore_extras() {
        let mut fields = BTreeMap::new();
        fields.insert("x".to_string(), 4.0);
        fields.insert("y".to_string(), 5.0);
        fields.insert("z".to_string(), 6.0);
        fields.insert("w".to_string(), 7.0);
        let args = vec![Arg::from("white"), Arg::Object(fields)];
        assert_eq!(extract_vector(&args).unwrap(), Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn missing_field_is_fatal() {
        let fields = BTreeMap::from([("x".to_string(), 1.0), ("y".to_string(), 2.0)]);
        let args = vec![Arg::Number(255.0), Arg::Object(fields)];
        assert_eq!(
            extract_vector(&args).unwrap_err(),
            ArgumentError::MissingField("z")
        );
    }

    #[test]
    fn non_vector_tail_is_fatal() {
        let mut args = numbers(&[250.0, 250.0, 250.0]);
        args.push(Arg::from("not-a-vector"));
        assert_eq!(
            extract_vector(&args).unwrap_err(),
            ArgumentError::NotAVector("string")
        );
        assert_eq!(
            extract_vector(&[Arg::Other("boolean")]).unwrap_err(),
            ArgumentError::NotAVector("boolean")
        );
    }

    #[test]
    fn short_numeric_tail_is_fatal() {
        let args = vec![Arg::from("red"), Arg::Number(1.0), Arg::Number(2.0)];
        assert_eq!(
            extract_vector(&args).unwrap_err(),
            ArgumentError::NotEnoughComponents { found: 2 }
        );
        assert_eq!(
            extract_vector(&[]).unwrap_err(),
            ArgumentError::MissingVector
        );
    }
}
