use crate::ParamError;
use diorama_common::Color;
use serde::Serialize;
use std::fmt;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    /// Closed range `min..=max`. `step` is a slider hint for panels; stored
    /// values are never snapped to it.
    Number {
        min: f32,
        max: f32,
        step: Option<f32>,
    },
    Toggle,
    Color,
}

impl ParamKind {
    pub fn number(min: f32, max: f32) -> Self {
        Self::Number {
            min,
            max,
            step: None,
        }
    }

    /// Set the slider step of a numeric kind. Other kinds are returned as-is.
    pub fn with_step(self, step: f32) -> Self {
        match self {
            Self::Number { min, max, .. } => Self::Number {
                min,
                max,
                step: Some(step),
            },
            other => other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Number { .. } => "number",
            Self::Toggle => "toggle",
            Self::Color => "color",
        }
    }

    /// Check `value` against this kind and clamp numbers into range.
    /// `NaN` lands on `min`.
    pub(crate) fn admit(&self, name: &str, value: ParamValue) -> Result<ParamValue, ParamError> {
        match (self, value) {
            (Self::Number { min, max, .. }, ParamValue::Number(n)) => {
                let n = if n.is_nan() { *min } else { n.clamp(*min, *max) };
                Ok(ParamValue::Number(n))
            }
            (Self::Toggle, ParamValue::Toggle(_)) | (Self::Color, ParamValue::Color(_)) => Ok(value),
            _ => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: self.label(),
                found: value.label(),
            }),
        }
    }
}

/// A parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f32),
    Toggle(bool),
    Color(Color),
}

impl ParamValue {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Toggle(_) => "toggle",
            Self::Color(_) => "color",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Toggle(b) => write!(f, "{b}"),
            Self::Color(c) => write!(f, "{c}"),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Number(v)
    }
}

/// Narrowed to `f32`. Lets bare float literals and YAML numbers convert.
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v as f32)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Toggle(v)
    }
}

impl From<Color> for ParamValue {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_clamps_infinities() {
        let k = ParamKind::number(-20.0, 20.0);
        assert_eq!(
            k.admit("x", f32::INFINITY.into()).unwrap(),
            ParamValue::Number(20.0)
        );
        assert_eq!(
            k.admit("x", f32::NEG_INFINITY.into()).unwrap(),
            ParamValue::Number(-20.0)
        );
    }

    #[test]
    fn with_step_ignores_non_numbers() {
        assert_eq!(ParamKind::Toggle.with_step(5.0), ParamKind::Toggle);
        assert_eq!(
            ParamKind::number(1.0, 180.0).with_step(5.0),
            ParamKind::Number {
                min: 1.0,
                max: 180.0,
                step: Some(5.0)
            }
        );
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(ParamValue::Number(0.5).to_string(), "0.5");
        assert_eq!(ParamValue::Toggle(true).to_string(), "true");
        assert_eq!(ParamValue::Color(Color::from_hex(0xff00dd)).to_string(), "#ff00dd");
    }
}
