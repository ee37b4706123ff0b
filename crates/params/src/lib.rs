//! Parameter store: named, typed values that drive live scene mutations.
//!
//! Each parameter is defined once with a kind and an initial value, and may
//! carry one callback. Setting a value clamps it to the declared range, runs
//! the callback synchronously with the clamped value, then stores it.
//!
//! The store is generic over the context its callbacks mutate, so a callback
//! is handed `&mut C` at call time instead of capturing shared scene state.
//!
//! # Invariants
//! - A name is defined at most once.
//! - Stored values always match the parameter's kind and lie inside its range.
//! - `set` invokes the bound callback exactly once, before returning.
//! - An unbound parameter still stores its value.

use diorama_common::Color;
use serde::Serialize;
use std::collections::BTreeMap;

mod value;

pub use value::{ParamKind, ParamValue};

/// Errors from parameter operations. Both `Duplicate` and `Unknown` indicate
/// wiring bugs; callers usually propagate them to `main`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("parameter already defined: {0}")]
    Duplicate(String),
    #[error("unknown parameter: {0}")]
    Unknown(String),
    #[error("parameter {name} holds a {expected} value, got {found}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid range for {name}: {min}..={max}")]
    InvalidRange { name: String, min: f32, max: f32 },
}

type Callback<C> = Box<dyn FnMut(&mut C, ParamValue)>;

struct Param<C> {
    kind: ParamKind,
    value: ParamValue,
    callback: Option<Callback<C>>,
}

/// Snapshot of one parameter, for building a control panel or listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub value: ParamValue,
    pub bound: bool,
}

/// Named parameters plus their callbacks, keyed by name.
pub struct ParameterStore<C> {
    params: BTreeMap<String, Param<C>>,
    /// Definition order, so panels list controls the way they were declared.
    order: Vec<String>,
}

impl<C> Default for ParameterStore<C> {
    fn default() -> Self {
        Self {
            params: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for ParameterStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors()).finish()
    }
}

impl<C> ParameterStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Register a parameter. The initial value is clamped like any other write.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        kind: ParamKind,
        initial: impl Into<ParamValue>,
    ) -> Result<(), ParamError> {
        let name = name.into();
        if self.params.contains_key(&name) {
            return Err(ParamError::Duplicate(name));
        }
        if let ParamKind::Number { min, max, .. } = kind {
            if !(min.is_finite() && max.is_finite()) || min > max {
                return Err(ParamError::InvalidRange { name, min, max });
            }
        }
        let value = kind.admit(&name, initial.into())?;
        tracing::debug!(name = %name, %value, "defined parameter");
        self.order.push(name.clone());
        self.params.insert(
            name,
            Param {
                kind,
                value,
                callback: None,
            },
        );
        Ok(())
    }

    /// Attach the callback for `name`. A second bind replaces the first; the
    /// replaced callback is dropped and never runs again.
    pub fn bind(
        &mut self,
        name: &str,
        callback: impl FnMut(&mut C, ParamValue) + 'static,
    ) -> Result<(), ParamError> {
        let param = self.param_mut(name)?;
        if param.callback.replace(Box::new(callback)).is_some() {
            tracing::debug!(name, "replaced parameter callback");
        }
        Ok(())
    }

    /// [`ParameterStore::bind`] for a numeric parameter.
    pub fn bind_number(
        &mut self,
        name: &str,
        mut callback: impl FnMut(&mut C, f32) + 'static,
    ) -> Result<(), ParamError> {
        self.expect_kind(name, "number")?;
        self.bind(name, move |ctx, v| {
            if let ParamValue::Number(n) = v {
                callback(ctx, n);
            }
        })
    }

    /// [`ParameterStore::bind`] for a toggle.
    pub fn bind_toggle(
        &mut self,
        name: &str,
        mut callback: impl FnMut(&mut C, bool) + 'static,
    ) -> Result<(), ParamError> {
        self.expect_kind(name, "toggle")?;
        self.bind(name, move |ctx, v| {
            if let ParamValue::Toggle(b) = v {
                callback(ctx, b);
            }
        })
    }

    /// [`ParameterStore::bind`] for a colour.
    pub fn bind_color(
        &mut self,
        name: &str,
        mut callback: impl FnMut(&mut C, Color) + 'static,
    ) -> Result<(), ParamError> {
        self.expect_kind(name, "color")?;
        self.bind(name, move |ctx, v| {
            if let ParamValue::Color(c) = v {
                callback(ctx, c);
            }
        })
    }

    pub fn is_bound(&self, name: &str) -> Result<bool, ParamError> {
        Ok(self.param(name)?.callback.is_some())
    }

    /// Clamp, run the callback with the clamped value, then store it.
    /// Returns the value that was stored.
    pub fn set(
        &mut self,
        ctx: &mut C,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<ParamValue, ParamError> {
        let param = self.param_mut(name)?;
        let value = param.kind.admit(name, value.into())?;
        if let Some(callback) = param.callback.as_mut() {
            callback(ctx, value);
        }
        param.value = value;
        tracing::debug!(name, %value, "parameter set");
        Ok(value)
    }

    pub fn get(&self, name: &str) -> Result<ParamValue, ParamError> {
        Ok(self.param(name)?.value)
    }

    pub fn kind(&self, name: &str) -> Result<ParamKind, ParamError> {
        Ok(self.param(name)?.kind)
    }

    pub fn number(&self, name: &str) -> Result<f32, ParamError> {
        match self.get(name)? {
            ParamValue::Number(n) => Ok(n),
            other => Err(mismatch(name, "number", other)),
        }
    }

    pub fn toggle(&self, name: &str) -> Result<bool, ParamError> {
        match self.get(name)? {
            ParamValue::Toggle(b) => Ok(b),
            other => Err(mismatch(name, "toggle", other)),
        }
    }

    pub fn color(&self, name: &str) -> Result<Color, ParamError> {
        match self.get(name)? {
            ParamValue::Color(c) => Ok(c),
            other => Err(mismatch(name, "color", other)),
        }
    }

    /// Every parameter in definition order.
    pub fn descriptors(&self) -> Vec<ParamDescriptor> {
        self.order
            .iter()
            .filter_map(|name| {
                self.params.get(name).map(|p| ParamDescriptor {
                    name: name.clone(),
                    kind: p.kind,
                    value: p.value,
                    bound: p.callback.is_some(),
                })
            })
            .collect()
    }

    fn param(&self, name: &str) -> Result<&Param<C>, ParamError> {
        self.params
            .get(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    fn param_mut(&mut self, name: &str) -> Result<&mut Param<C>, ParamError> {
        self.params
            .get_mut(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    fn expect_kind(&self, name: &str, expected: &'static str) -> Result<(), ParamError> {
        let kind = self.param(name)?.kind;
        if kind.label() == expected {
            Ok(())
        } else {
            Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: kind.label(),
                found: expected,
            })
        }
    }
}

fn mismatch(name: &str, wanted: &'static str, stored: ParamValue) -> ParamError {
    ParamError::KindMismatch {
        name: name.to_string(),
        expected: stored.label(),
        found: wanted,
    }
}

pub fn crate_info() -> &'static str {
    "diorama-params v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal callback context: records every call.
    #[derive(Default)]
    struct Log {
        calls: Vec<(String, ParamValue)>,
    }

    fn size_store<C>() -> ParameterStore<C> {
        let mut s = ParameterStore::new();
        s.define("size", ParamKind::number(0.0, 3.5), 2.0).unwrap();
        s
    }

    #[test]
    fn set_clamps_and_calls_once() {
        let mut s = size_store();
        s.bind_number("size", |log: &mut Log, v| {
            log.calls.push(("size".into(), ParamValue::Number(v)))
        })
        .unwrap();

        let mut log = Log::default();
        let stored = s.set(&mut log, "size", 9.0).unwrap();
        assert_eq!(stored, ParamValue::Number(3.5));
        assert_eq!(s.number("size").unwrap(), 3.5);
        assert_eq!(log.calls, vec![("size".into(), ParamValue::Number(3.5))]);

        s.set(&mut log, "size", -1.0).unwrap();
        assert_eq!(s.number("size").unwrap(), 0.0);
        assert_eq!(log.calls.len(), 2);
    }

    #[test]
    fn raw_bind_sees_clamped_value() {
        let mut s = size_store();
        s.bind("size", |seen: &mut Vec<f32>, v| {
            if let ParamValue::Number(n) = v {
                seen.push(n);
            }
        })
        .unwrap();
        let mut seen = Vec::new();
        s.set(&mut seen, "size", 1.0).unwrap();
        s.set(&mut seen, "size", 4.0).unwrap();
        assert_eq!(seen, vec![1.0, 3.5]);
        assert_eq!(s.number("size").unwrap(), 3.5);
    }

    #[test]
    fn unbound_parameter_is_inert() {
        let mut s: ParameterStore<()> = ParameterStore::new();
        s.define("speed", ParamKind::number(0.0, 0.1), 0.01).unwrap();
        assert!(!s.is_bound("speed").unwrap());
        s.set(&mut (), "speed", 0.05).unwrap();
        assert_eq!(s.number("speed").unwrap(), 0.05);
    }

    #[test]
    fn rebinding_replaces_callback() {
        let mut s = size_store();
        s.bind_number("size", |log: &mut Log, v| log.calls.push(("old".into(), v.into())))
            .unwrap();
        s.bind_number("size", |log: &mut Log, v| log.calls.push(("new".into(), v.into())))
            .unwrap();
        let mut log = Log::default();
        s.set(&mut log, "size", 1.0).unwrap();
        s.set(&mut log, "size", 2.0).unwrap();
        assert!(log.calls.iter().all(|(who, _)| who == "new"));
        assert_eq!(log.calls.len(), 2);
    }

    #[test]
    fn duplicate_define_fails() {
        let mut s = size_store::<()>();
        let err = s.define("size", ParamKind::Toggle, false).unwrap_err();
        assert_eq!(err, ParamError::Duplicate("size".into()));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn unknown_names_fail() {
        let mut s = size_store();
        assert!(matches!(s.get("nope"), Err(ParamError::Unknown(_))));
        assert!(matches!(
            s.set(&mut Log::default(), "nope", 1.0),
            Err(ParamError::Unknown(_))
        ));
        assert!(matches!(s.bind("nope", |_, _| {}), Err(ParamError::Unknown(_))));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut s = size_store();
        let err = s.set(&mut Log::default(), "size", true).unwrap_err();
        assert!(matches!(err, ParamError::KindMismatch { .. }));
        assert!(s.toggle("size").is_err());
        assert!(s.bind_color("size", |_, _| {}).is_err());
        assert_eq!(s.number("size").unwrap(), 2.0);
    }

    #[test]
    fn invalid_range_rejected() {
        let mut s: ParameterStore<()> = ParameterStore::new();
        assert!(matches!(
            s.define("bad", ParamKind::number(5.0, 1.0), 2.0),
            Err(ParamError::InvalidRange { .. })
        ));
        assert!(s.define("inf", ParamKind::number(0.0, f32::INFINITY), 2.0).is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn initial_value_is_clamped() {
        let mut s: ParameterStore<()> = ParameterStore::new();
        s.define("fov", ParamKind::number(1.0, 180.0).with_step(5.0), 500.0)
            .unwrap();
        assert_eq!(s.number("fov").unwrap(), 180.0);
    }

    #[test]
    fn nan_clamps_to_min() {
        let mut s = size_store();
        s.set(&mut Log::default(), "size", f32::NAN).unwrap();
        assert_eq!(s.number("size").unwrap(), 0.0);
    }

    #[test]
    fn step_does_not_quantize() {
        let mut s: ParameterStore<()> = ParameterStore::new();
        s.define("fov", ParamKind::number(1.0, 180.0).with_step(5.0), 125.0)
            .unwrap();
        s.set(&mut (), "fov", 33.3).unwrap();
        assert_eq!(s.number("fov").unwrap(), 33.3);
    }

    #[test]
    fn descriptors_keep_definition_order() {
        let mut s: ParameterStore<()> = ParameterStore::new();
        s.define("zeta", ParamKind::Toggle, false).unwrap();
        s.define("alpha", ParamKind::Color, Color::from_hex(0xff00ff)).unwrap();
        s.bind_toggle("zeta", |_, _| {}).unwrap();
        let d = s.descriptors();
        assert_eq!(d[0].name, "zeta");
        assert!(d[0].bound);
        assert_eq!(d[1].name, "alpha");
        assert_eq!(d[1].value, ParamValue::Color(Color::from_hex(0xff00ff)));
        assert!(!d[1].bound);
    }

    #[test]
    fn toggle_and_color_roundtrip() {
        let mut s: ParameterStore<Vec<String>> = ParameterStore::new();
        s.define("wireframe", ParamKind::Toggle, false).unwrap();
        s.define("tint", ParamKind::Color, Color::WHITE).unwrap();
        s.bind_toggle("wireframe", |out, b| out.push(format!("wire={b}")))
            .unwrap();
        s.bind_color("tint", |out, c| out.push(format!("tint={c}")))
            .unwrap();
        let mut out = Vec::new();
        s.set(&mut out, "wireframe", true).unwrap();
        s.set(&mut out, "tint", Color::from_hex(0x00ff00)).unwrap();
        assert_eq!(out, vec!["wire=true", "tint=#00ff00"]);
        assert!(s.toggle("wireframe").unwrap());
        assert_eq!(s.color("tint").unwrap().to_hex(), 0x00ff00);
    }
}
