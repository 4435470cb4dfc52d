use crate::context::EvalContext;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use ziffers_core::scale::{canonical_scale_name, named_scale};
use ziffers_core::{note_name_to_midi, Scale};

/// Root of the scale, as a MIDI number or a note name such as `"D4"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySetting {
    Midi(i64),
    Name(String),
}

impl KeySetting {
    pub fn midi(&self) -> i64 {
        match self {
            KeySetting::Midi(note) => *note,
            KeySetting::Name(name) => note_name_to_midi(name).unwrap_or_else(|| {
                tracing::warn!(key = %name, "unknown key name, using C4");
                60
            }),
        }
    }
}

impl From<i64> for KeySetting {
    fn from(note: i64) -> Self {
        KeySetting::Midi(note)
    }
}

impl From<&str> for KeySetting {
    fn from(name: &str) -> Self {
        KeySetting::Name(name.to_string())
    }
}

/// A scale name, tuning text, 12-bit pitch class mask or interval list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleSetting {
    Number(u32),
    Intervals(Vec<f64>),
    Name(String),
}

impl ScaleSetting {
    pub fn resolve(&self) -> Scale {
        match self {
            ScaleSetting::Number(number) => Scale::from_number(*number),
            ScaleSetting::Intervals(intervals) => Scale::from_intervals(intervals.clone()),
            ScaleSetting::Name(text) => Scale::parse(text),
        }
    }

    fn canonical(&self) -> serde_json::Value {
        match self {
            ScaleSetting::Name(name) if named_scale(name).is_some() => json!(canonical_scale_name(name)),
            ScaleSetting::Name(text) => json!(text.trim()),
            ScaleSetting::Number(number) => json!(number),
            ScaleSetting::Intervals(intervals) => json!(intervals),
        }
    }
}

impl From<&str> for ScaleSetting {
    fn from(name: &str) -> Self {
        ScaleSetting::Name(name.to_string())
    }
}

impl From<Vec<f64>> for ScaleSetting {
    fn from(intervals: Vec<f64>) -> Self {
        ScaleSetting::Intervals(intervals)
    }
}

impl From<u32> for ScaleSetting {
    fn from(number: u32) -> Self {
        ScaleSetting::Number(number)
    }
}

/// Options a pattern is built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub key: KeySetting,
    pub scale: ScaleSetting,
    pub octave: i64,
    /// Duration of events without an explicit one
    pub duration: f64,
    /// Seed for `?` and random ranges; unseeded patterns differ every run
    pub seed: Option<String>,
    /// Laps between re-evaluations, 0 to never re-evaluate
    pub redo: usize,
    /// Count numeric degrees from 1
    pub degrees: bool,
    pub inversion: i32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            key: KeySetting::Midi(60),
            scale: ScaleSetting::Name("MAJOR".to_string()),
            octave: 0,
            duration: 0.25,
            seed: None,
            redo: 1,
            degrees: false,
            inversion: 0,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<KeySetting>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_scale(mut self, scale: impl Into<ScaleSetting>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn with_octave(mut self, octave: i64) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_redo(mut self, redo: usize) -> Self {
        self.redo = redo;
        self
    }

    pub fn with_degrees(mut self, degrees: bool) -> Self {
        self.degrees = degrees;
        self
    }

    pub fn with_inversion(mut self, inversion: i32) -> Self {
        self.inversion = inversion;
        self
    }

    pub fn resolve_key(&self) -> i64 {
        self.key.midi()
    }

    pub fn resolve_scale(&self) -> Arc<Scale> {
        Arc::new(self.scale.resolve())
    }

    /// Top level evaluation context for these options
    pub fn context<'t>(&self) -> EvalContext<'t> {
        self.context_in(self.resolve_key(), self.resolve_scale())
    }

    /// Top level context with an already resolved key and scale
    pub fn context_in<'t>(&self, key: i64, scale: Arc<Scale>) -> EvalContext<'t> {
        EvalContext {
            octave: self.octave,
            duration: self.duration,
            degrees: self.degrees,
            inversion: self.inversion,
            ..EvalContext::new(key, scale)
        }
    }

    /// Stable identity of `text` built with these options.
    ///
    /// Keys are serialized in sorted order, key names become MIDI numbers and
    /// known scale names are upper-cased, so equivalent spellings agree.
    pub fn cache_key(&self, text: &str) -> String {
        let normalized = json!({
            "key": self.resolve_key(),
            "scale": self.scale.canonical(),
            "octave": self.octave,
            "duration": self.duration,
            "seed": self.seed,
            "redo": self.redo,
            "degrees": self.degrees,
            "inversion": self.inversion,
        });
        json!([text, normalized]).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.resolve_key(), 60);
        assert_eq!(options.resolve_scale().len(), 7);
        assert_eq!(options.duration, 0.25);
        assert_eq!(options.redo, 1);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: Options = serde_json::from_str(r#"{"key": "D4", "scale": "minor"}"#).unwrap();
        assert_eq!(options.resolve_key(), 62);
        assert_eq!(options.scale, ScaleSetting::Name("minor".to_string()));
        assert_eq!(options.octave, 0);

        let numeric: Options = serde_json::from_str(r#"{"key": 64, "scale": 2741}"#).unwrap();
        assert_eq!(numeric.key, KeySetting::Midi(64));
        assert_eq!(numeric.scale, ScaleSetting::Number(2741));

        let intervals: Options = serde_json::from_str(r#"{"scale": [2, 1, 2, 2, 1, 2, 2]}"#).unwrap();
        assert_eq!(intervals.resolve_scale().len(), 7);
    }

    #[test]
    fn test_cache_key_canonical() {
        let a = Options::new().with_key("C4").with_scale("major");
        let b = Options::new().with_key(60).with_scale("MAJOR");
        assert_eq!(a.cache_key("1 2 3"), b.cache_key("1 2 3"));
        assert_ne!(a.cache_key("1 2 3"), a.cache_key("1 2 4"));
        assert_ne!(a.cache_key("1 2"), a.clone().with_octave(1).cache_key("1 2"));
    }

    #[test]
    fn test_context() {
        let ctx = Options::new().with_octave(-1).with_duration(0.5).context();
        assert_eq!(ctx.octave, -1);
        assert_eq!(ctx.duration, 0.5);
        assert_eq!(ctx.key, 60);

        let options = Options::new().with_degrees(true).with_inversion(2);
        let ctx = options.context_in(62, Arc::new(Scale::parse("minor")));
        assert_eq!(ctx.key, 62);
        assert!(ctx.degrees);
        assert_eq!(ctx.inversion, 2);
    }
}
