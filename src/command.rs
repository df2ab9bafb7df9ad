//! Command encoding for the controller's `POST /` endpoint.
//!
//! The controller takes a flat `key=value` vocabulary. Switching uses a
//! per-family prefix and the target id as value; levels use a key with the
//! id baked in and the percentage as value:
//!
//! | Operation | Relay   | PCA            | PWM                  | Group   |
//! |-----------|---------|----------------|----------------------|---------|
//! | On        | `r_ON`  | `PCA_ON`       | `f_ON`               | `g_ON`  |
//! | Off       | `r_OFF` | `PCA_OFF`      | `f_OFF`              | `g_OFF` |
//! | Toggle    | `r_INV` | `PCA_INV`      | `f_INV`              | `g_INV` |
//! | Level     | —       | `PCA*<id>=pct` | `fet*<id-100>=pct`   | —       |
//!
//! A [`CommandBatch`] collects pairs in insertion order and serializes them
//! as one form-urlencoded body. Toggling a group whose members disagree is
//! resolved by the controller firmware (pull-up decides), not here.

use std::fmt;

use crate::error::CommandError;
use crate::snapshot::DeviceKind;

/// Switching operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    On,
    Off,
    Toggle,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::On, Action::Off, Action::Toggle];

    /// Tool-facing name.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::On => "on",
            Action::Off => "off",
            Action::Toggle => "toggle",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Action::On => "ON",
            Action::Off => "OFF",
            Action::Toggle => "INV",
        }
    }
}

/// Command key for switching a device of `kind`, e.g. `r_ON` or `PCA_INV`.
pub fn switch_key(kind: DeviceKind, action: Action) -> String {
    let prefix = match kind {
        DeviceKind::Relay => "r",
        DeviceKind::Pca => "PCA",
        DeviceKind::Pwm => "f",
        DeviceKind::Group => "g",
    };
    format!("{prefix}_{}", action.suffix())
}

/// Round to the nearest integer and clamp to 0–100. Non-finite input is 0.
pub fn normalize_percent(percent: f64) -> u8 {
    if !percent.is_finite() {
        return 0;
    }
    percent.round().clamp(0.0, 100.0) as u8
}

/// Ordered `key=value` pairs sent in a single request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandBatch {
    pairs: Vec<(String, String)>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw pair without validation.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append an on/off/toggle command.
    pub fn switch(
        mut self,
        kind: DeviceKind,
        id: u32,
        action: Action,
    ) -> Result<Self, CommandError> {
        check_id(kind, id)?;
        self.push(switch_key(kind, action), id.to_string());
        Ok(self)
    }

    /// Append a level command. `percent` is normalized, never rejected.
    pub fn set_level(
        mut self,
        kind: DeviceKind,
        id: u32,
        percent: f64,
    ) -> Result<Self, CommandError> {
        check_id(kind, id)?;
        let key = match kind {
            DeviceKind::Pca => format!("PCA*{id}"),
            // The controller indexes PWM channels from 1, not by id.
            DeviceKind::Pwm => format!("fet*{}", id - 100),
            DeviceKind::Relay | DeviceKind::Group => {
                return Err(CommandError::LevelUnsupported(kind))
            }
        };
        self.push(key, normalize_percent(percent).to_string());
        Ok(self)
    }

    /// Append all pairs of `other`, keeping their order.
    pub fn merge(mut self, other: CommandBatch) -> Self {
        self.pairs.extend(other.pairs);
        self
    }

    /// Parse a raw `k1=v1&k2=v2` string. Components are percent-decoded
    /// first, so already-encoded input is not encoded twice on the wire.
    pub fn parse_raw(raw: &str) -> Result<Self, CommandError> {
        let mut batch = CommandBatch::new();
        for component in raw.trim().split('&').map(str::trim) {
            if component.is_empty() {
                continue;
            }
            let (key, value) = component
                .split_once('=')
                .ok_or_else(|| CommandError::Malformed(component.to_string()))?;
            let key = urlencoding::decode(key.trim())
                .map_err(|_| CommandError::Malformed(component.to_string()))?;
            let value = urlencoding::decode(value.trim())
                .map_err(|_| CommandError::Malformed(component.to_string()))?;
            if key.is_empty() {
                return Err(CommandError::Malformed(component.to_string()));
            }
            batch.push(key.into_owned(), value.into_owned());
        }
        if batch.is_empty() {
            return Err(CommandError::Empty);
        }
        Ok(batch)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Unencoded `key=value&...`, for messages and logs.
impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

fn check_id(kind: DeviceKind, id: u32) -> Result<(), CommandError> {
    let range = kind.id_range();
    if range.contains(&id) {
        Ok(())
    } else {
        Err(CommandError::IdOutOfRange {
            kind,
            id,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
