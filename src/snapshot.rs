//! Status snapshot decoding.
//!
//! The controller publishes its state as a JSON document keyed by device
//! family, each family mapping stringified ids to raw records:
//!
//! ```json
//! {
//!   "relays":  { "1": { "id": 1, "state": 1, "description": "Hall" } },
//!   "pca":     { "2001": { "id": 2001, "state": 128 } },
//!   "pwm":     { "105": { "id": 105, "state": 255 } },
//!   "groups":  { "500": { "id": 500, "pullUP": 1, "element1": 1, "element2": 2001 } },
//!   "sensors": { "3": { "id": 3, "temp": 2150 } }
//! }
//! ```
//!
//! Two endpoints return this shape: [`BRIEF_PATH`] (cheap, descriptions not
//! guaranteed) and [`FULL_PATH`] (descriptions guaranteed, expensive for the
//! controller). [`Snapshot`] accepts either.
//!
//! Decoding is per record: an entry without a usable id or state is
//! skipped, the rest of the family still decodes. A family that is not an
//! object (`null`, `[]`) decodes as empty. This module is pure data, no I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Brief snapshot endpoint, meant for frequent polling.
pub const BRIEF_PATH: &str = "/sens_out.json";
/// Full snapshot endpoint with descriptions. Call rarely.
pub const FULL_PATH: &str = "/d_sens_out.json";

/// Output families the controller can switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Relay,
    Pca,
    Pwm,
    Group,
}

impl DeviceKind {
    /// All kinds, in listing order.
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::Relay,
        DeviceKind::Pca,
        DeviceKind::Pwm,
        DeviceKind::Group,
    ];

    /// Human label used in synthesized descriptions.
    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::Relay => "Relay",
            DeviceKind::Pca => "PCA",
            DeviceKind::Pwm => "PWM",
            DeviceKind::Group => "Group",
        }
    }

    /// Lowercase type name, as used by the tool layer.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Relay => "relay",
            DeviceKind::Pca => "pca",
            DeviceKind::Pwm => "pwm",
            DeviceKind::Group => "group",
        }
    }

    /// Parse a lowercase type name.
    pub fn parse(name: &str) -> Option<Self> {
        DeviceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Ids the controller assigns to this kind.
    pub fn id_range(self) -> RangeInclusive<u32> {
        match self {
            DeviceKind::Relay => 1..=100,
            DeviceKind::Pwm => 101..=113,
            DeviceKind::Group => 500..=550,
            DeviceKind::Pca => 2001..=2128,
        }
    }

    /// Infer the kind from an id. Id ranges don't overlap.
    pub fn from_id(id: u32) -> Option<Self> {
        DeviceKind::ALL
            .into_iter()
            .find(|k| k.id_range().contains(&id))
    }

    fn family(self) -> &'static str {
        match self {
            DeviceKind::Relay => "relays",
            DeviceKind::Pca => "pca",
            DeviceKind::Pwm => "pwm",
            DeviceKind::Group => "groups",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Measurement carried by a sensor record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Energy,
    Power,
    Voltage,
    Current,
}

impl SensorKind {
    /// Lookup order. A record exposing several fields decodes as the first.
    pub const PRIORITY: [SensorKind; 6] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Energy,
        SensorKind::Power,
        SensorKind::Voltage,
        SensorKind::Current,
    ];

    /// Raw record field holding the value.
    pub fn field(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temp",
            SensorKind::Humidity => "hum",
            SensorKind::Energy => "imp",
            SensorKind::Power => "P",
            SensorKind::Voltage => "U",
            SensorKind::Current => "I",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Energy => "kWh",
            SensorKind::Power => "kW",
            SensorKind::Voltage => "V",
            SensorKind::Current => "A",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Energy => "energy",
            SensorKind::Power => "power",
            SensorKind::Voltage => "voltage",
            SensorKind::Current => "current",
        }
    }
}

/// Membership of a group record.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GroupMembers {
    /// Member ids in `elementN` order.
    pub members: Vec<u32>,
    /// When set, toggling a mixed group drives every member on; otherwise off.
    pub pull_up: bool,
}

/// A decoded relay, PCA output, PWM output or group.
#[derive(Clone, Debug, PartialEq)]
pub struct Device {
    pub id: u32,
    pub description: String,
    pub kind: DeviceKind,
    /// Always `false` for groups; see [`Snapshot::group_status`].
    pub state: bool,
    /// 0–100, PCA and PWM only.
    pub level_percent: Option<u8>,
    /// Groups only.
    pub group: Option<GroupMembers>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}: ", self.kind.as_str(), self.id, self.description)?;
        if let Some(group) = &self.group {
            write!(f, "state unknown, members ")?;
            if group.members.is_empty() {
                write!(f, "none")?;
            } else {
                write!(f, "{}", join_ids(&group.members))?;
            }
            return write!(f, ", pull-up {}", if group.pull_up { "on" } else { "off" });
        }
        write!(f, "{}", on_off(self.state))?;
        if let Some(level) = self.level_percent {
            write!(f, " ({level}%)")?;
        }
        Ok(())
    }
}

/// A decoded sensor value.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub id: u32,
    pub description: String,
    pub kind: SensorKind,
    /// `raw / 100`.
    pub value: f64,
    pub unit: &'static str,
    /// Untouched integer from the snapshot.
    pub raw: i64,
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {}] {}: {} {} (raw {})",
            self.kind.as_str(),
            self.id,
            self.description,
            self.value,
            self.unit,
            self.raw
        )
    }
}

/// Aggregate on/off picture of a group's members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupAggregate {
    AllOn,
    AllOff,
    Mixed,
    /// No member could be resolved in the snapshot.
    Unknown,
}

/// State of one group member as found in the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberState {
    pub id: u32,
    pub kind: Option<DeviceKind>,
    /// `None` when the member is missing from the snapshot or is itself a group.
    pub state: Option<bool>,
}

/// Group membership resolved against the output families of one snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupStatus {
    pub group: Device,
    pub members: Vec<MemberState>,
}

impl GroupStatus {
    pub fn aggregate(&self) -> GroupAggregate {
        let mut on = 0usize;
        let mut off = 0usize;
        for state in self.members.iter().filter_map(|m| m.state) {
            if state {
                on += 1;
            } else {
                off += 1;
            }
        }
        match (on, off) {
            (0, 0) => GroupAggregate::Unknown,
            (_, 0) => GroupAggregate::AllOn,
            (0, _) => GroupAggregate::AllOff,
            _ => GroupAggregate::Mixed,
        }
    }

    /// What the controller firmware will do on `g_INV`, or `None` if the
    /// member states are unknown.
    pub fn toggle_outcome(&self) -> Option<bool> {
        let pull_up = self.group.group.as_ref().is_some_and(|g| g.pull_up);
        match self.aggregate() {
            GroupAggregate::AllOn => Some(false),
            GroupAggregate::AllOff => Some(true),
            GroupAggregate::Mixed => Some(pull_up),
            GroupAggregate::Unknown => None,
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pull_up = self.group.group.as_ref().is_some_and(|g| g.pull_up);
        writeln!(
            f,
            "[group {}] {} (pull-up {})",
            self.group.id,
            self.group.description,
            if pull_up { "on" } else { "off" }
        )?;
        for member in &self.members {
            let kind = member.kind.map_or("unknown", DeviceKind::as_str);
            let state = member.state.map_or("unresolved", on_off);
            writeln!(f, "  - [{kind} {}] {state}", member.id)?;
        }
        let aggregate = match self.aggregate() {
            GroupAggregate::AllOn => "all members on",
            GroupAggregate::AllOff => "all members off",
            GroupAggregate::Mixed => "mixed",
            GroupAggregate::Unknown => "unknown",
        };
        write!(f, "Aggregate: {aggregate}")?;
        if let Some(outcome) = self.toggle_outcome() {
            write!(f, "; toggling drives all members {}", on_off(outcome))?;
        }
        Ok(())
    }
}

type Family = BTreeMap<String, Value>;

/// Fields the full snapshot may contribute to a brief record.
fn is_mergeable_field(field: &str) -> bool {
    field == "description" || field == "pullUP" || field.starts_with("element")
}

/// Any non-object family (`null`, `[]`, a scalar) decodes as empty.
fn lenient_family<'de, D>(deserializer: D) -> Result<Family, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(records) => Ok(records.into_iter().collect()),
        other => {
            tracing::debug!(value = %other, "family is not an object, treating as empty");
            Ok(Family::new())
        }
    }
}

/// One decoded snapshot document (brief or full).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient_family")]
    relays: Family,
    #[serde(default, deserialize_with = "lenient_family")]
    pca: Family,
    #[serde(default, deserialize_with = "lenient_family")]
    pwm: Family,
    #[serde(default, deserialize_with = "lenient_family")]
    groups: Family,
    #[serde(default, deserialize_with = "lenient_family")]
    sensors: Family,
}

impl Snapshot {
    /// Parse a snapshot body. Families other than the five decoded ones are
    /// ignored; a missing family is empty.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    fn family(&self, kind: DeviceKind) -> &Family {
        match kind {
            DeviceKind::Relay => &self.relays,
            DeviceKind::Pca => &self.pca,
            DeviceKind::Pwm => &self.pwm,
            DeviceKind::Group => &self.groups,
        }
    }

    fn families_mut(&mut self) -> [(&'static str, &mut Family); 5] {
        [
            (DeviceKind::Relay.family(), &mut self.relays),
            (DeviceKind::Pca.family(), &mut self.pca),
            (DeviceKind::Pwm.family(), &mut self.pwm),
            (DeviceKind::Group.family(), &mut self.groups),
            ("sensors", &mut self.sensors),
        ]
    }

    fn family_by_name(&self, name: &str) -> Option<&Family> {
        match name {
            "relays" => Some(&self.relays),
            "pca" => Some(&self.pca),
            "pwm" => Some(&self.pwm),
            "groups" => Some(&self.groups),
            "sensors" => Some(&self.sensors),
            _ => None,
        }
    }

    /// Fill descriptions and group membership (`pullUP`, `elementN`) missing
    /// from this snapshot's records from the matching records of `full`.
    /// States and measurements are never copied. Records only present in
    /// `full` are not added; fields already present are kept.
    pub fn merge_missing_from(&mut self, full: &Snapshot) {
        for (name, family) in self.families_mut() {
            let Some(source) = full.family_by_name(name) else {
                continue;
            };
            for (key, record) in family.iter_mut() {
                let (Some(target), Some(Value::Object(extra))) =
                    (record.as_object_mut(), source.get(key))
                else {
                    continue;
                };
                for (field, value) in extra {
                    if is_mergeable_field(field) {
                        target.entry(field.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }
    }

    /// All devices: relays, PCA, PWM, then groups, each sorted by id.
    pub fn devices(&self) -> Vec<Device> {
        DeviceKind::ALL
            .into_iter()
            .flat_map(|kind| self.devices_of(kind))
            .collect()
    }

    /// Devices of one kind, sorted by id.
    pub fn devices_of(&self, kind: DeviceKind) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .family(kind)
            .iter()
            .filter_map(|(key, record)| {
                let decoded = decode_device(kind, key, record);
                if decoded.is_none() {
                    tracing::debug!(family = kind.family(), key = %key, "skipping undecodable record");
                }
                decoded
            })
            .collect();
        devices.sort_by_key(|d| d.id);
        devices
    }

    /// Look up one device; its kind is inferred from the id range.
    pub fn device(&self, id: u32) -> Option<Device> {
        let kind = DeviceKind::from_id(id)?;
        self.devices_of(kind).into_iter().find(|d| d.id == id)
    }

    /// All sensor readings, sorted by id. Records exposing none of the known
    /// measurement fields are skipped.
    pub fn sensors(&self) -> Vec<SensorReading> {
        let mut readings: Vec<SensorReading> = self
            .sensors
            .iter()
            .filter_map(|(key, record)| decode_sensor(key, record))
            .collect();
        readings.sort_by_key(|r| r.id);
        readings
    }

    /// Resolve a group's members against this snapshot.
    ///
    /// The group's own `state` stays the `false` placeholder; the resolved
    /// member states are reported alongside it.
    pub fn group_status(&self, id: u32) -> Option<GroupStatus> {
        let group = self
            .devices_of(DeviceKind::Group)
            .into_iter()
            .find(|d| d.id == id)?;
        let member_ids = group
            .group
            .as_ref()
            .map(|g| g.members.clone())
            .unwrap_or_default();

        let members = member_ids
            .into_iter()
            .map(|member| {
                let kind = DeviceKind::from_id(member);
                let state = match kind {
                    Some(DeviceKind::Group) | None => None,
                    Some(k) => self
                        .devices_of(k)
                        .into_iter()
                        .find(|d| d.id == member)
                        .map(|d| d.state),
                };
                MemberState {
                    id: member,
                    kind,
                    state,
                }
            })
            .collect();

        Some(GroupStatus { group, members })
    }
}

/// `round(raw / 255 * 100)`, raw clamped to the controller's 0–255 range.
pub fn level_percent(raw: i64) -> u8 {
    let raw = raw.clamp(0, 255) as f64;
    (raw / 255.0 * 100.0).round() as u8
}

fn decode_device(kind: DeviceKind, key: &str, record: &Value) -> Option<Device> {
    let record = record.as_object()?;
    let id = record_id(key, record)?;
    let description = description_or_default(record, kind.label(), id);

    let (state, level_percent, group) = match kind {
        DeviceKind::Relay => {
            let raw = record.get("state").and_then(as_int)?;
            (raw == 1, None, None)
        }
        DeviceKind::Pca | DeviceKind::Pwm => {
            let raw = record.get("state").and_then(as_int)?;
            (raw > 0, Some(level_percent(raw)), None)
        }
        DeviceKind::Group => (false, None, Some(decode_members(record))),
    };

    Some(Device {
        id,
        description,
        kind,
        state,
        level_percent,
        group,
    })
}

fn decode_sensor(key: &str, record: &Value) -> Option<SensorReading> {
    let record = record.as_object()?;
    let id = record_id(key, record)?;
    // The first field present picks the kind; a non-integer value there
    // skips the record rather than falling through to the next field.
    let (kind, value) = SensorKind::PRIORITY.into_iter().find_map(|kind| {
        record
            .get(kind.field())
            .filter(|v| !v.is_null())
            .map(|v| (kind, v))
    })?;
    let raw = as_int(value)?;

    Some(SensorReading {
        id,
        description: description_or_default(record, "Sensor", id),
        kind,
        value: raw as f64 / 100.0,
        unit: kind.unit(),
        raw,
    })
}

/// `elementN` keys become an ordered member list; `pullUP` may be a bool or 0/1.
fn decode_members(record: &Map<String, Value>) -> GroupMembers {
    let mut indexed: Vec<(u32, u32)> = record
        .iter()
        .filter_map(|(field, value)| {
            let index = field.strip_prefix("element")?.parse::<u32>().ok()?;
            let member = as_int(value).and_then(|v| u32::try_from(v).ok())?;
            Some((index, member))
        })
        .collect();
    indexed.sort_unstable_by_key(|(index, _)| *index);

    let pull_up = match record.get("pullUP") {
        Some(Value::Bool(b)) => *b,
        Some(other) => as_int(other).is_some_and(|v| v != 0),
        None => false,
    };

    GroupMembers {
        members: indexed.into_iter().map(|(_, member)| member).collect(),
        pull_up,
    }
}

fn record_id(key: &str, record: &Map<String, Value>) -> Option<u32> {
    let id = match record.get("id") {
        Some(v) => as_int(v)?,
        None => key.trim().parse().ok()?,
    };
    u32::try_from(id).ok()
}

fn description_or_default(record: &Map<String, Value>, label: &str, id: u32) -> String {
    record
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(|| format!("{label} {id}"), String::from)
}

/// Integers, or strings holding one (some firmware quotes numbers).
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> Snapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn relay_state_is_true_only_for_one() {
        let snap = snapshot(json!({
            "relays": {
                "1": { "id": 1, "state": 1 },
                "2": { "id": 2, "state": 0 },
                "3": { "id": 3, "state": 2 }
            }
        }));
        let states: Vec<(u32, bool)> = snap.devices().iter().map(|d| (d.id, d.state)).collect();
        assert_eq!(states, vec![(1, true), (2, false), (3, false)]);
        assert!(snap.devices().iter().all(|d| d.level_percent.is_none()));
    }

    #[test]
    fn pca_and_pwm_levels() {
        let snap = snapshot(json!({
            "pca": {
                "2001": { "id": 2001, "state": 255 },
                "2002": { "id": 2002, "state": 128 },
                "2003": { "id": 2003, "state": 0 }
            },
            "pwm": { "105": { "id": 105, "state": 1 } }
        }));
        let pca = snap.devices_of(DeviceKind::Pca);
        assert_eq!(pca.len(), 3);
        assert_eq!((pca[0].state, pca[0].level_percent), (true, Some(100)));
        assert_eq!((pca[1].state, pca[1].level_percent), (true, Some(50)));
        assert_eq!((pca[2].state, pca[2].level_percent), (false, Some(0)));

        let pwm = snap.devices_of(DeviceKind::Pwm);
        assert_eq!((pwm[0].state, pwm[0].level_percent), (true, Some(0)));
    }

    #[test]
    fn level_percent_clamps_out_of_range_raw() {
        assert_eq!(level_percent(300), 100);
        assert_eq!(level_percent(-5), 0);
    }

    #[test]
    fn default_descriptions() {
        let snap = snapshot(json!({
            "relays": { "7": { "id": 7, "state": 0 } },
            "pca": { "2010": { "id": 2010, "state": 0 } },
            "pwm": { "101": { "id": 101, "state": 0, "description": "  " } },
            "groups": { "500": { "id": 500 } },
            "sensors": { "4": { "id": 4, "hum": 4500 } }
        }));
        let names: Vec<String> = snap.devices().into_iter().map(|d| d.description).collect();
        assert_eq!(names, vec!["Relay 7", "PCA 2010", "PWM 101", "Group 500"]);
        assert_eq!(snap.sensors()[0].description, "Sensor 4");
    }

    #[test]
    fn description_is_kept_when_present() {
        let snap = snapshot(json!({
            "relays": { "1": { "id": 1, "state": 1, "description": "Hall lamp" } }
        }));
        assert_eq!(snap.devices()[0].description, "Hall lamp");
    }

    #[test]
    fn sensor_fields_decode_with_units() {
        let snap = snapshot(json!({
            "sensors": {
                "1": { "id": 1, "temp": 2150 },
                "2": { "id": 2, "hum": 4550 },
                "3": { "id": 3, "imp": 123456 },
                "4": { "id": 4, "P": 250 },
                "5": { "id": 5, "U": 23010 },
                "6": { "id": 6, "I": -120 }
            }
        }));
        let readings = snap.sensors();
        let decoded: Vec<(SensorKind, f64, &str, i64)> = readings
            .iter()
            .map(|r| (r.kind, r.value, r.unit, r.raw))
            .collect();
        assert_eq!(
            decoded,
            vec![
                (SensorKind::Temperature, 21.5, "°C", 2150),
                (SensorKind::Humidity, 45.5, "%", 4550),
                (SensorKind::Energy, 1234.56, "kWh", 123_456),
                (SensorKind::Power, 2.5, "kW", 250),
                (SensorKind::Voltage, 230.1, "V", 23010),
                (SensorKind::Current, -1.2, "A", -120),
            ]
        );
    }

    #[test]
    fn sensor_first_matching_field_wins() {
        let snap = snapshot(json!({
            "sensors": { "9": { "id": 9, "U": 23000, "hum": 5000, "temp": 1900 } }
        }));
        let readings = snap.sensors();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].kind, SensorKind::Temperature);
        assert_eq!(readings[0].value, 19.0);
    }

    #[test]
    fn sensor_with_non_integer_priority_field_is_skipped() {
        let snap = snapshot(json!({
            "sensors": {
                "1": { "id": 1, "temp": 2150.0, "hum": 4000 },
                "2": { "id": 2, "temp": "warm", "U": 23000 },
                "3": { "id": 3, "hum": 4000 }
            }
        }));
        let readings = snap.sensors();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].id, 3);
        assert_eq!(readings[0].kind, SensorKind::Humidity);
    }

    #[test]
    fn sensor_without_known_field_is_skipped() {
        let snap = snapshot(json!({
            "sensors": {
                "1": { "id": 1, "lux": 300 },
                "2": { "id": 2, "temp": 2000 },
                "3": { "id": 3, "temp": null, "hum": 4000 }
            }
        }));
        let readings = snap.sensors();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id, 2);
        assert_eq!(readings[1].kind, SensorKind::Humidity);
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let snap = snapshot(json!({
            "relays": {
                "1": { "id": 1, "state": 1 },
                "2": { "id": 2 },
                "x": { "state": 1 },
                "4": "garbage",
                "5": { "state": 1 }
            }
        }));
        let ids: Vec<u32> = snap.devices().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn devices_are_ordered_by_family_then_numeric_id() {
        let snap = snapshot(json!({
            "groups": { "500": { "id": 500 } },
            "pwm": { "102": { "id": 102, "state": 0 } },
            "relays": {
                "10": { "id": 10, "state": 0 },
                "2": { "id": 2, "state": 0 }
            },
            "pca": { "2001": { "id": 2001, "state": 0 } }
        }));
        let ids: Vec<u32> = snap.devices().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 10, 2001, 102, 500]);
    }

    #[test]
    fn unknown_and_missing_families_are_tolerated() {
        let snap = Snapshot::parse(r#"{"inputs": {"1": {"id": 1, "state": 1}}}"#).unwrap();
        assert!(snap.devices().is_empty());
        assert!(snap.sensors().is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(Snapshot::parse("not json").is_err());
        assert!(Snapshot::parse(r#"{"relays": {"1": "#).is_err());
    }

    #[test]
    fn non_object_family_decodes_as_empty() {
        let snap = Snapshot::parse(
            r#"{"relays": {"1": {"id": 1, "state": 1}}, "pwm": [], "groups": null, "pca": 7}"#,
        )
        .unwrap();
        let ids: Vec<u32> = snap.devices().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1]);

        let snap = Snapshot::parse(
            r#"{"relays": [1, 2], "sensors": {"3": {"id": 3, "temp": 2150}}}"#,
        )
        .unwrap();
        assert!(snap.devices().is_empty());
        assert_eq!(snap.sensors().len(), 1);
    }

    #[test]
    fn group_members_and_pull_up() {
        let snap = snapshot(json!({
            "groups": {
                "500": {
                    "id": 500,
                    "state": 1,
                    "pullUP": 1,
                    "element10": 2001,
                    "element2": 5,
                    "element1": "3"
                },
                "501": { "id": 501, "pullUP": false }
            }
        }));
        let groups = snap.devices_of(DeviceKind::Group);
        assert!(!groups[0].state);
        assert_eq!(
            groups[0].group,
            Some(GroupMembers {
                members: vec![3, 5, 2001],
                pull_up: true
            })
        );
        assert_eq!(groups[1].group, Some(GroupMembers::default()));
    }

    #[test]
    fn brief_merged_with_full_takes_descriptions() {
        let mut brief = snapshot(json!({
            "relays": { "1": { "id": 1, "state": 1 } },
            "groups": { "500": { "id": 500 } }
        }));
        let full = snapshot(json!({
            "relays": {
                "1": { "id": 1, "state": 0, "description": "Porch" },
                "2": { "id": 2, "state": 1, "description": "Garage" }
            },
            "groups": { "500": { "id": 500, "description": "Outside", "element1": 1 } }
        }));
        brief.merge_missing_from(&full);

        let devices = brief.devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].description, "Porch");
        assert!(devices[0].state);
        assert_eq!(devices[1].group.as_ref().unwrap().members, vec![1]);
    }

    #[test]
    fn merge_never_copies_state_or_measurements() {
        let mut brief = snapshot(json!({
            "relays": { "1": { "id": 1, "state": 1 }, "2": { "id": 2 } },
            "pca": { "2001": { "id": 2001 } },
            "sensors": { "3": { "id": 3 } }
        }));
        let full = snapshot(json!({
            "relays": {
                "1": { "id": 1, "state": 0, "description": "Porch" },
                "2": { "id": 2, "state": 1, "description": "Garage" }
            },
            "pca": { "2001": { "id": 2001, "state": 255, "description": "Dimmer" } },
            "sensors": { "3": { "id": 3, "temp": 2000, "description": "Attic" } }
        }));
        brief.merge_missing_from(&full);

        let devices = brief.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, 1);
        assert_eq!(devices[0].description, "Porch");
        assert!(brief.sensors().is_empty());
    }

    #[test]
    fn brief_relay_without_full_description_gets_default() {
        let mut brief = snapshot(json!({ "relays": { "1": { "id": 1, "state": 1 } } }));
        brief.merge_missing_from(&Snapshot::default());
        let devices = brief.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].kind, DeviceKind::Relay);
        assert!(devices[0].state);
        assert_eq!(devices[0].description, "Relay 1");
    }

    #[test]
    fn kind_from_id_ranges() {
        assert_eq!(DeviceKind::from_id(1), Some(DeviceKind::Relay));
        assert_eq!(DeviceKind::from_id(100), Some(DeviceKind::Relay));
        assert_eq!(DeviceKind::from_id(113), Some(DeviceKind::Pwm));
        assert_eq!(DeviceKind::from_id(550), Some(DeviceKind::Group));
        assert_eq!(DeviceKind::from_id(2128), Some(DeviceKind::Pca));
        assert_eq!(DeviceKind::from_id(0), None);
        assert_eq!(DeviceKind::from_id(114), None);
    }

    #[test]
    fn group_status_resolves_members() {
        let snap = snapshot(json!({
            "relays": { "1": { "id": 1, "state": 1 }, "2": { "id": 2, "state": 0 } },
            "pca": { "2001": { "id": 2001, "state": 40 } },
            "groups": {
                "500": { "id": 500, "pullUP": 0, "element1": 1, "element2": 2, "element3": 2001 },
                "501": { "id": 501, "element1": 1, "element2": 2001 },
                "502": { "id": 502, "element1": 77, "element2": 501 }
            }
        }));

        let mixed = snap.group_status(500).unwrap();
        assert_eq!(mixed.aggregate(), GroupAggregate::Mixed);
        assert_eq!(mixed.toggle_outcome(), Some(false));
        assert!(!mixed.group.state);

        let all_on = snap.group_status(501).unwrap();
        assert_eq!(all_on.aggregate(), GroupAggregate::AllOn);
        assert_eq!(all_on.toggle_outcome(), Some(false));

        let unresolved = snap.group_status(502).unwrap();
        assert_eq!(unresolved.aggregate(), GroupAggregate::Unknown);
        assert_eq!(unresolved.toggle_outcome(), None);
        assert!(unresolved.members.iter().all(|m| m.state.is_none()));

        assert!(snap.group_status(503).is_none());
    }

    #[test]
    fn mixed_group_with_pull_up_toggles_on() {
        let snap = snapshot(json!({
            "relays": { "1": { "id": 1, "state": 1 }, "2": { "id": 2, "state": 0 } },
            "groups": { "510": { "id": 510, "pullUP": true, "element1": 1, "element2": 2 } }
        }));
        let status = snap.group_status(510).unwrap();
        assert_eq!(status.toggle_outcome(), Some(true));
        assert!(status.to_string().contains("toggling drives all members ON"));
    }

    #[test]
    fn display_formats() {
        let snap = snapshot(json!({
            "pca": { "2001": { "id": 2001, "state": 128, "description": "Dimmer" } },
            "groups": { "500": { "id": 500, "pullUP": 1, "element1": 1 } },
            "sensors": { "3": { "id": 3, "temp": 2150, "description": "Living room" } }
        }));
        let devices = snap.devices();
        assert_eq!(devices[0].to_string(), "[pca 2001] Dimmer: ON (50%)");
        assert_eq!(
            devices[1].to_string(),
            "[group 500] Group 500: state unknown, members 1, pull-up on"
        );
        assert_eq!(
            snap.sensors()[0].to_string(),
            "[temperature 3] Living room: 21.5 °C (raw 2150)"
        );
    }
}
