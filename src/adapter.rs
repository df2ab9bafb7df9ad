//! Stateless adapter over one controller.
//!
//! [`Adapter`] holds only the [`ControllerClient`] built from an injected
//! [`ControllerConfig`]. Every operation fetches or sends exactly once
//! (except [`Detail::Merged`], which reads both snapshots) and returns
//! freshly decoded records; nothing is cached between calls.

use crate::client::ControllerClient;
use crate::command::{Action, CommandBatch};
use crate::config::ControllerConfig;
use crate::error::{CommandError, Error};
use crate::snapshot::{Device, DeviceKind, GroupStatus, SensorReading, Snapshot};

/// Which snapshot a read operation decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Detail {
    /// `/sens_out.json`: cheap, descriptions may be defaulted.
    #[default]
    Brief,
    /// `/d_sens_out.json`: descriptions included, expensive.
    Full,
    /// Brief states with missing fields filled from the full snapshot.
    Merged,
}

impl Detail {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "brief" => Some(Detail::Brief),
            "full" => Some(Detail::Full),
            "merged" => Some(Detail::Merged),
            _ => None,
        }
    }
}

/// Adapter between tool calls and the controller's HTTP API.
#[derive(Clone, Debug)]
pub struct Adapter {
    client: ControllerClient,
}

impl Adapter {
    pub fn new(config: &ControllerConfig) -> Result<Self, Error> {
        Ok(Self {
            client: ControllerClient::new(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Fetch and parse a snapshot at the requested detail.
    pub async fn snapshot(&self, detail: Detail) -> Result<Snapshot, Error> {
        match detail {
            Detail::Brief => self.client.brief_snapshot().await,
            Detail::Full => self.client.full_snapshot().await,
            Detail::Merged => {
                let mut brief = self.client.brief_snapshot().await?;
                let full = self.client.full_snapshot().await?;
                brief.merge_missing_from(&full);
                Ok(brief)
            }
        }
    }

    /// List devices, optionally restricted to one kind.
    pub async fn list_devices(
        &self,
        detail: Detail,
        kind: Option<DeviceKind>,
    ) -> Result<Vec<Device>, Error> {
        let snapshot = self.snapshot(detail).await?;
        Ok(match kind {
            Some(kind) => snapshot.devices_of(kind),
            None => snapshot.devices(),
        })
    }

    pub async fn list_sensors(&self, detail: Detail) -> Result<Vec<SensorReading>, Error> {
        Ok(self.snapshot(detail).await?.sensors())
    }

    /// One device by id, or `None` if the snapshot doesn't list it.
    pub async fn device(&self, id: u32, detail: Detail) -> Result<Option<Device>, Error> {
        Ok(self.snapshot(detail).await?.device(id))
    }

    /// Resolve a group's members against the full snapshot.
    pub async fn group_status(&self, id: u32) -> Result<Option<GroupStatus>, Error> {
        Ok(self.client.full_snapshot().await?.group_status(id))
    }

    /// Turn on, off, or toggle one output or group. Returns what was sent.
    pub async fn switch(
        &self,
        kind: DeviceKind,
        id: u32,
        action: Action,
    ) -> Result<CommandBatch, Error> {
        let batch = CommandBatch::new().switch(kind, id, action)?;
        self.execute(&batch).await?;
        Ok(batch)
    }

    /// Set a PCA or PWM level. The percentage is clamped and rounded.
    pub async fn set_level(
        &self,
        kind: DeviceKind,
        id: u32,
        percent: f64,
    ) -> Result<CommandBatch, Error> {
        let batch = CommandBatch::new().set_level(kind, id, percent)?;
        self.execute(&batch).await?;
        Ok(batch)
    }

    /// Send a raw `key=value&...` command string.
    pub async fn send_raw(&self, raw: &str) -> Result<CommandBatch, Error> {
        let batch = CommandBatch::parse_raw(raw)?;
        self.execute(&batch).await?;
        Ok(batch)
    }

    /// Send a prepared batch as a single POST.
    pub async fn execute(&self, batch: &CommandBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Err(CommandError::Empty.into());
        }
        self.client.send(batch).await
    }
}
