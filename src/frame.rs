//! Per-device frame render-state machine.
//!
//! Each device frame owns one [`FrameMachine`] for its current identity key
//! `(url, orientation, refresh generation)`. A key change never mutates the
//! old machine: [`FrameSet::sync`] builds a fresh one and starts it, and any
//! completion that still carries the old key is ignored when it arrives.
//!
//! ```text
//! Idle ──start──▶ Pending ──ok──▶ Loaded
//!                    └─────err──▶ Errored
//! ```

use crate::classify::RenderingStrategy;
use crate::device::{DeviceId, DeviceProfile, Orientation};
use crate::embed::{mount_key, EmbedSpec};
use crate::session::SessionState;
use crate::snapshot::{self, SnapshotImage, PLACEHOLDER_ALT};
use crate::{Endpoints, Result};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Identity of a frame's rendered content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FrameKey {
    pub url: String,
    pub orientation: Orientation,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePhase {
    Idle,
    Pending,
    Loaded,
    Errored,
}

/// The two flags a frame's UI reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameRenderState {
    pub loaded: bool,
    pub errored: bool,
}

/// What a renderer should draw inside the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameView {
    /// Nothing requested yet
    Blank,
    /// Sandboxed live embed of the target
    Embed(EmbedSpec),
    /// Snapshot requested, loading placeholder visible
    Loading { src: String, key: String },
    /// Snapshot loaded
    Snapshot {
        src: String,
        alt: String,
        key: String,
        live_indicator: bool,
    },
    /// Snapshot failed; generated stand-in of the same size
    Placeholder {
        src: String,
        alt: String,
        key: String,
    },
}

/// A snapshot fetch the owner of a frame has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub device: DeviceId,
    pub key: FrameKey,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct FrameMachine {
    profile: &'static DeviceProfile,
    strategy: RenderingStrategy,
    key: FrameKey,
    phase: FramePhase,
    state: FrameRenderState,
    snapshot_url: String,
    placeholder_url: String,
    image: Option<SnapshotImage>,
}

impl FrameMachine {
    /// A fresh, idle machine for `key`.
    pub fn new(
        device: DeviceId,
        key: FrameKey,
        strategy: RenderingStrategy,
        endpoints: &Endpoints,
    ) -> Self {
        let profile = device.profile();
        let metrics = profile.metrics(key.orientation);
        let snapshot_url = snapshot::request_url(&endpoints.snapshot, &key.url, &metrics).to_string();
        let placeholder_url =
            snapshot::placeholder_url(&endpoints.placeholder, metrics.width, metrics.height);
        Self {
            profile,
            strategy,
            key,
            phase: FramePhase::Idle,
            state: FrameRenderState::default(),
            snapshot_url,
            placeholder_url,
            image: None,
        }
    }

    pub fn device(&self) -> DeviceId {
        self.profile.id
    }

    pub fn key(&self) -> &FrameKey {
        &self.key
    }

    pub fn strategy(&self) -> RenderingStrategy {
        self.strategy
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn render_state(&self) -> FrameRenderState {
        self.state
    }

    pub fn image(&self) -> Option<&SnapshotImage> {
        self.image.as_ref()
    }

    /// Idle → Pending. Returns the fetch to run for snapshot frames; live
    /// embeds are fire-and-forget and need nothing from the caller.
    pub fn start(&mut self) -> Option<FetchJob> {
        if self.phase != FramePhase::Idle {
            return None;
        }
        self.phase = FramePhase::Pending;
        match self.strategy {
            RenderingStrategy::Live => None,
            RenderingStrategy::Snapshot => Some(FetchJob {
                device: self.profile.id,
                key: self.key.clone(),
                url: self.snapshot_url.clone(),
            }),
        }
    }

    /// Apply a fetch result. Results for another key, or for a machine that
    /// is not waiting on a snapshot, are ignored and `false` is returned.
    pub fn resolve(&mut self, key: &FrameKey, outcome: Result<SnapshotImage>) -> bool {
        if *key != self.key
            || self.phase != FramePhase::Pending
            || self.strategy != RenderingStrategy::Snapshot
        {
            debug!("{}: dropping stale snapshot result", self.profile.id);
            return false;
        }
        match outcome {
            Ok(image) => {
                self.image = Some(image);
                self.phase = FramePhase::Loaded;
                self.state = FrameRenderState {
                    loaded: true,
                    errored: false,
                };
            }
            Err(e) => {
                warn!("{}: snapshot unavailable: {}", self.profile.id, e);
                self.phase = FramePhase::Errored;
                // loaded too, so the loading placeholder goes away
                self.state = FrameRenderState {
                    loaded: true,
                    errored: true,
                };
            }
        }
        true
    }

    pub fn is_waiting_on_snapshot(&self) -> bool {
        self.strategy == RenderingStrategy::Snapshot && self.phase == FramePhase::Pending
    }

    pub fn view(&self) -> FrameView {
        let key = mount_key(self.profile, self.key.generation);
        match (self.strategy, self.phase) {
            (_, FramePhase::Idle) => FrameView::Blank,
            (RenderingStrategy::Live, _) => {
                FrameView::Embed(EmbedSpec::new(self.profile, &self.key.url, self.key.generation))
            }
            (RenderingStrategy::Snapshot, FramePhase::Pending) => FrameView::Loading {
                src: self.snapshot_url.clone(),
                key,
            },
            (RenderingStrategy::Snapshot, FramePhase::Loaded) => FrameView::Snapshot {
                src: self.snapshot_url.clone(),
                alt: format!("{} Viewport", self.profile.name),
                key,
                live_indicator: true,
            },
            (RenderingStrategy::Snapshot, FramePhase::Errored) => FrameView::Placeholder {
                src: self.placeholder_url.clone(),
                alt: PLACEHOLDER_ALT.to_string(),
                key,
            },
        }
    }
}

/// The device frames of a session, one machine per device.
///
/// Empty in landing mode.
#[derive(Debug, Clone)]
pub struct FrameSet {
    endpoints: Endpoints,
    frames: BTreeMap<DeviceId, FrameMachine>,
}

impl FrameSet {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            frames: BTreeMap::new(),
        }
    }

    /// Bring every frame in line with the session. Frames whose key or
    /// strategy changed are replaced by a started machine; the snapshot
    /// fetches those new machines need are returned.
    pub fn sync(&mut self, session: &SessionState) -> Vec<FetchJob> {
        if session.is_landing() {
            self.frames.clear();
            return Vec::new();
        }

        let mut jobs = Vec::new();
        for device in DeviceId::ALL {
            let key = FrameKey {
                url: session.canonical_url().to_string(),
                orientation: session.orientation(device),
                generation: session.refresh_generation(),
            };
            let strategy = session.strategy();
            let current = self
                .frames
                .get(&device)
                .is_some_and(|f| f.key == key && f.strategy == strategy);
            if current {
                continue;
            }

            let mut machine = FrameMachine::new(device, key, strategy, &self.endpoints);
            if let Some(job) = machine.start() {
                jobs.push(job);
            }
            self.frames.insert(device, machine);
        }
        jobs
    }

    /// Route a fetch result to its frame; stale results return `false`.
    pub fn resolve(
        &mut self,
        device: DeviceId,
        key: &FrameKey,
        outcome: Result<SnapshotImage>,
    ) -> bool {
        match self.frames.get_mut(&device) {
            Some(frame) => frame.resolve(key, outcome),
            None => false,
        }
    }

    pub fn get(&self, device: DeviceId) -> Option<&FrameMachine> {
        self.frames.get(&device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameMachine> {
        self.frames.values()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn has_pending_snapshots(&self) -> bool {
        self.frames.values().any(FrameMachine::is_waiting_on_snapshot)
    }
}
