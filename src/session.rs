//! Session controller.
//!
//! [`Session`] is the single owner of [`SessionState`]. State only changes
//! through the mutators below; readers get `&SessionState` and its accessors.
//!
//! URL submission is split in three so overlapping submissions can be
//! expressed without holding a borrow of the session across the wait:
//!
//! 1. [`Session::begin_submit`] normalizes, marks the session as
//!    classifying and hands out a [`Submission`] tagged with a fresh token
//! 2. [`Submission::classify`] runs the classifier (no session access)
//! 3. [`Session::complete_submit`] applies the result only if its token is
//!    still the latest one issued
//!
//! [`Session::submit_url`] chains the three for callers that do not need
//! the split.

use crate::classify::{Classifier, RenderingStrategy};
use crate::device::{DeviceId, Orientation};
use crate::normalize::normalize;
use crate::{LabConfig, MAX_ZOOM, MIN_ZOOM};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    canonical_url: String,
    zoom: f32,
    orientations: BTreeMap<DeviceId, Orientation>,
    strategy: RenderingStrategy,
    is_classifying: bool,
    refresh_generation: u64,
}

impl SessionState {
    fn new(zoom: f32) -> Self {
        Self {
            canonical_url: String::new(),
            zoom,
            orientations: DeviceId::ALL
                .into_iter()
                .map(|d| (d, Orientation::Portrait))
                .collect(),
            strategy: RenderingStrategy::Live,
            is_classifying: false,
            refresh_generation: 0,
        }
    }

    /// Empty while the session is on the landing page.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    pub fn is_landing(&self) -> bool {
        self.canonical_url.is_empty()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Orientation a device frame is shown in. Devices that cannot rotate
    /// always report portrait.
    pub fn orientation(&self, device: DeviceId) -> Orientation {
        let requested = self.orientations.get(&device).copied().unwrap_or_default();
        device.profile().pinned(requested)
    }

    pub fn strategy(&self) -> RenderingStrategy {
        self.strategy
    }

    pub fn is_classifying(&self) -> bool {
        self.is_classifying
    }

    pub fn refresh_generation(&self) -> u64 {
        self.refresh_generation
    }
}

/// A URL submission waiting on its classification.
#[derive(Debug, Clone)]
pub struct Submission {
    token: u64,
    url: String,
    started: Instant,
    min_duration: Duration,
}

impl Submission {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Classify the submitted URL. Completes no earlier than the configured
    /// analysis delay after the submission began, however fast the
    /// classifier answers.
    pub async fn classify<C: Classifier>(self, classifier: &C) -> Classification {
        let deadline = self.started + self.min_duration;
        let strategy = classifier.classify(&self.url).await;
        tokio::time::sleep_until(deadline).await;
        Classification {
            token: self.token,
            url: self.url,
            strategy,
        }
    }
}

/// Outcome of a [`Submission`], applied with [`Session::complete_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub token: u64,
    pub url: String,
    pub strategy: RenderingStrategy,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    latest_token: u64,
    analysis_delay: Duration,
}

impl Session {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            state: SessionState::new(clamp_zoom(config.default_zoom).unwrap_or(crate::DEFAULT_ZOOM)),
            latest_token: 0,
            analysis_delay: config.analysis_delay(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Start a submission. Blank input is a no-op and returns `None`.
    pub fn begin_submit(&mut self, raw: &str) -> Option<Submission> {
        let url = normalize(raw);
        if url.is_empty() {
            return None;
        }
        self.latest_token += 1;
        self.state.is_classifying = true;
        debug!("submission #{} for {}", self.latest_token, url);
        Some(Submission {
            token: self.latest_token,
            url,
            started: Instant::now(),
            min_duration: self.analysis_delay,
        })
    }

    /// Apply a classification if it belongs to the latest submission.
    /// Returns whether it was applied.
    pub fn complete_submit(&mut self, result: Classification) -> bool {
        if result.token != self.latest_token {
            debug!(
                "discarding classification #{} for {} (latest is #{})",
                result.token, result.url, self.latest_token
            );
            return false;
        }
        info!("{} -> {}", result.url, result.strategy.label());
        self.state.canonical_url = result.url;
        self.state.strategy = result.strategy;
        self.state.is_classifying = false;
        true
    }

    /// Normalize, classify and apply in one go. Returns whether the session
    /// changed.
    pub async fn submit_url<C: Classifier>(&mut self, raw: &str, classifier: &C) -> bool {
        let Some(submission) = self.begin_submit(raw) else {
            return false;
        };
        let result = submission.classify(classifier).await;
        self.complete_submit(result)
    }

    /// Set the zoom factor, clamped to `[MIN_ZOOM, MAX_ZOOM]`. Non-finite
    /// values leave the zoom untouched. Returns the zoom now in effect.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        if let Some(z) = clamp_zoom(zoom) {
            self.state.zoom = z;
        }
        self.state.zoom
    }

    /// Flip a device between portrait and landscape. Devices that cannot
    /// rotate are left alone and `false` is returned.
    pub fn toggle_orientation(&mut self, device: DeviceId) -> bool {
        if !device.profile().can_rotate {
            debug!("ignoring rotation of fixed device {}", device);
            return false;
        }
        let o = self.state.orientations.entry(device).or_default();
        *o = o.flipped();
        true
    }

    /// Put a device in the given orientation. Devices that cannot rotate
    /// only accept portrait; anything else returns `false`.
    pub fn set_orientation(&mut self, device: DeviceId, orientation: Orientation) -> bool {
        if !device.profile().can_rotate {
            return orientation == Orientation::Portrait;
        }
        self.state.orientations.insert(device, orientation);
        true
    }

    /// Bump the refresh generation, forcing every frame to reload.
    pub fn refresh(&mut self) -> u64 {
        self.state.refresh_generation += 1;
        self.state.refresh_generation
    }

    /// Back to the landing page. Zoom and orientations are kept; any
    /// submission still in flight is invalidated.
    pub fn reset(&mut self) {
        self.state.canonical_url.clear();
        self.state.strategy = RenderingStrategy::Live;
        self.state.is_classifying = false;
        self.latest_token += 1;
    }
}

fn clamp_zoom(zoom: f32) -> Option<f32> {
    zoom.is_finite().then(|| zoom.clamp(MIN_ZOOM, MAX_ZOOM))
}
