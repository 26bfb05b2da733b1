use crate::classify::Classifier;
use crate::device::{DeviceId, DeviceMetrics, Orientation};
use crate::frame::{FetchJob, FrameKey, FramePhase, FrameRenderState, FrameSet, FrameView};
use crate::session::{Classification, Session, SessionState};
use crate::snapshot::{SnapshotFetcher, SnapshotImage};
use crate::{Error, LabConfig, Result};
use log::debug;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

enum Command {
    Submit(String, oneshot::Sender<Option<u64>>),
    SetZoom(f32, oneshot::Sender<f32>),
    ToggleOrientation(DeviceId, oneshot::Sender<bool>),
    SetOrientation(DeviceId, Orientation, oneshot::Sender<bool>),
    Refresh(oneshot::Sender<u64>),
    Reset(oneshot::Sender<()>),

    // Reads
    Board(oneshot::Sender<PreviewBoard>),
    Settled(oneshot::Sender<PreviewBoard>),

    Close(oneshot::Sender<()>),
}

/// Completions reported back by spawned work.
enum Event {
    Classified(Classification),
    Resolved(FetchJob, Result<SnapshotImage>),
}

/// Everything a renderer needs to draw the current session.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewBoard {
    pub state: SessionState,
    /// One entry per device, empty on the landing page
    pub frames: Vec<FrameReport>,
}

impl PreviewBoard {
    pub fn frame(&self, device: DeviceId) -> Option<&FrameReport> {
        self.frames.iter().find(|f| f.device == device)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub device: DeviceId,
    pub name: &'static str,
    pub size_label: String,
    pub metrics: DeviceMetrics,
    /// Outer size of the frame at the session's zoom
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub key: FrameKey,
    pub phase: FramePhase,
    pub render_state: FrameRenderState,
    pub view: FrameView,
    pub image: Option<SnapshotImage>,
}

/// An async handle to a preview session running on a background task.
///
/// The task owns the [`Session`] and its frames. Mutators are sent over a
/// channel and answered over oneshot replies, so handles can be cloned freely
/// and used from any task. Classification and snapshot fetches are spawned
/// separately and report back to the same task, where stale results are
/// dropped.
#[derive(Clone)]
pub struct Preview {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl Preview {
    /// Start a session driver on the current tokio runtime. Resolves once
    /// the driver has accepted the configuration.
    pub async fn new<C, F>(config: LabConfig, classifier: C, fetcher: F) -> Result<Self>
    where
        C: Classifier + 'static,
        F: SnapshotFetcher + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        tokio::spawn(async move {
            let endpoints = match config.validate().and_then(|_| config.endpoints()) {
                Ok(endpoints) => endpoints,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
            let driver = Driver {
                session: Session::new(&config),
                frames: FrameSet::new(endpoints),
                classifier: Arc::new(classifier),
                fetcher: Arc::new(fetcher),
                events_tx,
                waiters: Vec::new(),
            };
            let _ = init_tx.send(Ok(()));
            driver.run(cmd_rx, events_rx).await;
        });

        init_rx
            .await
            .map_err(|e| Error::DriverClosed(format!("init canceled: {}", e)))??;
        Ok(Self { cmd_tx })
    }

    async fn request<T>(
        &self,
        what: &str,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::DriverClosed(format!("{} not sent", what)))?;
        rx.await
            .map_err(|e| Error::DriverClosed(format!("{} canceled: {}", what, e)))
    }

    /// Submit raw user input. Returns the submission token, or `None` when
    /// the input was blank and nothing happened. Classification continues in
    /// the background; use [`Preview::settled`] to wait for it.
    pub async fn submit(&self, raw: &str) -> Result<Option<u64>> {
        let raw = raw.to_string();
        self.request("Submit", |tx| Command::Submit(raw, tx)).await
    }

    pub async fn set_zoom(&self, zoom: f32) -> Result<f32> {
        self.request("SetZoom", |tx| Command::SetZoom(zoom, tx)).await
    }

    pub async fn toggle_orientation(&self, device: DeviceId) -> Result<bool> {
        self.request("ToggleOrientation", |tx| Command::ToggleOrientation(device, tx))
            .await
    }

    /// Put a device in a given orientation. Repeating a request is a no-op.
    /// Returns `false` when a fixed device is asked to leave portrait.
    pub async fn set_orientation(&self, device: DeviceId, orientation: Orientation) -> Result<bool> {
        self.request("SetOrientation", |tx| {
            Command::SetOrientation(device, orientation, tx)
        })
        .await
    }

    pub async fn refresh(&self) -> Result<u64> {
        self.request("Refresh", Command::Refresh).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request("Reset", Command::Reset).await
    }

    /// Current state, without waiting for anything in flight.
    pub async fn board(&self) -> Result<PreviewBoard> {
        self.request("Board", Command::Board).await
    }

    /// Wait until classification is done and every snapshot frame has
    /// either loaded or failed.
    pub async fn settled(&self) -> Result<PreviewBoard> {
        self.request("Settled", Command::Settled).await
    }

    /// Stop the background task.
    pub async fn close(self) -> Result<()> {
        self.request("Close", Command::Close).await
    }
}

struct Driver<C, F> {
    session: Session,
    frames: FrameSet,
    classifier: Arc<C>,
    fetcher: Arc<F>,
    events_tx: mpsc::UnboundedSender<Event>,
    waiters: Vec<oneshot::Sender<PreviewBoard>>,
}

impl<C, F> Driver<C, F>
where
    C: Classifier + 'static,
    F: SnapshotFetcher + 'static,
{
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut events_rx: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    // `None`: every handle dropped
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                Some(event) = events_rx.recv() => self.on_event(event),
            }
            self.wake_waiters();
        }
        debug!("preview driver stopped");
    }

    /// Apply one command. Returns `false` once the driver should stop.
    fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Submit(raw, resp) => {
                let token = self.session.begin_submit(&raw).map(|submission| {
                    let token = submission.token();
                    let classifier = self.classifier.clone();
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        let result = submission.classify(&*classifier).await;
                        let _ = tx.send(Event::Classified(result));
                    });
                    token
                });
                let _ = resp.send(token);
            }
            Command::SetZoom(zoom, resp) => {
                let _ = resp.send(self.session.set_zoom(zoom));
            }
            Command::ToggleOrientation(device, resp) => {
                let toggled = self.session.toggle_orientation(device);
                self.sync_frames();
                let _ = resp.send(toggled);
            }
            Command::SetOrientation(device, orientation, resp) => {
                let applied = self.session.set_orientation(device, orientation);
                self.sync_frames();
                let _ = resp.send(applied);
            }
            Command::Refresh(resp) => {
                let generation = self.session.refresh();
                self.sync_frames();
                let _ = resp.send(generation);
            }
            Command::Reset(resp) => {
                self.session.reset();
                self.sync_frames();
                let _ = resp.send(());
            }
            Command::Board(resp) => {
                let _ = resp.send(self.board());
            }
            Command::Settled(resp) => self.waiters.push(resp),
            Command::Close(resp) => {
                let _ = resp.send(());
                return false;
            }
        }
        true
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Classified(result) => {
                if self.session.complete_submit(result) {
                    self.sync_frames();
                }
            }
            Event::Resolved(job, outcome) => {
                self.frames.resolve(job.device, &job.key, outcome);
            }
        }
    }

    /// Rebuild frames whose key changed and spawn their snapshot fetches.
    /// The fetches run concurrently and are never cancelled; superseded
    /// results are filtered out when they come back.
    fn sync_frames(&mut self) {
        for job in self.frames.sync(self.session.state()) {
            let fetcher = self.fetcher.clone();
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                let outcome = fetcher.fetch(&job.url).await;
                let _ = tx.send(Event::Resolved(job, outcome));
            });
        }
    }

    fn is_settled(&self) -> bool {
        !self.session.state().is_classifying() && !self.frames.has_pending_snapshots()
    }

    fn wake_waiters(&mut self) {
        if self.waiters.is_empty() || !self.is_settled() {
            return;
        }
        let board = self.board();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(board.clone());
        }
    }

    fn board(&self) -> PreviewBoard {
        let state = self.session.state().clone();
        let zoom = state.zoom();
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                let profile = frame.device().profile();
                let orientation = frame.key().orientation;
                let metrics = profile.metrics(orientation);
                FrameReport {
                    device: profile.id,
                    name: profile.name,
                    size_label: profile.size_label(orientation),
                    scaled_width: metrics.width as f32 * zoom,
                    scaled_height: metrics.height as f32 * zoom,
                    metrics,
                    key: frame.key().clone(),
                    phase: frame.phase(),
                    render_state: frame.render_state(),
                    view: frame.view(),
                    image: frame.image().cloned(),
                }
            })
            .collect();
        PreviewBoard { state, frames }
    }
}
