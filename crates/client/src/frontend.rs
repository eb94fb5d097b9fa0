use std::io;
use std::time::{Duration, Instant};

use ridgeline::{EntityState, MovementInput, MovementState};

use crate::net::LinkStatus;

const HEADLESS_REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub movement: MovementInput,
    pub quit: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LinkView {
    pub status: LinkStatus,
    pub snapshots_received: u64,
    /// Snapshots that arrived after a newer one.
    pub stale_dropped: u64,
}

/// Everything a frontend may show for one frame.
pub struct FrameView<'a> {
    pub frame: u64,
    pub local: &'a MovementState,
    pub remotes: &'a [EntityState],
    /// `None` when playing without a server.
    pub link: Option<LinkView>,
    pub fps: f32,
    pub snapshot_rate: f32,
}

pub trait Frontend {
    fn poll_input(&mut self, now: Instant) -> io::Result<FrameInput>;

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()>;
}

/// No terminal. Input is always idle and frames are reported through the log.
pub struct HeadlessFrontend {
    last_report: Option<Instant>,
}

impl Default for HeadlessFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessFrontend {
    pub fn new() -> Self {
        Self { last_report: None }
    }
}

impl Frontend for HeadlessFrontend {
    fn poll_input(&mut self, _now: Instant) -> io::Result<FrameInput> {
        Ok(FrameInput::default())
    }

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()> {
        let now = Instant::now();
        let due = self
            .last_report
            .is_none_or(|at| now.saturating_duration_since(at) >= HEADLESS_REPORT_INTERVAL);

        let p = view.local.position;
        let link = view.link.map_or("offline", |l| l.status.as_str());
        let stale = view.link.map_or(0, |l| l.stale_dropped);
        if due {
            self.last_report = Some(now);
            log::info!(
                "frame {} pos ({:.2}, {:.2}, {:.2}) grounded={} remotes={} link={} stale={} fps={:.0}",
                view.frame,
                p.x,
                p.y,
                p.z,
                view.local.grounded,
                view.remotes.len(),
                link,
                stale,
                view.fps
            );
        } else {
            log::debug!(
                "frame {} pos ({:.2}, {:.2}, {:.2})",
                view.frame,
                p.x,
                p.y,
                p.z
            );
        }

        Ok(())
    }
}
