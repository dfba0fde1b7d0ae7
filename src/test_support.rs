//! In-memory stand-ins for the camera and the login collaborators.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::{CameraDevice, CameraOpener, CaptureProfile, Frame, PixelOrder};
use crate::error::{CameraError, ValidationError};
use crate::face::FaceVerifier;
use crate::login::{HandOff, SignedIn};

/// Ordered record of side effects shared between fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = ((x * 255) / width.max(1)) as u8;
            pixels.extend_from_slice(&[v, (y % 256) as u8, 255 - v]);
        }
    }
    Frame {
        pixels,
        width,
        height,
        order: PixelOrder::Rgb,
    }
}

#[derive(Clone, Default)]
pub struct ScriptedOpener {
    fail_open: bool,
    fail_after: Option<usize>,
    short_frames: bool,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    log: EventLog,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every camera opened from here on serves `reads` frames, then fails.
    pub fn failing_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    /// Cameras opened from here on serve frames whose buffer is too short.
    pub fn short_frames(mut self) -> Self {
        self.short_frames = true;
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl CameraOpener for ScriptedOpener {
    fn open(&self, _profile: &CaptureProfile) -> Result<Box<dyn CameraDevice>, CameraError> {
        if self.fail_open {
            return Err(CameraError::Open("no camera attached".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("camera-open".into());
        Ok(Box::new(ScriptedCamera {
            reads: 0,
            fail_after: self.fail_after,
            short_frames: self.short_frames,
            releases: self.releases.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedCamera {
    reads: usize,
    fail_after: Option<usize>,
    short_frames: bool,
    releases: Arc<AtomicUsize>,
    log: EventLog,
}

impl CameraDevice for ScriptedCamera {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if self.fail_after.is_some_and(|limit| self.reads >= limit) {
            return Err(CameraError::Read("device unplugged".into()));
        }
        self.reads += 1;
        let mut frame = gradient_frame(64, 48);
        if self.short_frames {
            frame.pixels.truncate(frame.pixels.len() / 2);
        }
        Ok(frame)
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("camera-release".into());
    }
}

#[derive(Clone, Copy)]
pub enum CompareOutcome {
    Match,
    NoMatch,
    Fail,
}

/// Verifier that records calls and whether the capture file existed when called.
#[derive(Clone)]
pub struct RecordingVerifier {
    pub reject: bool,
    pub outcome: CompareOutcome,
    pub validate_calls: Arc<AtomicUsize>,
    pub compare_calls: Arc<AtomicUsize>,
    pub capture_seen: Arc<AtomicUsize>,
}

impl RecordingVerifier {
    pub fn new(outcome: CompareOutcome) -> Self {
        Self {
            reject: false,
            outcome,
            validate_calls: Arc::default(),
            compare_calls: Arc::default(),
            capture_seen: Arc::default(),
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

impl FaceVerifier for RecordingVerifier {
    fn validate(&self, image: &Path) -> Result<(), ValidationError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if image.exists() {
            self.capture_seen.fetch_add(1, Ordering::SeqCst);
        }
        if self.reject {
            return Err(ValidationError::NoDetail);
        }
        Ok(())
    }

    fn compare(&self, _reference: &Path, _candidate: &Path) -> anyhow::Result<bool> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            CompareOutcome::Match => Ok(true),
            CompareOutcome::NoMatch => Ok(false),
            CompareOutcome::Fail => Err(anyhow::anyhow!("comparator crashed")),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingHandOff {
    pub fail: bool,
    pub calls: Arc<Mutex<Vec<SignedIn>>>,
    pub log: EventLog,
}

impl RecordingHandOff {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl HandOff for RecordingHandOff {
    fn open_main_window(&mut self, signed_in: &SignedIn) -> anyhow::Result<()> {
        self.log.lock().push("hand-off".into());
        self.calls.lock().push(signed_in.clone());
        if self.fail {
            anyhow::bail!("main window failed to build");
        }
        Ok(())
    }
}
