use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::display::{self, DisplayImage, DisplaySettings};
use crate::error::{LoginError, Notice};
use crate::face::FaceVerifier;
use crate::worker::{CameraWorker, WorkerEvents};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    AccountLogin,
    FaceLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Open,
    /// Login succeeded and the main window took over.
    HandedOff,
    /// Hand-off failed; the application must exit.
    QuitRequested,
}

/// Who got through the login window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedIn {
    Account { username: String },
    Face,
}

/// Credential check behind account login.
pub trait Authenticator {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Accepts any non-empty credentials.
pub struct AcceptAnyCredentials;

impl Authenticator for AcceptAnyCredentials {
    fn authenticate(&self, username: &str, _password: &str) -> bool {
        tracing::info!(username, "login attempt");
        true
    }
}

/// Builds and shows whatever comes after login.
pub trait HandOff {
    fn open_main_window(&mut self, signed_in: &SignedIn) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub temp_dir: PathBuf,
    pub capture_file: PathBuf,
    pub admin_face: PathBuf,
    pub jpeg_quality: u8,
    pub start_delay: Duration,
    pub display: DisplaySettings,
}

/// Deletes the capture file when dropped, whatever happened in between.
struct TempFileGuard<'a>(&'a Path);

impl Drop for TempFileGuard<'_> {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_file(self.0) {
                tracing::warn!("cannot remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Toolkit-independent state of the login window.
pub struct LoginWindow {
    mode: SessionMode,
    state: WindowState,
    worker: CameraWorker,
    events: WorkerEvents,
    verifier: Box<dyn FaceVerifier>,
    authenticator: Box<dyn Authenticator>,
    hand_off: Box<dyn HandOff>,
    settings: LoginSettings,
    pending_start: Option<Instant>,
    camera_view_visible: bool,
    live_frame: bool,
    notices: VecDeque<Notice>,
}

impl LoginWindow {
    pub fn new(
        settings: LoginSettings,
        worker: CameraWorker,
        verifier: Box<dyn FaceVerifier>,
        authenticator: Box<dyn Authenticator>,
        hand_off: Box<dyn HandOff>,
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(&settings.temp_dir)
            .with_context(|| format!("Cannot create {}", settings.temp_dir.display()))?;

        let events = worker.events();
        let mut window = Self {
            mode: SessionMode::AccountLogin,
            state: WindowState::Open,
            worker,
            events,
            verifier,
            authenticator,
            hand_off,
            settings,
            pending_start: None,
            camera_view_visible: false,
            live_frame: false,
            notices: VecDeque::new(),
        };
        window.set_account_mode();
        Ok(window)
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn worker(&self) -> &CameraWorker {
        &self.worker
    }

    pub fn camera_view_visible(&self) -> bool {
        self.camera_view_visible
    }

    /// False until the first frame of the current face session is rendered.
    pub fn showing_live_frame(&self) -> bool {
        self.live_frame
    }

    pub fn placeholder(&self) -> DisplayImage {
        display::placeholder(&self.settings.display)
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    pub fn set_account_mode(&mut self) {
        self.worker.stop();
        self.pending_start = None;
        self.mode = SessionMode::AccountLogin;
        self.camera_view_visible = false;
        self.live_frame = false;
    }

    /// Switch to face login. The camera opens on the first `tick` after the
    /// start delay has passed.
    pub fn set_face_mode(&mut self, now: Instant) {
        self.worker.stop();
        self.mode = SessionMode::FaceLogin;
        self.camera_view_visible = true;
        self.live_frame = false;
        self.pending_start = Some(now + self.settings.start_delay);
    }

    /// Run the deferred camera start and drain worker notifications.
    /// Returns the newest rendered frame, if one arrived.
    pub fn tick(&mut self, now: Instant) -> Option<DisplayImage> {
        if let Some(due) = self.pending_start {
            if now >= due {
                self.pending_start = None;
                if self.mode == SessionMode::FaceLogin && self.state == WindowState::Open {
                    self.worker.start();
                }
            }
        }

        let mut rendered = None;
        if let Some(frame) = self.events.frames.try_iter().last() {
            if self.mode == SessionMode::FaceLogin {
                match display::render_frame(&frame, &self.settings.display) {
                    Ok(image) => {
                        self.live_frame = true;
                        rendered = Some(image);
                    }
                    Err(e) => tracing::error!("frame update failed: {}", e),
                }
            }
        }

        let errors: Vec<String> = self.events.errors.try_iter().collect();
        for message in errors {
            self.notices.push_back(Notice::warning("Camera error", message));
            self.set_account_mode();
        }

        rendered
    }

    pub fn handle_login(&mut self, username: &str, password: &str) {
        match self.mode {
            SessionMode::AccountLogin => self.account_login(username, password),
            SessionMode::FaceLogin => self.capture_and_login(),
        }
    }

    pub fn account_login(&mut self, username: &str, password: &str) {
        match self.check_credentials(username, password) {
            Ok(()) => self.open_main_window(SignedIn::Account {
                username: username.to_string(),
            }),
            Err(e) => self.report(e),
        }
    }

    pub fn capture_and_login(&mut self) {
        let outcome = {
            let _cleanup = TempFileGuard(&self.settings.capture_file);
            self.verify_face()
        };
        match outcome {
            Ok(()) => self.open_main_window(SignedIn::Face),
            Err(e) => self.report(e),
        }
    }

    /// Stop the camera and release everything before the window goes away.
    pub fn close(&mut self) {
        self.pending_start = None;
        self.worker.stop();
    }

    fn check_credentials(&self, username: &str, password: &str) -> Result<(), LoginError> {
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }
        if self.authenticator.authenticate(username, password) {
            Ok(())
        } else {
            Err(LoginError::Rejected)
        }
    }

    fn verify_face(&self) -> Result<(), LoginError> {
        let frame = self.worker.read_frame_now()?;
        let capture = &self.settings.capture_file;
        frame
            .save_jpeg(capture, self.settings.jpeg_quality)
            .map_err(LoginError::Unexpected)?;

        self.verifier.validate(capture)?;

        let reference = &self.settings.admin_face;
        if !reference.exists() {
            return Err(LoginError::MissingReference(reference.clone()));
        }

        if self
            .verifier
            .compare(reference, capture)
            .map_err(LoginError::Unexpected)?
        {
            Ok(())
        } else {
            Err(LoginError::FaceMismatch)
        }
    }

    fn report(&mut self, error: LoginError) {
        match &error {
            LoginError::Unexpected(e) => tracing::error!("login error: {:#}", e),
            LoginError::MissingReference(_) => tracing::error!("{}", error),
            _ => tracing::warn!("login rejected: {}", error),
        }
        self.notices.push_back(error.notice());
        if error.is_device() {
            self.set_account_mode();
        }
    }

    fn open_main_window(&mut self, signed_in: SignedIn) {
        self.close();
        match self.hand_off.open_main_window(&signed_in) {
            Ok(()) => {
                tracing::info!(?signed_in, "login succeeded");
                self.camera_view_visible = false;
                self.state = WindowState::HandedOff;
            }
            Err(e) => {
                tracing::error!("cannot open main window: {:#}", e);
                self.state = WindowState::QuitRequested;
            }
        }
    }
}
