use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::capture::{CameraDevice, CameraOpener, CaptureProfile, Frame};
use crate::error::CameraError;

type SharedCamera = Arc<Mutex<Option<Box<dyn CameraDevice>>>>;

/// Receiving ends of the worker's notifications.
#[derive(Clone)]
pub struct WorkerEvents {
    pub frames: Receiver<Frame>,
    pub errors: Receiver<String>,
}

/// Owns at most one open camera and the background loop that reads it.
///
/// The camera is present exactly while the worker is capturing. Every
/// access to it (open, read, release) happens under one mutex.
pub struct CameraWorker {
    opener: Arc<dyn CameraOpener>,
    profile: CaptureProfile,
    read_interval: Duration,
    camera: SharedCamera,
    /// Running flag of the current session. Each `start` gets a fresh flag
    /// so a loop from an earlier session can never resume.
    running: Arc<AtomicBool>,
    loop_thread: Option<thread::JoinHandle<()>>,
    active_loops: Arc<AtomicUsize>,
    frame_tx: Sender<Frame>,
    error_tx: Sender<String>,
    events: WorkerEvents,
}

impl CameraWorker {
    pub fn new(
        opener: Arc<dyn CameraOpener>,
        profile: CaptureProfile,
        read_interval: Duration,
    ) -> Self {
        // Display only needs the latest frame; older ones are dropped.
        let (frame_tx, frame_rx) = bounded(1);
        let (error_tx, error_rx) = unbounded();
        Self {
            opener,
            profile,
            read_interval,
            camera: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            loop_thread: None,
            active_loops: Arc::new(AtomicUsize::new(0)),
            frame_tx,
            error_tx,
            events: WorkerEvents {
                frames: frame_rx,
                errors: error_rx,
            },
        }
    }

    pub fn events(&self) -> WorkerEvents {
        self.events.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn has_camera(&self) -> bool {
        self.camera.lock().is_some()
    }

    /// Number of read loops still alive, including ones winding down.
    #[cfg(test)]
    pub fn active_loops(&self) -> usize {
        self.active_loops.load(Ordering::SeqCst)
    }

    /// Open the camera and launch the read loop. Failures are reported on
    /// the error channel and leave the worker idle.
    pub fn start(&mut self) {
        if self.is_capturing() {
            return;
        }

        // A loop from the previous session exits within one read interval.
        if let Some(stale) = self.loop_thread.take() {
            if stale.join().is_err() {
                tracing::error!("previous capture loop panicked");
            }
        }

        let running = Arc::new(AtomicBool::new(false));
        {
            let mut camera = self.camera.lock();
            match self.opener.open(&self.profile) {
                Ok(device) => {
                    *camera = Some(device);
                    running.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    tracing::warn!("camera start failed: {}", e);
                    let _ = self.error_tx.send(e.to_string());
                    return;
                }
            }
        }
        self.running = running.clone();

        let camera = self.camera.clone();
        let frame_tx = self.frame_tx.clone();
        let error_tx = self.error_tx.clone();
        let interval = self.read_interval;
        let active = self.active_loops.clone();
        active.fetch_add(1, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                capture_loop(&camera, &running, &frame_tx, &error_tx, interval);
                active.fetch_sub(1, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => {
                self.loop_thread = Some(handle);
                tracing::debug!("capture loop started");
            }
            Err(e) => {
                self.active_loops.fetch_sub(1, Ordering::SeqCst);
                self.stop();
                let _ = self
                    .error_tx
                    .send(format!("cannot start capture thread: {}", e));
            }
        }
    }

    /// Clear the running flag and release the camera. Safe in any state.
    ///
    /// Frames and errors the ended session already published are discarded,
    /// so nothing from it reaches the next session.
    pub fn stop(&mut self) {
        let mut camera = self.camera.lock();
        self.running.store(false, Ordering::SeqCst);
        if let Some(mut device) = camera.take() {
            device.release();
            tracing::debug!("capture stopped");
        }
        // The loop only publishes while holding the lock, so this is final.
        self.events.frames.try_iter().for_each(drop);
        self.events.errors.try_iter().for_each(drop);
    }

    /// Read one frame on the caller's thread, bypassing the published stream.
    pub fn read_frame_now(&self) -> Result<Frame, CameraError> {
        let mut camera = self.camera.lock();
        match camera.as_mut() {
            Some(device) => device.read_frame(),
            None => Err(CameraError::Unavailable),
        }
    }
}

impl Drop for CameraWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.loop_thread.take() {
            let _ = handle.join();
        }
    }
}

fn capture_loop(
    camera: &SharedCamera,
    running: &AtomicBool,
    frame_tx: &Sender<Frame>,
    error_tx: &Sender<String>,
    interval: Duration,
) {
    loop {
        {
            let mut guard = camera.lock();
            if !running.load(Ordering::SeqCst) {
                break;
            }
            let Some(device) = guard.as_mut() else {
                running.store(false, Ordering::SeqCst);
                break;
            };
            // Publish under the lock so `stop` never sees a send in flight.
            match device.read_frame() {
                Ok(frame) => {
                    let _ = frame_tx.try_send(frame);
                }
                Err(e) => {
                    // No retry: end the session so the handle/state invariant holds.
                    running.store(false, Ordering::SeqCst);
                    if let Some(mut device) = guard.take() {
                        device.release();
                    }
                    tracing::warn!("capture loop ended: {}", e);
                    let _ = error_tx.send(e.to_string());
                    break;
                }
            }
        }

        thread::sleep(interval);
    }
    tracing::debug!("capture loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedOpener;
    use std::time::Instant;

    const PROFILE: CaptureProfile = CaptureProfile {
        width: 320,
        height: 240,
        fps: 15,
    };

    fn worker(opener: &ScriptedOpener) -> CameraWorker {
        CameraWorker::new(Arc::new(opener.clone()), PROFILE, Duration::from_millis(5))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_handle_present_iff_capturing() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        let check = |w: &CameraWorker| assert_eq!(w.is_capturing(), w.has_camera());

        check(&worker);
        worker.start();
        check(&worker);
        assert!(worker.is_capturing());
        worker.start();
        check(&worker);
        worker.stop();
        check(&worker);
        assert!(!worker.is_capturing());
        worker.stop();
        check(&worker);
        worker.start();
        check(&worker);
        worker.stop();
        check(&worker);
        assert_eq!(opener.opens(), 2);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        worker.stop();
        worker.stop();
        assert!(!worker.is_capturing());
        assert_eq!(opener.releases(), 0);
        assert!(worker.events().errors.try_recv().is_err());
    }

    #[test]
    fn test_frames_are_published() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        let events = worker.events();
        worker.start();

        let frame = events
            .frames
            .recv_timeout(Duration::from_secs(2))
            .expect("a frame should arrive");
        assert_eq!(frame.pixels.len(), (frame.width * frame.height * 3) as usize);
        worker.stop();
    }

    #[test]
    fn test_open_failure_reports_and_stays_idle() {
        let opener = ScriptedOpener::new().failing_open();
        let mut worker = worker(&opener);
        let events = worker.events();
        worker.start();

        assert!(!worker.is_capturing());
        assert!(!worker.has_camera());
        assert_eq!(worker.active_loops(), 0);
        let msg = events.errors.try_recv().expect("error should be emitted");
        assert!(msg.contains("device unavailable"), "got: {}", msg);
    }

    #[test]
    fn test_read_failure_ends_session_without_retry() {
        let opener = ScriptedOpener::new().failing_after(2);
        let mut worker = worker(&opener);
        let events = worker.events();
        worker.start();

        let msg = events
            .errors
            .recv_timeout(Duration::from_secs(2))
            .expect("read failure should be reported");
        assert!(msg.contains("read failed"), "got: {}", msg);
        assert!(wait_until(|| worker.active_loops() == 0));
        assert!(!worker.is_capturing());
        assert!(!worker.has_camera());
        assert_eq!(opener.opens(), 1);
        assert_eq!(opener.releases(), 1);
    }

    #[test]
    fn test_restart_leaves_single_loop() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        worker.start();
        worker.stop();
        worker.start();
        worker.start();

        thread::sleep(Duration::from_millis(30));
        assert_eq!(worker.active_loops(), 1);
        worker.stop();
        assert!(wait_until(|| worker.active_loops() == 0));
    }

    #[test]
    fn test_stop_discards_published_frames() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        let events = worker.events();
        worker.start();

        assert!(wait_until(|| events.frames.len() == 1));
        worker.stop();
        assert!(events.frames.try_recv().is_err());
    }

    #[test]
    fn test_stop_discards_errors_of_ended_session() {
        let opener = ScriptedOpener::new().failing_after(1);
        let mut worker = worker(&opener);
        let events = worker.events();
        worker.start();

        assert!(wait_until(|| events.errors.len() == 1));
        worker.stop();
        assert!(events.errors.try_recv().is_err());
    }

    #[test]
    fn test_read_frame_now_requires_camera() {
        let opener = ScriptedOpener::new();
        let mut worker = worker(&opener);
        assert!(matches!(
            worker.read_frame_now(),
            Err(CameraError::Unavailable)
        ));
        worker.start();
        assert!(worker.read_frame_now().is_ok());
        worker.stop();
    }
}
