use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::thread;

use anyhow::Context;
use crossbeam_channel::{bounded, Sender};
use image::codecs::jpeg::JpegEncoder;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use crate::error::CameraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Rgb,
    Bgr,
}

/// One decoded camera image, 3 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub order: PixelOrder,
}

impl Frame {
    pub fn to_rgb(&self) -> Vec<u8> {
        match self.order {
            PixelOrder::Rgb => self.pixels.clone(),
            PixelOrder::Bgr => self
                .pixels
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        }
    }

    /// Encode as JPEG at `quality` (1-100), creating the parent directory if needed.
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let file = fs::File::create(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
        encoder
            .encode(
                &self.to_rgb(),
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .with_context(|| format!("cannot encode {}", path.display()))?;
        Ok(())
    }
}

/// Fixed capture profile requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// An open camera. Dropping or releasing it frees the device.
pub trait CameraDevice: Send {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
    fn release(&mut self);
}

/// Opens camera devices on demand; backend selection lives behind this.
pub trait CameraOpener: Send + Sync {
    fn open(&self, profile: &CaptureProfile) -> Result<Box<dyn CameraDevice>, CameraError>;
}

pub fn requested_format(profile: &CaptureProfile) -> RequestedFormat<'static> {
    let fmt_type = RequestedFormatType::Closest(CameraFormat::new(
        Resolution::new(profile.width, profile.height),
        FrameFormat::MJPEG,
        profile.fps,
    ));
    RequestedFormat::new::<RgbFormat>(fmt_type)
}

fn open_camera(device_index: u32, profile: &CaptureProfile) -> Result<Camera, CameraError> {
    let index = CameraIndex::Index(device_index);
    let mut camera = Camera::new(index, requested_format(profile)).map_err(|e| match e {
        nokhwa::NokhwaError::OpenDeviceError(ref s, _) => CameraError::Open(format!(
            "cannot open camera index {}: {}. Check that a webcam is connected and you have permission to access it",
            device_index, s
        )),
        _ => CameraError::Open(format!("camera index {}: {}", device_index, e)),
    })?;
    camera
        .open_stream()
        .map_err(|e| CameraError::Open(format!("failed to start camera stream: {}", e)))?;
    Ok(camera)
}

fn grab_frame(camera: &mut Camera) -> Result<Frame, CameraError> {
    let buffer = camera
        .frame()
        .map_err(|e| CameraError::Read(format!("frame capture failed: {}", e)))?;
    let image = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CameraError::Read(format!("frame decode failed: {}", e)))?;
    let (width, height) = (image.width(), image.height());
    Ok(Frame {
        pixels: image.into_raw(),
        width,
        height,
        order: PixelOrder::Rgb,
    })
}

enum DeviceRequest {
    Frame(Sender<Result<Frame, CameraError>>),
    Close,
}

/// Webcam backed by nokhwa.
///
/// nokhwa's `Camera` cannot leave the thread that opened it, so the device
/// lives on its own thread and is driven through a request channel. The
/// handle itself is `Send` and can sit behind the worker's mutex.
pub struct WebcamCapture {
    requests: Sender<DeviceRequest>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WebcamCapture {
    pub fn open(device_index: u32, profile: &CaptureProfile) -> Result<Self, CameraError> {
        let (request_tx, request_rx) = bounded::<DeviceRequest>(1);
        let (ready_tx, ready_rx) = bounded(1);
        let profile = *profile;

        let handle = thread::Builder::new()
            .name("camera-device".into())
            .spawn(move || {
                let mut camera = match open_camera(device_index, &profile) {
                    Ok(camera) => {
                        let _ = ready_tx.send(Ok(()));
                        camera
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let format = camera.camera_format();
                tracing::info!(
                    index = device_index,
                    width = format.resolution().width_x,
                    height = format.resolution().height_y,
                    fps = format.frame_rate(),
                    "camera opened"
                );

                while let Ok(request) = request_rx.recv() {
                    match request {
                        DeviceRequest::Frame(reply) => {
                            let _ = reply.send(grab_frame(&mut camera));
                        }
                        DeviceRequest::Close => break,
                    }
                }
                let _ = camera.stop_stream();
                tracing::info!(index = device_index, "camera released");
            })
            .map_err(|e| CameraError::Open(format!("cannot spawn camera thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                requests: request_tx,
                thread: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraError::Open("camera thread exited during open".into()))
            }
        }
    }
}

impl CameraDevice for WebcamCapture {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.requests
            .send(DeviceRequest::Frame(reply_tx))
            .map_err(|_| CameraError::Read("camera thread is gone".into()))?;
        reply_rx
            .recv()
            .map_err(|_| CameraError::Read("camera thread is gone".into()))?
    }

    fn release(&mut self) {
        let _ = self.requests.send(DeviceRequest::Close);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct WebcamOpener {
    device_index: u32,
}

impl WebcamOpener {
    pub fn new(device_index: u32) -> Self {
        Self { device_index }
    }
}

impl CameraOpener for WebcamOpener {
    fn open(&self, profile: &CaptureProfile) -> Result<Box<dyn CameraDevice>, CameraError> {
        Ok(Box::new(WebcamCapture::open(self.device_index, profile)?))
    }
}

/// Open and immediately close the camera on a detached thread so the driver
/// is loaded by the time the user switches to face login.
pub fn warm_up(device_index: u32, profile: CaptureProfile) {
    let spawned = thread::Builder::new()
        .name("camera-warmup".into())
        .spawn(move || match Camera::new(CameraIndex::Index(device_index), requested_format(&profile)) {
            Ok(camera) => {
                drop(camera);
                tracing::debug!(index = device_index, "camera driver preloaded");
            }
            Err(e) => tracing::debug!(index = device_index, "camera preload failed: {}", e),
        });
    if let Err(e) = spawned {
        tracing::debug!("cannot spawn camera warm-up thread: {}", e);
    }
}

#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: String,
    pub name: String,
    pub description: String,
}

pub fn list_cameras() -> anyhow::Result<Vec<CameraInfo>> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| anyhow::anyhow!("Cannot enumerate cameras: {}", e))?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraInfo {
            index: info.index().to_string(),
            name: info.human_name(),
            description: info.description().to_string(),
        })
        .collect())
}
