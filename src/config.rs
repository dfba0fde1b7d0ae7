use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::capture::CaptureProfile;
use crate::display::DisplaySettings;
use crate::login::LoginSettings;

/// Low-resolution profile keeps reads cheap; the view is only 340x180.
pub const CAPTURE_PROFILE: CaptureProfile = CaptureProfile {
    width: 320,
    height: 240,
    fps: 15,
};
/// Pause between reads, capping the loop at about 30 reads per second.
pub const READ_INTERVAL: Duration = Duration::from_millis(33);
/// Delay between entering face mode and opening the camera.
pub const START_DELAY: Duration = Duration::from_millis(100);
pub const JPEG_QUALITY: u8 = 90;
pub const WINDOW_SIZE: [f32; 2] = [1200.0, 600.0];
pub const BORDER_GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };

#[derive(Parser, Debug)]
#[command(
    name = "face-login",
    about = "Desktop login window with webcam face verification",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<SubCommand>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// Print the scalar data-types walkthrough
    Types,
    /// List cameras reported by the capture backend
    Cameras,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Webcam device index
    #[arg(short = 'i', long, default_value_t = 0)]
    pub camera_index: u32,

    /// Directory for the temporary capture file (created if absent)
    #[arg(long, default_value = "temp")]
    pub temp_dir: PathBuf,

    /// Enrolled administrator face image
    #[arg(long, default_value = "source/faces/admin.jpg")]
    pub admin_face: PathBuf,

    /// Minimum similarity for a face match (-1.0 to 1.0)
    #[arg(short = 't', long, default_value_t = 0.80)]
    pub threshold: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug)]
pub struct AppConfig {
    pub camera_index: u32,
    pub capture: CaptureProfile,
    pub read_interval: Duration,
    pub start_delay: Duration,
    pub jpeg_quality: u8,
    pub temp_dir: PathBuf,
    pub capture_file: PathBuf,
    pub admin_face: PathBuf,
    pub match_threshold: f32,
    pub display: DisplaySettings,
    pub window_size: [f32; 2],
}

impl AppConfig {
    pub fn from_cli(args: RunArgs) -> anyhow::Result<Self> {
        if !(-1.0..=1.0).contains(&args.threshold) {
            return Err(anyhow::anyhow!(
                "Invalid threshold {}. Similarity ranges from -1.0 to 1.0",
                args.threshold
            ));
        }

        Ok(AppConfig {
            camera_index: args.camera_index,
            capture: CAPTURE_PROFILE,
            read_interval: READ_INTERVAL,
            start_delay: START_DELAY,
            jpeg_quality: JPEG_QUALITY,
            capture_file: args.temp_dir.join("temp_capture.jpg"),
            temp_dir: args.temp_dir,
            admin_face: args.admin_face,
            match_threshold: args.threshold,
            display: DisplaySettings {
                width: 340,
                height: 180,
                border_width: 3,
                border_color: BORDER_GREEN,
            },
            window_size: WINDOW_SIZE,
        })
    }

    pub fn login_settings(&self) -> LoginSettings {
        LoginSettings {
            temp_dir: self.temp_dir.clone(),
            capture_file: self.capture_file.clone(),
            admin_face: self.admin_face.clone(),
            jpeg_quality: self.jpeg_quality,
            start_delay: self.start_delay,
            display: self.display,
        }
    }
}
