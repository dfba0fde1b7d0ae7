use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::WebcamOpener;
use crate::config::AppConfig;
use crate::display::DisplayImage;
use crate::face::ThumbnailVerifier;
use crate::login::{AcceptAnyCredentials, LoginWindow, SessionMode, WindowState};
use crate::worker::CameraWorker;

use super::main_window::{MainWindow, MainWindowSlot};
use super::panels;

pub struct LoginApp {
    pub login: LoginWindow,
    pub username: String,
    pub password: String,
    pub camera_texture: Option<egui::TextureHandle>,
    pub placeholder: DisplayImage,
    pub placeholder_texture: Option<egui::TextureHandle>,
    main_window_slot: MainWindowSlot,
    main_window: Option<MainWindow>,
}

impl LoginApp {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let worker = CameraWorker::new(
            Arc::new(WebcamOpener::new(config.camera_index)),
            config.capture,
            config.read_interval,
        );
        let slot = MainWindowSlot::default();
        let login = LoginWindow::new(
            config.login_settings(),
            worker,
            Box::new(ThumbnailVerifier::new(config.match_threshold)),
            Box::new(AcceptAnyCredentials),
            Box::new(slot.clone()),
        )?;
        let placeholder = login.placeholder();

        Ok(Self {
            login,
            username: String::new(),
            password: String::new(),
            camera_texture: None,
            placeholder,
            placeholder_texture: None,
            main_window_slot: slot,
            main_window: None,
        })
    }

    fn upload_frame(&mut self, ctx: &egui::Context, image: DisplayImage) {
        let image =
            egui::ColorImage::from_rgb([image.width as usize, image.height as usize], &image.rgb);
        match &mut self.camera_texture {
            Some(tex) => tex.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.camera_texture =
                    Some(ctx.load_texture("camera-view", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    /// Texture for the camera view: the live frame once one arrived,
    /// otherwise the placeholder.
    pub fn camera_view_texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        if self.login.showing_live_frame() {
            if let Some(ref tex) = self.camera_texture {
                return tex;
            }
        }
        let placeholder = &self.placeholder;
        self.placeholder_texture.get_or_insert_with(|| {
            let image = egui::ColorImage::from_rgb(
                [placeholder.width as usize, placeholder.height as usize],
                &placeholder.rgb,
            );
            ctx.load_texture("camera-placeholder", image, egui::TextureOptions::LINEAR)
        })
    }

    pub fn submit_login(&mut self) {
        self.login.handle_login(self.username.trim(), &self.password);
        if self.login.state() == WindowState::HandedOff {
            self.password.clear();
        }
    }
}

impl eframe::App for LoginApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(main_window) = self.main_window.as_mut() {
            if main_window.show(ctx) {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            return;
        }

        if let Some(image) = self.login.tick(Instant::now()) {
            self.upload_frame(ctx, image);
        }

        panels::status_bar(ctx, self);
        panels::login_panel(ctx, self);
        panels::notice_modal(ctx, self);

        match self.login.state() {
            WindowState::Open => {}
            WindowState::HandedOff => {
                self.main_window = self.main_window_slot.take();
                self.camera_texture = None;
                ctx.send_viewport_cmd(egui::ViewportCommand::Title("Main".into()));
                ctx.request_repaint();
            }
            WindowState::QuitRequested => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        // Keep polling the worker while the camera view is up
        if self.login.mode() == SessionMode::FaceLogin {
            ctx.request_repaint_after(Duration::from_millis(15));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.login.close();
    }
}
