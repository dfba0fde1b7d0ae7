use std::time::Instant;

use crate::error::Severity;
use crate::login::SessionMode;

use super::app::LoginApp;

const ACTIVE_TAB: egui::Color32 = egui::Color32::from_rgb(85, 170, 127);
const INACTIVE_TAB: egui::Color32 = egui::Color32::from_rgb(0, 170, 127);
const LOGIN_BOX: egui::Color32 = egui::Color32::from_rgba_premultiplied(110, 110, 110, 128);
const VIEW_SIZE: egui::Vec2 = egui::vec2(340.0, 180.0);

fn tab_button(label: &str, active: bool) -> egui::Button<'static> {
    egui::Button::new(egui::RichText::new(label).size(14.0).color(egui::Color32::WHITE))
        .fill(if active { ACTIVE_TAB } else { INACTIVE_TAB })
        .stroke(egui::Stroke::NONE)
        .corner_radius(15.0)
        .min_size(egui::vec2(120.0, 30.0))
}

pub fn login_panel(ctx: &egui::Context, app: &mut LoginApp) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.columns(2, |cols| {
            cols[0].vertical_centered(|ui| {
                ui.add_space(220.0);
                ui.heading("Welcome");
                ui.label("Sign in with your account or your face");
            });

            cols[1].vertical_centered(|ui| {
                ui.add_space(100.0);
                egui::Frame::new()
                    .fill(LOGIN_BOX)
                    .corner_radius(20.0)
                    .inner_margin(24.0)
                    .show(ui, |ui| {
                        ui.set_width(420.0);
                        login_box(ui, app);
                    });
            });
        });
    });
}

fn login_box(ui: &mut egui::Ui, app: &mut LoginApp) {
    let mode = app.login.mode();

    ui.horizontal(|ui| {
        if ui
            .add(tab_button("Account login", mode == SessionMode::AccountLogin))
            .clicked()
        {
            app.login.set_account_mode();
        }
        if ui
            .add(tab_button("Face login", mode == SessionMode::FaceLogin))
            .clicked()
        {
            app.login.set_face_mode(Instant::now());
        }
    });
    ui.add_space(16.0);

    let mut submit = false;
    if app.login.camera_view_visible() {
        let live = app.login.showing_live_frame();
        let ctx = ui.ctx().clone();
        let tex = app.camera_view_texture(&ctx);
        let response = ui.image(egui::load::SizedTexture::new(tex.id(), VIEW_SIZE));
        if !live {
            ui.painter().text(
                response.rect.center(),
                egui::Align2::CENTER_CENTER,
                "Camera initializing...",
                egui::FontId::proportional(14.0),
                egui::Color32::DARK_GRAY,
            );
        }
    } else {
        ui.add(
            egui::TextEdit::singleline(&mut app.username)
                .hint_text("Username")
                .desired_width(340.0),
        );
        ui.add_space(8.0);
        let password = ui.add(
            egui::TextEdit::singleline(&mut app.password)
                .password(true)
                .hint_text("Password")
                .desired_width(340.0),
        );
        if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submit = true;
        }
    }

    ui.add_space(16.0);
    if ui
        .add(egui::Button::new("Log in").min_size(egui::vec2(340.0, 32.0)))
        .clicked()
    {
        submit = true;
    }

    if submit {
        app.submit_login();
    }
}

pub fn notice_modal(ctx: &egui::Context, app: &mut LoginApp) {
    let Some(notice) = app.login.current_notice().cloned() else {
        return;
    };

    let modal = egui::Modal::new(egui::Id::new("login-notice")).show(ctx, |ui| {
        ui.set_width(320.0);
        let color = match notice.severity {
            Severity::Warning => egui::Color32::from_rgb(255, 200, 0),
            Severity::Critical => egui::Color32::from_rgb(220, 40, 40),
        };
        ui.colored_label(color, egui::RichText::new(&notice.title).strong());
        ui.add_space(8.0);
        ui.label(&notice.message);
        ui.add_space(12.0);
        ui.button("OK").clicked()
    });

    if modal.inner || modal.should_close() {
        app.login.dismiss_notice();
    }
}

pub fn status_bar(ctx: &egui::Context, app: &LoginApp) {
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let mode = match app.login.mode() {
                SessionMode::AccountLogin => "Mode: Account",
                SessionMode::FaceLogin => "Mode: Face",
            };
            ui.label(mode);
            ui.separator();
            let camera = if app.login.worker().is_capturing() {
                "Camera: Active"
            } else {
                "Camera: Off"
            };
            ui.label(camera);
        });
    });
}
