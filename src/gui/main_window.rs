use std::cell::RefCell;
use std::rc::Rc;

use crate::login::{HandOff, SignedIn};

/// Window shown once login succeeds.
pub struct MainWindow {
    greeting: String,
}

impl MainWindow {
    pub fn new(signed_in: &SignedIn) -> Self {
        let greeting = match signed_in {
            SignedIn::Account { username } => format!("Welcome, {}", username),
            SignedIn::Face => "Welcome, administrator".to_string(),
        };
        Self { greeting }
    }

    /// Draw the window. Returns true when the user asked to quit.
    pub fn show(&mut self, ctx: &egui::Context) -> bool {
        let mut quit = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(200.0);
                ui.heading(&self.greeting);
                ui.add_space(16.0);
                if ui.button("Quit").clicked() {
                    quit = true;
                }
            });
        });
        quit
    }
}

/// Hands the login result to the app, which swaps in the main window on
/// its next frame.
#[derive(Clone, Default)]
pub struct MainWindowSlot(Rc<RefCell<Option<MainWindow>>>);

impl MainWindowSlot {
    pub fn take(&self) -> Option<MainWindow> {
        self.0.borrow_mut().take()
    }
}

impl HandOff for MainWindowSlot {
    fn open_main_window(&mut self, signed_in: &SignedIn) -> anyhow::Result<()> {
        let mut slot = self
            .0
            .try_borrow_mut()
            .map_err(|e| anyhow::anyhow!("main window slot busy: {}", e))?;
        *slot = Some(MainWindow::new(signed_in));
        Ok(())
    }
}
