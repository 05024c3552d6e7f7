mod api;
mod app;
mod batches;
mod codec;
mod session;
mod storage;
mod tracking;
mod ui;
mod utils;
mod validation;

use adw::prelude::*;
use adw::Application;

fn main() {
    let app = Application::builder()
        .application_id("com.example.OutreachGtk")
        .build();
    app.connect_activate(|app| {
        crate::app::build_ui(app);
    });
    app.run();
}
