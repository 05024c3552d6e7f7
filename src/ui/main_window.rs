use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use std::rc::Rc;

use crate::app::AppState;
use crate::session::Step;
use crate::storage::Store;
use crate::ui::results_view::ResultsView;
use crate::ui::template_view::TemplateView;
use crate::ui::tracking_view;
use crate::ui::upload_view::UploadView;
use crate::ui::Ctx;

struct Shell {
    window: adw::ApplicationWindow,
    stack: gtk::Stack,
    step_labels: Vec<gtk::Label>,
    tracking_summary: gtk::Label,
    status_counts: Vec<(crate::tracking::Status, gtk::Label)>,
}

impl Shell {
    fn go_to_step(&self, ctx: &Rc<Ctx>, step: Step) {
        ctx.session.borrow_mut().step = step;
        let page = match step {
            Step::Upload => "upload",
            Step::Templates => "templates",
            Step::Results => "results",
        };
        self.stack.set_visible_child_name(page);
        for (i, label) in self.step_labels.iter().enumerate() {
            if i as u8 + 1 == step.number() {
                label.remove_css_class("dim-label");
                label.add_css_class("heading");
            } else {
                label.remove_css_class("heading");
                label.add_css_class("dim-label");
            }
        }
    }

    fn refresh_tracking_bar(&self, ctx: &Rc<Ctx>) {
        let stats = ctx.ledger().stats();
        let plural = if stats.total == 1 { "" } else { "s" };
        self.tracking_summary
            .set_label(&format!("{} tracked contact{plural}", stats.total));
        for (status, label) in &self.status_counts {
            let count = match status {
                crate::tracking::Status::Pending => stats.pending,
                crate::tracking::Status::Responded => stats.responded,
                crate::tracking::Status::Signed => stats.signed,
                crate::tracking::Status::Declined => stats.declined,
            };
            label.set_label(&format!("{}: {count}", status.label()));
        }
    }
}

pub fn show_main_window(app: &Application, state: AppState, store: Store) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Outreach")
        .default_width(980)
        .default_height(720)
        .build();

    let overlay = adw::ToastOverlay::new();
    let ctx = Ctx::new(state, store, overlay.clone());

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("Outreach"));
    header.set_title_widget(Some(&title));

    let theme_btn = gtk::Button::from_icon_name("weather-clear-night-symbolic");
    theme_btn.set_tooltip_text(Some("Toggle dark mode"));
    header.pack_end(&theme_btn);
    let server_btn = gtk::Button::from_icon_name("network-server-symbolic");
    server_btn.set_tooltip_text(Some("Server settings"));
    header.pack_end(&server_btn);
    container.append(&header);

    // Stepper
    let stepper = gtk::Box::new(gtk::Orientation::Horizontal, 16);
    stepper.set_halign(gtk::Align::Center);
    stepper.set_margin_top(8);
    let mut step_labels = Vec::new();
    for text in ["1 · Upload", "2 · Template", "3 · Results"] {
        let label = gtk::Label::new(Some(text));
        label.add_css_class("dim-label");
        stepper.append(&label);
        step_labels.push(label);
    }

    let content = gtk::Box::new(gtk::Orientation::Vertical, 0);
    content.append(&stepper);

    let stack = gtk::Stack::new();
    stack.set_transition_type(gtk::StackTransitionType::Crossfade);
    stack.set_vexpand(true);

    let upload = UploadView::new(ctx.clone());
    let template = TemplateView::new(ctx.clone());
    let results = ResultsView::new(ctx.clone());
    stack.add_named(&upload.widget(), Some("upload"));
    stack.add_named(&template.widget(), Some("templates"));
    stack.add_named(&results.widget(), Some("results"));
    content.append(&stack);

    // Tracking bar
    let tracking_bar = gtk::Box::new(gtk::Orientation::Horizontal, 12);
    tracking_bar.set_margin_top(6);
    tracking_bar.set_margin_bottom(6);
    tracking_bar.set_margin_start(12);
    tracking_bar.set_margin_end(12);
    let tracking_summary = gtk::Label::new(None);
    tracking_summary.add_css_class("heading");
    tracking_bar.append(&tracking_summary);
    let mut status_counts = Vec::new();
    for status in crate::tracking::Status::ALL {
        let label = gtk::Label::new(None);
        label.add_css_class("caption");
        tracking_bar.append(&label);
        status_counts.push((status, label));
    }
    let bar_spacer = gtk::Box::new(gtk::Orientation::Horizontal, 0);
    bar_spacer.set_hexpand(true);
    tracking_bar.append(&bar_spacer);
    let view_tracking_btn = gtk::Button::with_label("Tracking");
    tracking_bar.append(&view_tracking_btn);
    let dashboard_btn = gtk::Button::with_label("Dashboard");
    tracking_bar.append(&dashboard_btn);
    let export_btn = gtk::Button::with_label("Export");
    tracking_bar.append(&export_btn);
    let clear_btn = gtk::Button::with_label("Clear");
    clear_btn.add_css_class("destructive-action");
    tracking_bar.append(&clear_btn);
    content.append(&tracking_bar);

    overlay.set_child(Some(&content));
    container.append(&overlay);
    window.set_content(Some(&container));

    let shell = Rc::new(Shell {
        window: window.clone(),
        stack,
        step_labels,
        tracking_summary,
        status_counts,
    });

    // Wizard transitions
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        let template = template.clone();
        upload.set_on_complete(move || {
            template.refresh_contacts(&ctx);
            template.refresh_templates(&ctx);
            shell.go_to_step(&ctx, Step::Templates);
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        template.back_btn.connect_clicked(move |_| {
            shell.go_to_step(&ctx, Step::Upload);
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        let results = results.clone();
        template.set_on_complete(move || {
            results.refresh(&ctx);
            shell.refresh_tracking_bar(&ctx);
            shell.go_to_step(&ctx, Step::Results);
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        results.back_btn.connect_clicked(move |_| {
            shell.go_to_step(&ctx, Step::Templates);
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        let template = template.clone();
        let results_for_reset = results.clone();
        results.start_over_btn.connect_clicked(move |_| {
            ctx.session.borrow_mut().reset(&ctx.store);
            results_for_reset.clear_filters();
            results_for_reset.refresh(&ctx);
            template.refresh_contacts(&ctx);
            shell.go_to_step(&ctx, Step::Upload);
            ctx.toast("Ready for a new batch!");
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        results.set_on_status_changed(move || {
            shell.refresh_tracking_bar(&ctx);
        });
    }

    // Tracking bar actions
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        let results = results.clone();
        view_tracking_btn.connect_clicked(move |_| {
            let on_changed: Rc<dyn Fn()> = {
                let ctx = ctx.clone();
                let shell = shell.clone();
                let results = results.clone();
                Rc::new(move || {
                    shell.refresh_tracking_bar(&ctx);
                    results.refresh(&ctx);
                })
            };
            tracking_view::open_tracking_window(&ctx, shell.window.upcast_ref(), on_changed);
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        dashboard_btn.connect_clicked(move |_| {
            tracking_view::open_dashboard_window(&ctx, shell.window.upcast_ref());
        });
    }
    {
        let ctx = ctx.clone();
        export_btn.connect_clicked(move |_| {
            let ledger = ctx.ledger();
            if ledger.is_empty() {
                ctx.toast("No tracking data to export");
                return;
            }
            let csv = ledger.export_csv();
            match crate::utils::save_download("tracking_data.csv", csv.as_bytes()) {
                Ok(path) => ctx.toast(&format!("Saved {}", path.display())),
                Err(err) => ctx.toast(&format!("Could not save file: {err}")),
            }
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        let results = results.clone();
        clear_btn.connect_clicked(move |_| {
            let dialog = adw::MessageDialog::new(
                Some(&shell.window),
                Some("Clear all tracking data?"),
                Some("This removes the response history for every tracked contact and cannot be undone."),
            );
            dialog.add_response("cancel", "Cancel");
            dialog.add_response("clear", "Clear");
            dialog.set_response_appearance("clear", adw::ResponseAppearance::Destructive);
            dialog.set_default_response(Some("cancel"));
            let ctx = ctx.clone();
            let shell = shell.clone();
            let results = results.clone();
            dialog.connect_response(None, move |_, response| {
                if response == "clear" {
                    ctx.ledger().clear();
                    shell.refresh_tracking_bar(&ctx);
                    results.refresh(&ctx);
                    ctx.toast("Tracking data cleared");
                }
            });
            dialog.present();
        });
    }

    // Header actions
    {
        let ctx = ctx.clone();
        theme_btn.connect_clicked(move |_| {
            let theme = {
                let mut state = ctx.state.borrow_mut();
                state.theme = if state.dark() { "light".to_string() } else { "dark".to_string() };
                crate::app::apply_theme(&state);
                if let Err(e) = state.save() {
                    log::warn!("could not save settings: {e}");
                }
                state.theme.clone()
            };
            ctx.toast(&format!("Switched to {theme} mode"));
        });
    }
    {
        let ctx = ctx.clone();
        let shell = shell.clone();
        server_btn.connect_clicked(move |_| {
            show_server_dialog(&ctx, shell.window.upcast_ref());
        });
    }

    // Restore a previous session from the cache slots.
    {
        let restored = ctx.session.borrow_mut().hydrate(&ctx.store);
        if restored {
            template.refresh_contacts(&ctx);
            template.refresh_templates(&ctx);
            ctx.toast("Restored cached contact data");
        }
        if !ctx.session.borrow().messages.is_empty() {
            results.refresh(&ctx);
        }
    }

    shell.refresh_tracking_bar(&ctx);
    shell.go_to_step(&ctx, Step::Upload);
    window.present();
}

fn show_server_dialog(ctx: &Rc<Ctx>, parent: &gtk::Window) {
    let window = gtk::Window::builder()
        .title("Server Settings")
        .modal(true)
        .default_width(420)
        .build();
    window.set_transient_for(Some(parent));

    let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
    root.set_margin_top(16);
    root.set_margin_bottom(16);
    root.set_margin_start(16);
    root.set_margin_end(16);

    let entry = gtk::Entry::new();
    entry.set_text(&ctx.state.borrow().server_url);
    entry.set_placeholder_text(Some("Server URL (e.g. http://localhost:5000)"));
    root.append(&entry);

    let save_btn = gtk::Button::with_label("Save");
    save_btn.add_css_class("suggested-action");
    save_btn.set_halign(gtk::Align::End);
    root.append(&save_btn);
    window.set_child(Some(&root));

    let ctx = ctx.clone();
    let window_for_save = window.clone();
    save_btn.connect_clicked(move |_| {
        let url = crate::utils::normalize_url(&entry.text());
        if url::Url::parse(&url).is_err() {
            ctx.toast("That does not look like a valid URL.");
            return;
        }
        {
            let mut state = ctx.state.borrow_mut();
            state.server_url = url;
            if let Err(e) = state.save() {
                ctx.toast(&format!("Failed to save settings: {e}"));
            }
        }
        window_for_save.close();
    });

    window.present();
}
