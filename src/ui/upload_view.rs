use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ui::Ctx;
use crate::validation;

const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "docx", "pdf"];

/// Step 1: pick a contact file and send it to the parsing service.
pub struct UploadView {
    root: gtk::Box,
    file_label: gtk::Label,
    choose_btn: gtk::Button,
    spinner: gtk::Spinner,
    status: gtk::Label,
    // Fired after contacts landed in the session (full or partial success).
    on_complete: RefCell<Option<Box<dyn Fn()>>>,
}

impl UploadView {
    pub fn new(ctx: Rc<Ctx>) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
        root.set_margin_top(24);
        root.set_margin_bottom(24);
        root.set_margin_start(24);
        root.set_margin_end(24);
        root.set_valign(gtk::Align::Center);

        let title = gtk::Label::new(Some("Upload your contact list"));
        title.add_css_class("title-2");
        root.append(&title);

        let hint = gtk::Label::new(Some(
            "CSV, DOCX or PDF. The file should contain at least names and email addresses.",
        ));
        hint.add_css_class("dim-label");
        hint.set_wrap(true);
        root.append(&hint);

        let choose_btn = gtk::Button::with_label("Choose File…");
        choose_btn.add_css_class("suggested-action");
        choose_btn.add_css_class("pill");
        choose_btn.set_halign(gtk::Align::Center);
        root.append(&choose_btn);

        let file_label = gtk::Label::new(None);
        file_label.add_css_class("dim-label");
        root.append(&file_label);

        let spinner = gtk::Spinner::new();
        spinner.set_halign(gtk::Align::Center);
        root.append(&spinner);

        let status = gtk::Label::new(None);
        status.set_wrap(true);
        status.add_css_class("error");
        status.set_visible(false);
        root.append(&status);

        let view = Rc::new(Self {
            root,
            file_label,
            choose_btn,
            spinner,
            status,
            on_complete: RefCell::new(None),
        });

        {
            let ctx = ctx.clone();
            let view_for_click = view.clone();
            view.choose_btn.connect_clicked(move |_| {
                view_for_click.open_file_dialog(&ctx);
            });
        }

        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_on_complete<F: Fn() + 'static>(&self, f: F) {
        *self.on_complete.borrow_mut() = Some(Box::new(f));
    }

    fn open_file_dialog(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        let parent = self.root.root().and_downcast::<gtk::Window>();
        let dialog = gtk::FileChooserDialog::new(
            Some("Choose a contact file"),
            parent.as_ref(),
            gtk::FileChooserAction::Open,
            &[
                ("Cancel", gtk::ResponseType::Cancel),
                ("Open", gtk::ResponseType::Accept),
            ],
        );
        let filter = gtk::FileFilter::new();
        filter.set_name(Some("Contact files"));
        for pattern in ["*.csv", "*.docx", "*.pdf"] {
            filter.add_pattern(pattern);
        }
        dialog.add_filter(&filter);

        let ctx = ctx.clone();
        let view = self.clone();
        dialog.connect_response(move |dlg, resp| {
            if resp == gtk::ResponseType::Accept {
                if let Some(path) = dlg.file().and_then(|f| f.path()) {
                    view.process_file(&ctx, path);
                }
            }
            dlg.close();
        });
        dialog.present();
    }

    fn process_file(self: &Rc<Self>, ctx: &Rc<Ctx>, path: PathBuf) {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            ctx.toast("Please upload a CSV, DOCX, or PDF file.");
            return;
        }

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.file_label
            .set_label(&format!("{filename} ({})", crate::utils::format_file_size(size)));
        self.status.set_visible(false);
        self.set_busy(true);

        let api = ctx.api();
        let path_for_async = path.clone();
        let rx = crate::utils::run_async_to_main(async move {
            api.upload(&path_for_async).await.map_err(|e| e.to_string())
        });

        let ctx = ctx.clone();
        let view = self.clone();
        rx.attach(None, move |res| {
            view.set_busy(false);
            match res {
                Ok(outcome) => {
                    let count = outcome.contacts.len();
                    {
                        let mut session = ctx.session.borrow_mut();
                        session.contacts = outcome.contacts;
                        session.selected_file = Some(path.clone());
                        validation::validate(&mut session.contacts);
                        session.cache_contacts(&ctx.store);
                    }
                    match outcome.warning {
                        Some(warning) => {
                            view.status.set_label(&warning);
                            view.status.set_visible(true);
                            ctx.toast(&format!("Recovered {count} contacts"));
                        }
                        None => {
                            ctx.toast(&format!("Successfully extracted {count} contacts!"));
                        }
                    }
                    if let Some(cb) = view.on_complete.borrow().as_ref() {
                        cb();
                    }
                }
                Err(err) => {
                    view.status.set_label(&err);
                    view.status.set_visible(true);
                    ctx.toast(&err);
                }
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_busy(&self, busy: bool) {
        self.choose_btn.set_sensitive(!busy);
        self.spinner.set_spinning(busy);
    }
}
