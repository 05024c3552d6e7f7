use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::api::models::GeneratedMessage;
use crate::session::SortBy;
use crate::tracking::Status;
use crate::ui::Ctx;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

fn status_choice_label(status: Status) -> String {
    let icon = match status {
        Status::Pending => "⏳",
        Status::Responded => "💬",
        Status::Signed => "✅",
        Status::Declined => "❌",
    };
    format!("{icon} {}", status.label())
}

/// Step 3: browse, search and annotate the generated messages.
pub struct ResultsView {
    root: gtk::Box,
    count_label: gtk::Label,
    search_entry: gtk::Entry,
    search_pending: RefCell<Option<glib::SourceId>>,
    sort_dropdown: gtk::DropDown,
    list: gtk::ListBox,
    empty_state: gtk::Label,
    csv_btn: gtk::Button,
    zip_btn: gtk::Button,
    download_spinner: gtk::Spinner,
    pub back_btn: gtk::Button,
    pub start_over_btn: gtk::Button,
    // Fired after any per-message status change so the shell can refresh.
    on_status_changed: RefCell<Option<Box<dyn Fn()>>>,
}

impl ResultsView {
    pub fn new(ctx: Rc<Ctx>) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
        root.set_margin_top(16);
        root.set_margin_bottom(16);
        root.set_margin_start(16);
        root.set_margin_end(16);

        let header = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let count_label = gtk::Label::new(None);
        count_label.add_css_class("heading");
        count_label.set_hexpand(true);
        count_label.set_halign(gtk::Align::Start);
        header.append(&count_label);

        let search_entry = gtk::Entry::new();
        search_entry.set_placeholder_text(Some("Search name or email…"));
        search_entry.set_primary_icon_name(Some("system-search-symbolic"));
        header.append(&search_entry);

        let sort_dropdown = gtk::DropDown::from_strings(&[
            "Name (A–Z)",
            "Name (Z–A)",
            "Email (A–Z)",
            "Status",
        ]);
        header.append(&sort_dropdown);
        root.append(&header);

        let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::None);
        list.add_css_class("boxed-list");
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let empty_state = gtk::Label::new(Some("No messages match your search."));
        empty_state.add_css_class("dim-label");
        empty_state.set_visible(false);
        root.append(&empty_state);

        let footer = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let back_btn = gtk::Button::with_label("Back");
        footer.append(&back_btn);
        let start_over_btn = gtk::Button::with_label("Start Over");
        footer.append(&start_over_btn);
        let spacer = gtk::Box::new(gtk::Orientation::Horizontal, 0);
        spacer.set_hexpand(true);
        footer.append(&spacer);
        let download_spinner = gtk::Spinner::new();
        footer.append(&download_spinner);
        let csv_btn = gtk::Button::with_label("Download CSV");
        footer.append(&csv_btn);
        let zip_btn = gtk::Button::with_label("Download ZIP");
        footer.append(&zip_btn);
        root.append(&footer);

        let view = Rc::new(Self {
            root,
            count_label,
            search_entry,
            search_pending: RefCell::new(None),
            sort_dropdown,
            list,
            empty_state,
            csv_btn,
            zip_btn,
            download_spinner,
            back_btn,
            start_over_btn,
            on_status_changed: RefCell::new(None),
        });

        // Trailing debounce: re-render once the user pauses typing.
        {
            let ctx = ctx.clone();
            let view_for_search = view.clone();
            view.search_entry.connect_changed(move |entry| {
                if let Some(id) = view_for_search.search_pending.borrow_mut().take() {
                    id.remove();
                }
                let ctx = ctx.clone();
                let view = view_for_search.clone();
                let text = entry.text().to_string();
                let id = glib::timeout_add_local_once(SEARCH_DEBOUNCE, move || {
                    view.search_pending.borrow_mut().take();
                    ctx.session.borrow_mut().search = text.clone();
                    view.refresh(&ctx);
                });
                *view_for_search.search_pending.borrow_mut() = Some(id);
            });
        }

        {
            let ctx = ctx.clone();
            let view_for_sort = view.clone();
            view.sort_dropdown.connect_selected_notify(move |dropdown| {
                let sort = match dropdown.selected() {
                    1 => SortBy::NameDesc,
                    2 => SortBy::EmailAsc,
                    3 => SortBy::Status,
                    _ => SortBy::NameAsc,
                };
                ctx.session.borrow_mut().sort = sort;
                view_for_sort.refresh(&ctx);
            });
        }

        {
            let ctx = ctx.clone();
            let view_for_csv = view.clone();
            view.csv_btn.connect_clicked(move |_| {
                view_for_csv.download(&ctx, false);
            });
        }
        {
            let ctx = ctx.clone();
            let view_for_zip = view.clone();
            view.zip_btn.connect_clicked(move |_| {
                view_for_zip.download(&ctx, true);
            });
        }

        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_on_status_changed<F: Fn() + 'static>(&self, f: F) {
        *self.on_status_changed.borrow_mut() = Some(Box::new(f));
    }

    pub fn clear_filters(&self) {
        self.search_entry.set_text("");
        self.sort_dropdown.set_selected(0);
    }

    pub fn refresh(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        let total = ctx.session.borrow().messages.len();
        let plural = if total == 1 { "" } else { "s" };
        self.count_label.set_label(&format!("{total} message{plural} generated"));

        // One ledger read per render, not one per row.
        let statuses: HashMap<String, Status> = ctx
            .ledger()
            .entries(None, None)
            .into_iter()
            .map(|e| (e.email.clone(), e.status))
            .collect();
        let visible = ctx
            .session
            .borrow()
            .visible_messages(|email| statuses.get(email).copied().unwrap_or_default());

        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        self.empty_state.set_visible(visible.is_empty());

        for message in &visible {
            let status = statuses.get(&message.email).copied().unwrap_or_default();
            let row = self.build_message_row(ctx, message, status);
            self.list.append(&row);
        }
    }

    fn build_message_row(
        self: &Rc<Self>,
        ctx: &Rc<Ctx>,
        message: &GeneratedMessage,
        status: Status,
    ) -> gtk::ListBoxRow {
        let row = gtk::ListBoxRow::new();
        let expander = gtk::Expander::new(None);
        expander.set_margin_top(4);
        expander.set_margin_bottom(4);
        expander.set_margin_start(8);
        expander.set_margin_end(8);

        let header = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let who = gtk::Box::new(gtk::Orientation::Vertical, 0);
        let name = gtk::Label::new(Some(if message.name.is_empty() {
            "Unknown"
        } else {
            message.name.as_str()
        }));
        name.add_css_class("heading");
        name.set_halign(gtk::Align::Start);
        who.append(&name);
        let email = gtk::Label::new(Some(&message.email));
        email.add_css_class("dim-label");
        email.set_halign(gtk::Align::Start);
        who.append(&email);
        header.append(&who);
        let badge = gtk::Label::new(Some(&status_choice_label(status)));
        badge.add_css_class("caption");
        badge.set_valign(gtk::Align::Center);
        header.append(&badge);
        expander.set_label_widget(Some(&header));

        let content = gtk::Box::new(gtk::Orientation::Vertical, 6);
        content.set_margin_top(8);

        let actions = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let choices: Vec<String> = Status::ALL.iter().map(|s| status_choice_label(*s)).collect();
        let choice_refs: Vec<&str> = choices.iter().map(|s| s.as_str()).collect();
        let status_dropdown = gtk::DropDown::from_strings(&choice_refs);
        let rank = Status::ALL.iter().position(|s| *s == status).unwrap_or(0);
        status_dropdown.set_selected(rank as u32);
        actions.append(&status_dropdown);

        let copy_btn = gtk::Button::with_label("Copy");
        actions.append(&copy_btn);
        content.append(&actions);

        let subject = gtk::Label::new(Some(&format!("Subject: {}", message.subject)));
        subject.add_css_class("heading");
        subject.set_halign(gtk::Align::Start);
        subject.set_wrap(true);
        content.append(&subject);
        let body = gtk::Label::new(Some(&message.body));
        body.set_halign(gtk::Align::Start);
        body.set_wrap(true);
        body.set_selectable(true);
        content.append(&body);
        expander.set_child(Some(&content));
        row.set_child(Some(&expander));

        {
            let ctx = ctx.clone();
            let view = self.clone();
            let badge = badge.clone();
            let email_for_status = message.email.clone();
            status_dropdown.connect_selected_notify(move |dropdown| {
                let status = Status::ALL[dropdown.selected() as usize % Status::ALL.len()];
                ctx.ledger().set_status(&email_for_status, status);
                badge.set_label(&status_choice_label(status));
                ctx.toast(&format!("Status updated to {status}"));
                if let Some(cb) = view.on_status_changed.borrow().as_ref() {
                    cb();
                }
            });
        }
        {
            let ctx = ctx.clone();
            let message = message.clone();
            copy_btn.connect_clicked(move |btn| {
                let text = format!(
                    "To: {}\nSubject: {}\n\n{}",
                    message.email, message.subject, message.body
                );
                btn.clipboard().set_text(&text);
                ctx.toast("Message copied to clipboard!");
            });
        }

        row
    }

    fn download(self: &Rc<Self>, ctx: &Rc<Ctx>, zip: bool) {
        let messages = ctx.session.borrow().messages.clone();
        if messages.is_empty() {
            return;
        }
        self.set_busy(true);
        let api = ctx.api();
        let rx = crate::utils::run_async_to_main(async move {
            let res = if zip {
                api.download_zip(&messages).await
            } else {
                api.download_csv(&messages).await
            };
            res.map_err(|e| e.to_string())
        });

        let ctx = ctx.clone();
        let view = self.clone();
        let filename = if zip { "recruitment_emails.zip" } else { "recruitment_emails.csv" };
        rx.attach(None, move |res| {
            view.set_busy(false);
            match res {
                Ok(bytes) => match crate::utils::save_download(filename, &bytes) {
                    Ok(path) => ctx.toast(&format!("Saved {}", path.display())),
                    Err(err) => ctx.toast(&format!("Could not save file: {err}")),
                },
                Err(err) => ctx.toast(&err),
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_busy(&self, busy: bool) {
        self.csv_btn.set_sensitive(!busy);
        self.zip_btn.set_sensitive(!busy);
        self.download_spinner.set_spinning(busy);
    }
}
