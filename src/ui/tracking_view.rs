use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

use crate::tracking::Status;
use crate::ui::Ctx;

fn status_choice_label(status: Status) -> String {
    let icon = match status {
        Status::Pending => "⏳",
        Status::Responded => "💬",
        Status::Signed => "✅",
        Status::Declined => "❌",
    };
    format!("{icon} {}", status.label())
}

/// Window listing every tracked contact, filterable by status and by upload
/// batch. `on_changed` fires after any status edit so the shell can refresh.
pub fn open_tracking_window(ctx: &Rc<Ctx>, parent: &gtk::Window, on_changed: Rc<dyn Fn()>) {
    let window = gtk::Window::builder()
        .title("Response Tracking")
        .modal(false)
        .default_width(560)
        .default_height(520)
        .build();
    window.set_transient_for(Some(parent));

    let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
    root.set_margin_top(12);
    root.set_margin_bottom(12);
    root.set_margin_start(12);
    root.set_margin_end(12);

    let status_filter: Rc<RefCell<Option<Status>>> = Rc::new(RefCell::new(None));
    let batch_filter: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

    // Status filter buttons
    let filter_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let all_btn = gtk::ToggleButton::with_label("All");
    all_btn.set_active(true);
    filter_row.append(&all_btn);
    let mut status_buttons = vec![(all_btn.clone(), None)];
    for status in Status::ALL {
        let btn = gtk::ToggleButton::with_label(status.label());
        btn.set_group(Some(&all_btn));
        filter_row.append(&btn);
        status_buttons.push((btn, Some(status)));
    }
    root.append(&filter_row);

    // Batch filter
    let batches = ctx.batches().list();
    let mut batch_choices = vec!["All Batches".to_string()];
    for batch in &batches {
        batch_choices.push(format!("{} ({})", batch.name, batch.contact_count));
    }
    let batch_refs: Vec<&str> = batch_choices.iter().map(|s| s.as_str()).collect();
    let batch_dropdown = gtk::DropDown::from_strings(&batch_refs);
    root.append(&batch_dropdown);

    let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
    let list = gtk::ListBox::new();
    list.set_selection_mode(gtk::SelectionMode::None);
    list.add_css_class("boxed-list");
    scroller.set_child(Some(&list));
    root.append(&scroller);

    let empty_state = gtk::Label::new(Some("No contacts found."));
    empty_state.add_css_class("dim-label");
    empty_state.set_visible(false);
    root.append(&empty_state);

    window.set_child(Some(&root));

    let refresh: Rc<dyn Fn()> = {
        let ctx = ctx.clone();
        let list = list.clone();
        let empty_state = empty_state.clone();
        let status_filter = status_filter.clone();
        let batch_filter = batch_filter.clone();
        let on_changed = on_changed.clone();
        let batches = batches.clone();
        Rc::new(move || {
            while let Some(child) = list.first_child() {
                list.remove(&child);
            }
            let entries = ctx
                .ledger()
                .entries(*status_filter.borrow(), batch_filter.borrow().as_deref());
            empty_state.set_visible(entries.is_empty());
            for entry in entries {
                let row = gtk::ListBoxRow::new();
                let content = gtk::Box::new(gtk::Orientation::Horizontal, 8);
                content.set_margin_top(6);
                content.set_margin_bottom(6);
                content.set_margin_start(8);
                content.set_margin_end(8);

                let info = gtk::Box::new(gtk::Orientation::Vertical, 2);
                info.set_hexpand(true);
                let name = gtk::Label::new(Some(&entry.name));
                name.add_css_class("heading");
                name.set_halign(gtk::Align::Start);
                info.append(&name);
                let email = gtk::Label::new(Some(&entry.email));
                email.add_css_class("dim-label");
                email.set_halign(gtk::Align::Start);
                info.append(&email);
                let batch_name = entry
                    .batch_id
                    .as_ref()
                    .and_then(|id| batches.iter().find(|b| &b.id == id))
                    .map(|b| b.name.clone());
                let mut meta = format!("Added: {}", entry.date_added.format("%b %e, %Y"));
                if let Some(batch_name) = batch_name {
                    meta.push_str(&format!(" • {batch_name}"));
                }
                let meta_label = gtk::Label::new(Some(&meta));
                meta_label.add_css_class("caption");
                meta_label.set_halign(gtk::Align::Start);
                info.append(&meta_label);
                content.append(&info);

                let choices: Vec<String> =
                    Status::ALL.iter().map(|s| status_choice_label(*s)).collect();
                let choice_refs: Vec<&str> = choices.iter().map(|s| s.as_str()).collect();
                let dropdown = gtk::DropDown::from_strings(&choice_refs);
                let rank = Status::ALL.iter().position(|s| *s == entry.status).unwrap_or(0);
                dropdown.set_selected(rank as u32);
                dropdown.set_valign(gtk::Align::Center);
                {
                    let ctx = ctx.clone();
                    let email_for_status = entry.email.clone();
                    let on_changed = on_changed.clone();
                    dropdown.connect_selected_notify(move |d| {
                        let status = Status::ALL[d.selected() as usize % Status::ALL.len()];
                        ctx.ledger().set_status(&email_for_status, status);
                        ctx.toast(&format!("Status updated to {status}"));
                        on_changed();
                    });
                }
                content.append(&dropdown);
                row.set_child(Some(&content));
                list.append(&row);
            }
        })
    };

    for (btn, status) in status_buttons {
        let refresh = refresh.clone();
        let status_filter = status_filter.clone();
        btn.connect_toggled(move |b| {
            if b.is_active() {
                *status_filter.borrow_mut() = status;
                refresh();
            }
        });
    }
    {
        let refresh = refresh.clone();
        let batch_filter = batch_filter.clone();
        let batches = batches.clone();
        batch_dropdown.connect_selected_notify(move |dropdown| {
            let selected = dropdown.selected() as usize;
            *batch_filter.borrow_mut() = if selected == 0 {
                None
            } else {
                batches.get(selected - 1).map(|b| b.id.clone())
            };
            refresh();
        });
    }

    refresh();
    window.present();
}

/// Read-only dashboard over the current ledger snapshot. Everything here is
/// re-derived on open, nothing is cached.
pub fn open_dashboard_window(ctx: &Rc<Ctx>, parent: &gtk::Window) {
    let stats = ctx.ledger().stats();

    let window = gtk::Window::builder()
        .title("Outreach Dashboard")
        .modal(false)
        .default_width(420)
        .default_height(380)
        .build();
    window.set_transient_for(Some(parent));

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(16);
    root.set_margin_bottom(16);
    root.set_margin_start(16);
    root.set_margin_end(16);

    let grid = gtk::Grid::new();
    grid.set_row_spacing(8);
    grid.set_column_spacing(24);
    let cards = [
        ("Total Contacted", stats.total.to_string()),
        ("Response Rate", format!("{}%", stats.response_rate())),
        ("Conversion Rate", format!("{}%", stats.conversion_rate())),
        ("Signed Up", stats.signed.to_string()),
    ];
    for (i, (title, value)) in cards.iter().enumerate() {
        let value_label = gtk::Label::new(Some(value));
        value_label.add_css_class("title-1");
        let title_label = gtk::Label::new(Some(title));
        title_label.add_css_class("dim-label");
        let col = (i % 2) as i32;
        let row = (i / 2) as i32 * 2;
        grid.attach(&value_label, col, row, 1, 1);
        grid.attach(&title_label, col, row + 1, 1, 1);
    }
    grid.set_halign(gtk::Align::Center);
    root.append(&grid);

    let breakdown_title = gtk::Label::new(Some("By status"));
    breakdown_title.add_css_class("heading");
    breakdown_title.set_halign(gtk::Align::Start);
    root.append(&breakdown_title);

    let breakdown = [
        (Status::Pending, stats.pending),
        (Status::Responded, stats.responded),
        (Status::Signed, stats.signed),
        (Status::Declined, stats.declined),
    ];
    for (status, count) in breakdown {
        let line = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let label = gtk::Label::new(Some(&status_choice_label(status)));
        label.set_hexpand(true);
        label.set_halign(gtk::Align::Start);
        line.append(&label);
        let count_label = gtk::Label::new(Some(&count.to_string()));
        line.append(&count_label);
        root.append(&line);
    }

    if stats.total == 0 {
        let empty = gtk::Label::new(Some("No data to display yet."));
        empty.add_css_class("dim-label");
        root.append(&empty);
    }

    window.set_child(Some(&root));
    window.present();
}
