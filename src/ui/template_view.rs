use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::models::Template;
use crate::ui::Ctx;
use crate::validation;

/// Step 2: review/edit the parsed contacts and pick a message template.
pub struct TemplateView {
    root: gtk::Box,
    count_label: gtk::Label,
    duplicate_label: gtk::Label,
    warnings_box: gtk::Box,
    contacts_list: gtk::ListBox,
    email_entries: RefCell<Vec<gtk::Entry>>,
    category_box: gtk::Box,
    template_list: gtk::ListBox,
    templates: RefCell<Vec<Template>>,
    visible_templates: RefCell<Vec<Template>>,
    custom_revealer: gtk::Revealer,
    custom_subject: gtk::Entry,
    custom_body: gtk::TextView,
    pub back_btn: gtk::Button,
    generate_btn: gtk::Button,
    generate_spinner: gtk::Spinner,
    // Fired after a successful generation (messages cached, batch tracked).
    on_complete: RefCell<Option<Box<dyn Fn()>>>,
}

impl TemplateView {
    pub fn new(ctx: Rc<Ctx>) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
        root.set_margin_top(16);
        root.set_margin_bottom(16);
        root.set_margin_start(16);
        root.set_margin_end(16);

        // Contact summary row
        let summary = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        let count_label = gtk::Label::new(None);
        count_label.add_css_class("heading");
        summary.append(&count_label);
        let duplicate_label = gtk::Label::new(None);
        duplicate_label.add_css_class("warning");
        duplicate_label.set_visible(false);
        summary.append(&duplicate_label);
        root.append(&summary);

        let warnings_box = gtk::Box::new(gtk::Orientation::Vertical, 4);
        warnings_box.set_visible(false);
        root.append(&warnings_box);

        let contacts_scroller = gtk::ScrolledWindow::builder()
            .min_content_height(180)
            .vexpand(false)
            .build();
        let contacts_list = gtk::ListBox::new();
        contacts_list.set_selection_mode(gtk::SelectionMode::None);
        contacts_list.add_css_class("boxed-list");
        contacts_scroller.set_child(Some(&contacts_list));
        root.append(&contacts_scroller);

        // Template picker
        let picker_title = gtk::Label::new(Some("Choose a template"));
        picker_title.add_css_class("heading");
        picker_title.set_halign(gtk::Align::Start);
        root.append(&picker_title);

        let category_box = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        root.append(&category_box);

        let template_scroller = gtk::ScrolledWindow::builder()
            .min_content_height(200)
            .vexpand(true)
            .build();
        let template_list = gtk::ListBox::new();
        template_list.add_css_class("boxed-list");
        template_scroller.set_child(Some(&template_list));
        root.append(&template_scroller);

        // Custom subject/body
        let custom_toggle = gtk::ToggleButton::with_label("Customize subject & body");
        custom_toggle.set_halign(gtk::Align::Start);
        root.append(&custom_toggle);

        let custom_revealer = gtk::Revealer::new();
        let custom_fields = gtk::Box::new(gtk::Orientation::Vertical, 6);
        let custom_subject = gtk::Entry::new();
        custom_subject.set_placeholder_text(Some("Custom subject (optional)"));
        custom_fields.append(&custom_subject);
        let body_scroller = gtk::ScrolledWindow::builder().min_content_height(120).build();
        let custom_body = gtk::TextView::new();
        custom_body.set_wrap_mode(gtk::WrapMode::WordChar);
        body_scroller.set_child(Some(&custom_body));
        custom_fields.append(&body_scroller);
        custom_revealer.set_child(Some(&custom_fields));
        root.append(&custom_revealer);

        {
            let revealer = custom_revealer.clone();
            custom_toggle.connect_toggled(move |btn| {
                revealer.set_reveal_child(btn.is_active());
            });
        }

        // Navigation
        let nav = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        nav.set_halign(gtk::Align::End);
        let back_btn = gtk::Button::with_label("Back");
        nav.append(&back_btn);
        let generate_spinner = gtk::Spinner::new();
        nav.append(&generate_spinner);
        let generate_btn = gtk::Button::with_label("Generate Messages");
        generate_btn.add_css_class("suggested-action");
        nav.append(&generate_btn);
        root.append(&nav);

        let view = Rc::new(Self {
            root,
            count_label,
            duplicate_label,
            warnings_box,
            contacts_list,
            email_entries: RefCell::new(Vec::new()),
            category_box,
            template_list,
            templates: RefCell::new(Vec::new()),
            visible_templates: RefCell::new(Vec::new()),
            custom_revealer,
            custom_subject,
            custom_body,
            back_btn,
            generate_btn,
            generate_spinner,
            on_complete: RefCell::new(None),
        });

        {
            let ctx = ctx.clone();
            let view_for_select = view.clone();
            view.template_list.connect_row_selected(move |_, row| {
                if let Some(row) = row {
                    let visible = view_for_select.visible_templates.borrow();
                    if let Some(template) = visible.get(row.index() as usize) {
                        ctx.session.borrow_mut().selected_template = template.id.clone();
                    }
                }
            });
        }

        {
            let ctx = ctx.clone();
            let view_for_generate = view.clone();
            view.generate_btn.connect_clicked(move |_| {
                view_for_generate.generate(&ctx);
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

    // ----- contacts -----

    pub fn refresh_contacts(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        let issues = {
            let mut session = ctx.session.borrow_mut();
            validation::validate(&mut session.contacts)
        };
        self.render_summary_and_warnings(ctx, &issues);

        while let Some(child) = self.contacts_list.first_child() {
            self.contacts_list.remove(&child);
        }
        self.email_entries.borrow_mut().clear();

        let contacts = ctx.session.borrow().contacts.clone();
        for (index, contact) in contacts.iter().enumerate() {
            let row = self.build_contact_row(ctx, index, contact);
            self.contacts_list.append(&row);
        }
        self.refresh_duplicate_marks(ctx);
    }

    fn build_contact_row(
        self: &Rc<Self>,
        ctx: &Rc<Ctx>,
        index: usize,
        contact: &crate::api::models::Contact,
    ) -> gtk::ListBoxRow {
        let row = gtk::ListBoxRow::new();
        let outer = gtk::Box::new(gtk::Orientation::Vertical, 2);
        outer.set_margin_top(6);
        outer.set_margin_bottom(6);
        outer.set_margin_start(8);
        outer.set_margin_end(8);

        let fields = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let name_entry = gtk::Entry::new();
        name_entry.set_text(&contact.name);
        name_entry.set_placeholder_text(Some("Name"));
        name_entry.set_hexpand(true);
        let email_entry = gtk::Entry::new();
        email_entry.set_text(&contact.email);
        email_entry.set_placeholder_text(Some("Email"));
        email_entry.set_hexpand(true);
        let phone_entry = gtk::Entry::new();
        phone_entry.set_text(&contact.phone);
        phone_entry.set_placeholder_text(Some("Phone"));
        let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
        delete_btn.add_css_class("flat");
        delete_btn.set_tooltip_text(Some("Remove contact"));
        fields.append(&name_entry);
        fields.append(&email_entry);
        fields.append(&phone_entry);
        fields.append(&delete_btn);
        outer.append(&fields);

        if !contact.interests.is_empty() || !contact.location.is_empty() {
            let meta = gtk::Label::new(Some(&format!(
                "{} • {}",
                contact.interests, contact.location
            )));
            meta.add_css_class("dim-label");
            meta.set_halign(gtk::Align::Start);
            outer.append(&meta);
        }
        row.set_child(Some(&outer));

        self.email_entries.borrow_mut().push(email_entry.clone());

        {
            let ctx = ctx.clone();
            let view = self.clone();
            name_entry.connect_changed(move |entry| {
                {
                    let mut session = ctx.session.borrow_mut();
                    if let Some(c) = session.contacts.get_mut(index) {
                        c.name = entry.text().to_string();
                        c.rederive_first_name();
                    }
                    session.cache_contacts(&ctx.store);
                }
                view.revalidate(&ctx);
            });
        }
        {
            let ctx = ctx.clone();
            let view = self.clone();
            email_entry.connect_changed(move |entry| {
                {
                    let mut session = ctx.session.borrow_mut();
                    if let Some(c) = session.contacts.get_mut(index) {
                        c.email = entry.text().to_string();
                    }
                    session.cache_contacts(&ctx.store);
                }
                view.revalidate(&ctx);
            });
        }
        {
            let ctx = ctx.clone();
            let view = self.clone();
            phone_entry.connect_changed(move |entry| {
                {
                    let mut session = ctx.session.borrow_mut();
                    if let Some(c) = session.contacts.get_mut(index) {
                        c.phone = entry.text().to_string();
                    }
                    session.cache_contacts(&ctx.store);
                }
                view.revalidate(&ctx);
            });
        }
        {
            let ctx = ctx.clone();
            let view = self.clone();
            delete_btn.connect_clicked(move |_| {
                let name = {
                    let mut session = ctx.session.borrow_mut();
                    if index >= session.contacts.len() {
                        return;
                    }
                    let removed = session.contacts.remove(index);
                    session.cache_contacts(&ctx.store);
                    if removed.name.is_empty() { "Contact".to_string() } else { removed.name }
                };
                ctx.toast(&format!("{name} removed"));
                view.refresh_contacts(&ctx);
            });
        }

        row
    }

    /// Re-run validation after an in-place edit without rebuilding rows, so
    /// typing keeps its focus.
    fn revalidate(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        let issues = {
            let mut session = ctx.session.borrow_mut();
            validation::validate(&mut session.contacts)
        };
        self.render_summary_and_warnings(ctx, &issues);
        self.refresh_duplicate_marks(ctx);
    }

    fn render_summary_and_warnings(&self, ctx: &Rc<Ctx>, issues: &[String]) {
        let session = ctx.session.borrow();
        let total = session.contacts.len();
        let plural = if total == 1 { "" } else { "s" };
        self.count_label.set_label(&format!("{total} contact{plural} found"));

        let duplicates = session.contacts.iter().filter(|c| c.is_duplicate).count();
        if duplicates > 0 {
            self.duplicate_label.set_label(&format!("{duplicates} duplicate(s)"));
            self.duplicate_label.set_visible(true);
        } else {
            self.duplicate_label.set_visible(false);
        }
        drop(session);

        while let Some(child) = self.warnings_box.first_child() {
            self.warnings_box.remove(&child);
        }
        for issue in issues {
            let label = gtk::Label::new(Some(issue));
            label.add_css_class("warning");
            label.set_halign(gtk::Align::Start);
            self.warnings_box.append(&label);
        }
        self.warnings_box.set_visible(!issues.is_empty());
    }

    fn refresh_duplicate_marks(&self, ctx: &Rc<Ctx>) {
        let session = ctx.session.borrow();
        for (entry, contact) in self.email_entries.borrow().iter().zip(session.contacts.iter()) {
            if contact.is_duplicate {
                entry.add_css_class("warning");
            } else {
                entry.remove_css_class("warning");
            }
        }
    }

    // ----- templates -----

    /// Fetch the catalog once and build the category tabs from it.
    pub fn refresh_templates(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        if !self.templates.borrow().is_empty() {
            return;
        }
        let api = ctx.api();
        let rx = crate::utils::run_async_to_main(async move {
            api.templates().await.map_err(|e| e.to_string())
        });
        let ctx = ctx.clone();
        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(templates) => {
                    *view.templates.borrow_mut() = templates;
                    view.build_category_tabs(&ctx);
                    let category = ctx.session.borrow().category.clone();
                    view.show_category(&ctx, &category);
                }
                Err(err) => ctx.toast(&format!("Failed to load templates: {err}")),
            }
            glib::ControlFlow::Continue
        });
    }

    fn build_category_tabs(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        while let Some(child) = self.category_box.first_child() {
            self.category_box.remove(&child);
        }
        let mut categories: Vec<String> = Vec::new();
        for template in self.templates.borrow().iter() {
            if !categories.contains(&template.category) {
                categories.push(template.category.clone());
            }
        }
        let mut group: Option<gtk::ToggleButton> = None;
        let active = ctx.session.borrow().category.clone();
        for category in categories {
            let btn = gtk::ToggleButton::with_label(&category_label(&category));
            if let Some(first) = &group {
                btn.set_group(Some(first));
            } else {
                group = Some(btn.clone());
            }
            btn.set_active(category == active);
            let ctx = ctx.clone();
            let view = self.clone();
            let category_for_click = category.clone();
            btn.connect_toggled(move |b| {
                if b.is_active() {
                    view.show_category(&ctx, &category_for_click);
                }
            });
            self.category_box.append(&btn);
        }
    }

    fn show_category(self: &Rc<Self>, ctx: &Rc<Ctx>, category: &str) {
        ctx.session.borrow_mut().category = category.to_string();
        let visible: Vec<Template> = self
            .templates
            .borrow()
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect();

        while let Some(child) = self.template_list.first_child() {
            self.template_list.remove(&child);
        }
        let selected = ctx.session.borrow().selected_template.clone();
        let mut select_index: Option<usize> = None;
        for (i, template) in visible.iter().enumerate() {
            let row = gtk::ListBoxRow::new();
            let content = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            content.set_margin_top(6);
            content.set_margin_bottom(6);
            content.set_margin_start(8);
            content.set_margin_end(8);
            let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
            let name = gtk::Label::new(Some(&template.name));
            name.add_css_class("heading");
            name.set_halign(gtk::Align::Start);
            text.append(&name);
            let description = gtk::Label::new(Some(&template.description));
            description.add_css_class("dim-label");
            description.set_halign(gtk::Align::Start);
            description.set_wrap(true);
            text.append(&description);
            text.set_hexpand(true);
            content.append(&text);
            let preview_btn = gtk::Button::with_label("Preview");
            preview_btn.add_css_class("flat");
            preview_btn.set_valign(gtk::Align::Center);
            content.append(&preview_btn);
            row.set_child(Some(&content));
            self.template_list.append(&row);

            if template.id == selected {
                select_index = Some(i);
            }

            let template_for_preview = template.clone();
            let view = self.clone();
            preview_btn.connect_clicked(move |_| {
                view.show_preview(&template_for_preview);
            });
        }
        *self.visible_templates.borrow_mut() = visible;

        // Keep a valid selection: fall back to the first template in view.
        let index = select_index.unwrap_or(0) as i32;
        if let Some(row) = self.template_list.row_at_index(index) {
            self.template_list.select_row(Some(&row));
        }
    }

    fn show_preview(&self, template: &Template) {
        let parent = self.root.root().and_downcast::<gtk::Window>();
        let window = gtk::Window::builder()
            .title(template.name.as_str())
            .modal(true)
            .default_width(520)
            .default_height(480)
            .build();
        window.set_transient_for(parent.as_ref());

        let content = gtk::Box::new(gtk::Orientation::Vertical, 8);
        content.set_margin_top(16);
        content.set_margin_bottom(16);
        content.set_margin_start(16);
        content.set_margin_end(16);
        let subject = gtk::Label::new(Some(&format!("Subject: {}", template.subject)));
        subject.add_css_class("heading");
        subject.set_halign(gtk::Align::Start);
        subject.set_wrap(true);
        content.append(&subject);
        let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
        let body = gtk::Label::new(Some(&template.body));
        body.set_halign(gtk::Align::Start);
        body.set_valign(gtk::Align::Start);
        body.set_wrap(true);
        body.set_selectable(true);
        scroller.set_child(Some(&body));
        content.append(&scroller);
        window.set_child(Some(&content));
        window.present();
    }

    // ----- generation -----

    fn generate(self: &Rc<Self>, ctx: &Rc<Ctx>) {
        // Guard first: an empty contact list never reaches the network.
        let guard = ctx.session.borrow().ensure_can_generate();
        if let Err(message) = guard {
            ctx.toast(message);
            return;
        }

        let (contacts, template_id) = {
            let session = ctx.session.borrow();
            (session.contacts.clone(), session.selected_template.clone())
        };
        let custom_subject = if self.custom_revealer.reveals_child() {
            self.custom_subject.text().trim().to_string()
        } else {
            String::new()
        };
        let custom_body = if self.custom_revealer.reveals_child() {
            let buffer = self.custom_body.buffer();
            buffer
                .text(&buffer.start_iter(), &buffer.end_iter(), false)
                .trim()
                .to_string()
        } else {
            String::new()
        };

        self.set_busy(true);
        let api = ctx.api();
        let rx = crate::utils::run_async_to_main(async move {
            api.generate(&contacts, &template_id, &custom_subject, &custom_body)
                .await
                .map_err(|e| e.to_string())
        });

        let ctx = ctx.clone();
        let view = self.clone();
        rx.attach(None, move |res| {
            view.set_busy(false);
            match res {
                Ok(messages) => {
                    let count = messages.len();
                    let batch_name = ctx
                        .session
                        .borrow()
                        .selected_file
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned());
                    let emails: Vec<String> = messages.iter().map(|m| m.email.clone()).collect();
                    let batch_id =
                        ctx.batches().create(batch_name.as_deref(), count, emails);
                    ctx.ledger().add_batch(&messages, Some(&batch_id));
                    {
                        let mut session = ctx.session.borrow_mut();
                        session.messages = messages;
                        session.cache_messages(&ctx.store);
                    }
                    ctx.toast(&format!("{count} messages generated successfully!"));
                    if let Some(cb) = view.on_complete.borrow().as_ref() {
                        cb();
                    }
                }
                Err(err) => ctx.toast(&err),
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_busy(&self, busy: bool) {
        self.generate_btn.set_sensitive(!busy);
        self.generate_spinner.set_spinning(busy);
    }
}

fn category_label(category: &str) -> String {
    match category {
        "initial" => "Initial Outreach".to_string(),
        "followup" => "Follow-Up".to_string(),
        "seasonal" => "Seasonal".to_string(),
        other => other.to_string(),
    }
}
