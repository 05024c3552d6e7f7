pub mod main_window;
pub mod results_view;
pub mod template_view;
pub mod tracking_view;
pub mod upload_view;

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::app::AppState;
use crate::batches::BatchRegistry;
use crate::session::SessionState;
use crate::storage::Store;
use crate::tracking::TrackingLedger;

/// Shared handles for the UI thread: settings, session state, slot store and
/// the toast overlay every view reports through.
pub struct Ctx {
    pub state: RefCell<AppState>,
    pub session: RefCell<SessionState>,
    pub store: Store,
    pub toasts: adw::ToastOverlay,
}

impl Ctx {
    pub fn new(state: AppState, store: Store, toasts: adw::ToastOverlay) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            session: RefCell::new(SessionState::new()),
            store,
            toasts,
        })
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.state.borrow().server_url)
    }

    pub fn ledger(&self) -> TrackingLedger<'_> {
        TrackingLedger::new(&self.store)
    }

    pub fn batches(&self) -> BatchRegistry<'_> {
        BatchRegistry::new(&self.store)
    }

    pub fn toast(&self, message: &str) {
        self.toasts.add_toast(adw::Toast::new(message));
    }
}
