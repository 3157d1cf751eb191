use std::sync::Arc;

use crate::{jwt::SessionSigner, store::SharedStore};

/// Everything a request handler needs, shared across requests.
pub struct State {
    pub store: SharedStore,
    pub sessions: Arc<SessionSigner>,
}

impl State {
    pub fn new(store: SharedStore, sessions: SessionSigner) -> Arc<Self> {
        Arc::new(Self {
            store,
            sessions: Arc::new(sessions),
        })
    }
}
