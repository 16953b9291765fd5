use tokio::sync::watch;
use tracing::info;

use crate::domain::ports::{AuthSession, SessionUser};

/// In-process session provider. Sign-in and sign-out are explicit calls;
/// observers get every change through `watch`.
pub struct LocalSession {
    tx: watch::Sender<Option<SessionUser>>,
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSession {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, id: impl Into<String>, email: impl Into<String>) -> SessionUser {
        self.sign_in_user(SessionUser::new(id, email))
    }

    pub fn sign_in_user(&self, user: SessionUser) -> SessionUser {
        info!(user_id = %user.id, "session signed in");
        self.tx.send_replace(Some(user.clone()));
        user
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("session signed out");
        }
    }
}

impl AuthSession for LocalSession {
    fn current_user(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }
}
