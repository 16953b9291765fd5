use tokio::sync::watch;

/// Identity handed out by the session provider, plus the bootstrap data used
/// to seed a new profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            photo_url: None,
        }
    }
}

/// Port for the authentication service.
pub trait AuthSession: Send + Sync {
    fn current_user(&self) -> Option<SessionUser>;

    /// Change feed of the signed-in user; dropping the receiver unsubscribes.
    fn watch(&self) -> watch::Receiver<Option<SessionUser>>;

    fn current_user_id(&self) -> Option<String> {
        self.current_user().map(|u| u.id)
    }
}
