use crate::service::Credential;

/// Who a result is attributed to: an authenticated account, or a guest name.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    credential: Option<Credential>,
    guest_name: String,
}

impl Identity {
    pub fn guest(name: &str) -> Self {
        Self {
            credential: None,
            guest_name: name.trim().to_string(),
        }
    }

    pub fn authenticated(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            guest_name: String::new(),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn guest_name(&self) -> &str {
        &self.guest_name
    }

    pub fn set_guest_name(&mut self, name: &str) {
        self.guest_name = name.trim().to_string();
    }

    pub fn clear_guest_name(&mut self) {
        self.guest_name.clear();
    }

    /// Authenticated users or guests who entered a name.
    pub fn can_submit(&self) -> bool {
        self.is_authenticated() || !self.guest_name.is_empty()
    }

    /// Name sent with a result; the server derives it from the credential
    /// for authenticated users.
    pub fn submitted_name(&self) -> &str {
        if self.is_authenticated() {
            ""
        } else {
            &self.guest_name
        }
    }
}
