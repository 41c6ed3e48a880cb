//! Authenticated identity attached to admitted requests.

use std::fmt;

/// The principal behind an admitted request.
///
/// Created per request by the `PrincipalResolver` and placed into the
/// request extensions by the admission pipeline. Handlers read it with
/// `Extension<Identity>` or [`IdentityExt::identity`].
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    subject: String,
    display_name: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            display_name,
        }
    }

    /// Stable subject (user key), also the rate-limit bucket key.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Accessor for the identity of the current request.
pub trait IdentityExt {
    /// Returns `None` if the admission pipeline did not run for this request.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::extract::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_subject() {
        let identity = Identity::new("0b9c-user-key", Some("alice".to_string()));
        let debug_str = format!("{identity:?}");
        assert!(!debug_str.contains("0b9c-user-key"));
        assert!(debug_str.contains("alice"));
    }

    #[test]
    fn test_identity_ext_reads_extensions() {
        let mut req = axum::http::Request::new(());
        assert!(req.identity().is_none());

        req.extensions_mut().insert(Identity::new("u1", None));
        assert_eq!(req.identity().map(Identity::subject), Some("u1"));
    }
}
