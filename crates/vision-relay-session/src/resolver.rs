//! Session resolution from the client-held cookie credential.

use std::sync::Arc;

use rand::{RngCore, rngs::OsRng};
use vision_relay_core::{SessionId, SessionStore, StoreError};

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "sid";

/// Random bytes behind a minted identifier.
const SESSION_ID_BYTES: usize = 16;

/// Outcome of resolving a request's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    /// Identifier the request is served under.
    pub id: SessionId,
    /// Whether the identifier was minted for this request.
    pub minted: bool,
    /// Whether an empty log was created for this request.
    pub created: bool,
}

impl ResolvedSession {
    /// `Set-Cookie` value to send back, only for freshly minted identifiers.
    ///
    /// No `Max-Age`/`Expires`: the cookie lives for the browser session.
    #[must_use]
    pub fn set_cookie(&self) -> Option<String> {
        self.minted
            .then(|| format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id))
    }
}

/// Maps inbound credentials onto conversation logs in a [`SessionStore`].
///
/// Client-supplied identifiers are trusted as-is: an unknown identifier gets
/// a fresh empty log under that same identifier.
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
}

impl SessionResolver {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The store sessions are resolved against.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Resolve the session for a request given its raw `Cookie` header.
    ///
    /// # Errors
    /// Returns error if the store cannot be accessed.
    pub async fn resolve(&self, cookie_header: Option<&str>) -> Result<ResolvedSession, StoreError> {
        let (id, minted) = match cookie_header.and_then(session_cookie) {
            Some(value) => (SessionId::new(value), false),
            None => (mint_session_id(), true),
        };

        let created = self.store.open(&id).await?;
        if created {
            tracing::debug!(session = id.short(), minted, "Opened conversation log");
        }

        Ok(ResolvedSession { id, minted, created })
    }
}

/// Extract the non-empty session cookie value from a `Cookie` header.
#[must_use]
pub fn session_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Mint a new identifier from the OS random source, hex encoded.
#[must_use]
pub fn mint_session_id() -> SessionId {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SessionId::new(hex::encode(bytes))
}
