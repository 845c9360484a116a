//! Session lifecycle primitives: the PKCE-style catalog-server-to-tangent handoff, and the
//! catalog-server session manager built on top of it.

mod manager;
mod pkce;

pub use manager::{
    CreateSessionRequest, RedeemedSession, SessionHandoff, SessionManager, ADOPT_VIEW_ACTION,
};
pub use pkce::{AuthCodeEntry, AuthCodeTable, DEFAULT_TTL_MINUTES};
