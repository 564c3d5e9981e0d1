//! Authentication for the SiteRM frontend API
//!
//! Bearer-token session: a durable token cell, a request pipeline that attaches
//! the token and reacts to 401s, and the boot-time session check.

mod gateway;
mod overlay;
mod session;
mod storage;

pub use gateway::{
    extract_message, AuthGateway, Identity, LOGIN_PATH, SESSION_EXPIRED_MESSAGE, WHOAMI_PATH,
};
pub use overlay::{LoginOverlay, OverlaySnapshot};
pub use session::{SessionController, SessionState};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
