pub mod auth;

pub use auth::{require_admin, require_transporter, session_middleware, Claims};
