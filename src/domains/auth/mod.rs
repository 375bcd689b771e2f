pub mod service;

pub use service::{authenticate, AuthUser, Claims, JwtService};
