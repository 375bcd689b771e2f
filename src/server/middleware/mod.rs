// HTTP middleware.
pub mod jwt_auth;
pub mod request_id;

pub use jwt_auth::jwt_auth_middleware;
pub use request_id::request_id_middleware;
