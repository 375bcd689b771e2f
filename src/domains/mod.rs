//! Business domains. Each owns its row model and service functions; the HTTP
//! layer in `server::routes` is a thin adapter on top.

pub mod audit;
pub mod auth;
pub mod non_conformities;
pub mod suppliers;
