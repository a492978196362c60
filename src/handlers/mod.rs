pub mod auth;
pub mod collections;
pub mod health;
