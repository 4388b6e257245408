pub mod admin;
pub mod auth;
pub mod customer;
pub mod documents;
pub mod professional;
pub mod public;
