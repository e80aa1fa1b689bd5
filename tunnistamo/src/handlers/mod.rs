pub mod jwt;
pub mod login;
pub mod metrics;
pub mod profile;
pub mod user;
