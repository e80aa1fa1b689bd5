//! Services layer for the SSO gateway.
//!
//! Store access, sessions, token minting and the login gate.

pub mod app_token;
mod database;
pub mod error;
pub mod interest;
mod jwt;
pub mod login_gate;
mod memory;
pub mod metrics;
pub mod profile;
pub mod providers;
pub mod session;
pub mod store;

pub use database::Database;
pub use error::ServiceError;
pub use jwt::{AppToAppClaims, IssuedToken, JwtService};
pub use memory::MemoryStore;
pub use providers::{ProviderDescriptor, ProviderRegistry};
pub use session::{MockSessionStore, RedisSessionStore, Session, SessionStore};
pub use store::{Store, UserContact};
