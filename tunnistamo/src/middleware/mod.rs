pub mod auth;

pub use auth::{
    profile_auth_middleware, token_auth_middleware, user_auth_middleware, AuthContext, AuthUser,
};
