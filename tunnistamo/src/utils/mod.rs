pub mod password;
pub mod validation;

pub use password::{verify_password, EncodedPassword, Password};
pub use validation::ValidatedJson;
