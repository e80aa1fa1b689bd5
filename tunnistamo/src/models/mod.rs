pub mod access_token;
pub mod application;
pub mod interest;
pub mod login_method;
pub mod profile;
pub mod user;

pub use access_token::AccessToken;
pub use application::{AppToAppPermission, Application};
pub use interest::{Concept, ConceptRef, Division};
pub use login_method::{LoginMethod, LoginMethodResponse};
pub use profile::{ContactInfo, ContactMethod, Language, Profile, ProfileResponse, ProfileUpdateRequest};
pub use user::{User, UserResponse};
