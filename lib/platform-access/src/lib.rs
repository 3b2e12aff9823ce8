//! Authentication and authorization core for the vantage dashboard backend.
//!
//! This crate is framework independent. It provides:
//! - Principals and the HS256 token service that carries them (`Principal`, `JwtTokens`)
//! - Organization-scoped roles and the privilege hierarchy (`RoleName`, `RequiredRole`)
//! - Users, organizations and the read-only store contracts (`DataStore`)
//! - Mappings from provider groups to role grants (`MappingResolver`)
//! - The rotating superadmin signature challenge (`SuperAdminChallenge`)
//! - The PKCE verifier cipher and CSPRNG helpers
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vantage_platform_access::{JwtTokens, Principal, Tokenizer};
//!
//! let tokens = JwtTokens::new("secret");
//! let principal = Principal::new("billysteve").with_issuer("google");
//! let token = tokens.create(&principal, Duration::from_secs(3600)).unwrap();
//! let validated = tokens.validate(&token, Duration::from_secs(3600)).unwrap();
//! assert_eq!(validated, principal);
//! ```

pub mod challenge;
pub mod crypto;
pub mod error;
pub mod mapping;
pub mod memory;
pub mod principal;
pub mod role;
pub mod store;
pub mod token;
pub mod user;

pub use challenge::{
    Challenge, SIGNATURE_SCHEME, SuperAdminChallenge, load_public_key, parse_public_key,
};
pub use crypto::{PkceCipher, random_bytes, random_string};
pub use error::{AuthenticationError, AuthorizationError, StoreError};
pub use mapping::{
    AUTH0_PROVIDER, MAPPING_WILDCARD, Mapping, MappingRequest, MappingResolver, apply_mapping,
};
pub use memory::MemoryStore;
pub use principal::Principal;
pub use role::{RequiredRole, Role, RoleName, has_authorized_role};
pub use store::{DataStore, MappingsStore, OrganizationsStore, UsersStore};
pub use token::{JwtTokens, STATE_LIFESPAN, Token, Tokenizer};
pub use user::{OAUTH2_SCHEME, Organization, User, UserQuery};
