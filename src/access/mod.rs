//! # Access Control Module
//!
//! Role-based access control for the portal: a static path-prefix role table,
//! the session-token seam to the external authentication layer, and the one
//! authoritative role directory used to mint role claims at sign-in.
//!
//! The table uses longest-prefix matching and rejects duplicate prefixes at
//! construction, so overlapping rules resolve deterministically.

mod config;
mod error;
mod roles;
mod session;
mod table;

pub use config::{AccessConfig, PathRuleConfig};
pub use error::{AccessError, AccessResult};
pub use roles::RoleDirectory;
pub use session::{DirectorySource, SessionSource, SessionToken, TrustedHeaderSource};
pub use table::{PathRule, RoleAccessTable};
