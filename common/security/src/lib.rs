pub mod error;
pub mod gate;
pub mod roles;

pub use error::SecurityError;
pub use gate::{require_role, AdminContext, RoleDirectory};
pub use roles::{ensure_role, Role, ROLE_ADMIN, ROLE_USER};
