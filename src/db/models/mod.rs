//! Database models split into domain-specific modules.

pub mod community;
pub mod notification;
pub mod payment;
pub mod receipt;
pub mod residence;
pub mod user;

pub use community::*;
pub use notification::*;
pub use payment::*;
pub use receipt::*;
pub use residence::*;
pub use user::*;
