pub mod identity;
pub mod password;
pub mod session;

pub use identity::*;
pub use password::*;
pub use session::*;
