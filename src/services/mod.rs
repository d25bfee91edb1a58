pub mod goals;
pub mod users;

pub use goals::*;
pub use users::*;
