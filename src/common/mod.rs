pub mod addr;
pub mod context;
pub mod error;

pub use addr::Family;
pub use context::{ContextError, DialContext};
pub use error::{DialError, DialErrorKind};
