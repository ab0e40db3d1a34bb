pub mod context;
pub mod error;
pub mod flight;

pub use context::AppContext;
pub use error::{ConfluenceError, Result};
