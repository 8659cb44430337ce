pub mod debounce;
pub mod error;
pub mod result;
pub mod storage;

pub use debounce::Debouncer;
pub use error::*;
pub use result::*;
pub use storage::*;
