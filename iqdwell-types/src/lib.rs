pub mod endianness;
pub mod error;
pub mod header;
pub mod link_speed;
pub mod version_string;

pub use endianness::*;
pub use error::*;
pub use header::*;
pub use link_speed::*;
pub use version_string::*;
