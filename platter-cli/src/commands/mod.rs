//! Command implementations for Platter CLI.

pub mod backends;
pub mod checksum;
pub mod sectors;
pub mod verify;

pub use backends::cmd_backends;
pub use checksum::cmd_checksum;
pub use sectors::cmd_sectors;
pub use verify::cmd_verify;
