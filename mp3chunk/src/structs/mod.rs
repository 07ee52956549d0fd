pub mod format;
pub mod header;
