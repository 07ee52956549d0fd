//! Utility functions and supporting infrastructure.
//!
//! Provides bit-level reading for header parsing and the error types
//! shared by the window, the stream adapter and the parser.

pub mod bitstream_io;
pub mod errors;
