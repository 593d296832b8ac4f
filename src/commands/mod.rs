//! CLI commands implementation

pub mod ask;
pub mod evaluate;
pub mod ingest;
pub mod init;
pub mod questions;
pub mod search;
pub mod status;

pub use ask::*;
pub use evaluate::*;
pub use ingest::*;
pub use init::*;
pub use questions::*;
pub use search::*;
pub use status::*;
