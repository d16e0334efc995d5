//! Focus Terminal daemon
//!
//! Hosts a single, explicitly constructed rule sync core and exposes its
//! command channel to front ends.
//!
//! ```text
//! [ focus (terminal) ]  [ focus (terminal) ]  [ scripts ]
//!          \                    |                /
//!           newline-delimited JSON over a socket or stdio
//!                               |
//!                    [ focus-daemon (FocusServer) ]
//!                               |
//!                    [ focus-core (FilterService) ]
//!                      |                      |
//!               [ filters.toml ]       [ ruleset.json ]
//! ```
//!
//! Every line a client writes is one request object, every line the daemon
//! writes back is the matching reply. Requests from all connections funnel
//! into one queue, so commands never interleave.

pub mod error;
pub mod server;

pub use error::{Error, Result};
pub use server::FocusServer;
