//! Line-oriented text protocol for a control plane schema.
//!
//! ```text
//! /input/1/gain              get        -> /input/1/gain=0
//! /input/1/gain=-6.5         set        -> /input/1/gain=-6.5
//! ?/input/1/gain             describe   -> ?{'/input/1/gain': [{ 'name' : 'gain', ... }]}
//! +/input/.*/gain 30 10000   subscribe  -> deliveries print as gets
//! -/input/1/gain             unsubscribe
//! :sleep  :quit  :exit       commands
//! ```
//!
//! Any address containing a regex metacharacter is matched, anchored, against
//! every published address.

pub mod clock;
pub mod error;
pub mod escape;
pub mod mixer;
pub mod session;

pub use clock::SessionClock;
pub use error::TextError;
pub use mixer::{generate, MixerLayout};
pub use session::{CapturedLines, Flow, LineSink, SessionOptions, TextSession};
