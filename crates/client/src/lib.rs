pub mod controller;
pub mod decode;
pub mod mock;
pub mod source;

pub use controller::{SessionEvent, SessionHandle, SessionId, SessionStatus, StreamController};
pub use decode::StreamDecoder;
pub use mock::{ScriptedOutcome, ScriptedSource};
pub use source::{ByteStream, HttpSource, TextSource};

pub use rill_core::{Error, Result};
