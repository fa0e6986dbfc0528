pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AUTOSCROLL_PROXIMITY, ENDPOINT_URL, GENERATION_STOPPED_NOTICE, MAX_PROMPT_CHARS, Preferences,
    ThemePreference,
};
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
