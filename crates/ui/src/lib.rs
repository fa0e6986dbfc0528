pub mod app;
pub mod render;
pub mod syntax;
pub mod theme;
pub mod transcript;

pub use app::{App, Mode};
pub use render::MessageRenderer;
pub use syntax::SyntaxHighlighter;
pub use theme::Theme;
pub use transcript::{MessageEntry, MessageId, Notice, Role, Transcript};
