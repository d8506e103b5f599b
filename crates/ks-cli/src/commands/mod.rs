//! CLI command implementations

mod settings;
mod stream;

pub use settings::Settings;
pub use stream::{attach_command, exec_command, StreamArgs};
