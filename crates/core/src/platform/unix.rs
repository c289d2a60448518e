//! Unix launching: shell scripts go through `sh`, everything else is
//! executed directly.

use std::process::Command;

pub fn application_command(path: &str) -> Command {
    if super::has_extension(path, &["sh"]) {
        let mut command = Command::new("sh");
        command.arg(path);
        command
    } else {
        Command::new(path)
    }
}
