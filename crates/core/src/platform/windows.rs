//! Windows launching: batch files need `cmd.exe /c`, executables are
//! spawned directly.

use std::os::windows::process::CommandExt;
use std::process::Command;

const DETACHED_PROCESS: u32 = 0x0000_0008;
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub fn application_command(path: &str) -> Command {
    if super::has_extension(path, &["bat", "cmd"]) {
        let mut command = Command::new("cmd.exe");
        command.args(["/c", path]).creation_flags(CREATE_NO_WINDOW);
        command
    } else {
        let mut command = Command::new(path);
        command.creation_flags(DETACHED_PROCESS);
        command
    }
}
