//! Shared helpers for unit tests

use tokio::process::Command;

use crate::ports::MediaEngine;

/// Engine whose every invocation runs `sh -c <script>`. Extra arguments
/// become `$0..$n`, so the output path is the last one.
pub struct ScriptEngine(String);

impl ScriptEngine {
    pub fn new(script: impl Into<String>) -> Self {
        Self(script.into())
    }
}

impl MediaEngine for ScriptEngine {
    fn ffmpeg(&self) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(&self.0);
        command
    }

    fn ffprobe(&self) -> Command {
        self.ffmpeg()
    }
}
