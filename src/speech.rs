//! Reading messages aloud through an external text-to-speech program.

use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use crate::config::SpeechConfig;

pub struct Speaker {
    command: Option<(String, Vec<String>)>,
}

impl Speaker {
    pub fn new(config: &SpeechConfig) -> Self {
        let command = (config.enabled && !config.command.trim().is_empty())
            .then(|| (config.command.clone(), config.args.clone()));
        Self { command }
    }

    /// A speaker that stays quiet.
    pub fn silent() -> Self {
        Self { command: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// Speak `text` without waiting for playback to finish.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn speak(&self, text: &str) {
        let Some((program, args)) = &self.command else {
            return;
        };

        if let Err(e) = spawn_detached(program, args, text) {
            tracing::warn!(program = %program, "Failed to speak: {}", e);
        }
    }
}

/// Start `program` in its own session and reap it from a helper thread.
fn spawn_detached(program: &str, args: &[String], text: &str) -> std::io::Result<JoinHandle<()>> {
    // SAFETY: setsid() is async-signal-safe and creates a new session,
    // so playback is not tied to the terminal's process group.
    let mut child = unsafe {
        Command::new(program)
            .args(args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .pre_exec(|| {
                libc::setsid();
                Ok(())
            })
            .spawn()?
    };

    let program = program.to_string();
    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            tracing::debug!(program = %program, %status, "Speech command exited with failure")
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(program = %program, "Failed to wait for speech command: {}", e),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_speaker_is_silent() {
        let config = SpeechConfig {
            enabled: false,
            ..SpeechConfig::default()
        };
        assert!(!Speaker::new(&config).is_enabled());
        assert!(!Speaker::silent().is_enabled());
    }

    #[test]
    fn test_blank_command_is_silent() {
        let config = SpeechConfig {
            command: " ".to_string(),
            ..SpeechConfig::default()
        };
        assert!(!Speaker::new(&config).is_enabled());
    }

    #[test]
    fn test_finished_command_is_reaped() {
        let waiter = spawn_detached("true", &[], "hello").unwrap();
        waiter.join().unwrap();

        let waiter = spawn_detached("false", &[], "hello").unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn test_missing_program_is_not_fatal() {
        let config = SpeechConfig {
            command: "jestcalc-no-such-tts-program".to_string(),
            ..SpeechConfig::default()
        };
        let speaker = Speaker::new(&config);
        assert!(speaker.is_enabled());
        speaker.speak("hello");
    }
}
