//! Command output collected from one SSH session

/// Output from a command execution
///
/// Standard output and standard error are interleaved into one buffer in the
/// order they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr
    pub output: String,

    /// Exit status reported by the remote side
    pub exit_code: Option<u32>,

    /// Signal name when the remote process was killed by a signal
    pub exit_signal: Option<String>,

    /// Trailing bytes of an incomplete UTF-8 sequence, completed by the next chunk
    partial: Vec<u8>,
}

impl CommandOutput {
    /// Create a new empty CommandOutput
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful output with exit status 0
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// Output of a command that exited with `code`
    pub fn exited(output: impl Into<String>, code: u32) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(code),
            ..Self::default()
        }
    }

    /// Append a chunk of remote output
    ///
    /// A multi-byte character split across chunks is held back until its
    /// remaining bytes arrive. Invalid sequences become U+FFFD.
    pub fn push(&mut self, data: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(data);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.output.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    self.output.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.output.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            self.partial = tail.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush bytes still held back by [`push`](Self::push) once no more output will arrive
    pub fn finish(&mut self) {
        if !self.partial.is_empty() {
            let partial = std::mem::take(&mut self.partial);
            self.output.push_str(&String::from_utf8_lossy(&partial));
        }
    }

    /// Check if the command succeeded (exit status 0)
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Why the command is considered failed
    pub fn failure_reason(&self) -> String {
        match (&self.exit_signal, self.exit_code) {
            (Some(signal), _) => format!("process killed by signal {}", signal),
            (None, Some(code)) => format!("process exited with status {}", code),
            (None, None) => "process exited without reporting an exit status".to_string(),
        }
    }
}
