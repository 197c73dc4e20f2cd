//! Command lines for external CLIs

use std::fmt;

/// Placeholder shown instead of secret arguments.
const MASK: &str = "***";

/// A program invocation: program, arguments, and optional stdin.
///
/// Displays as a shell-quoted line. Stdin and arguments added with
/// [`CommandLine::secret`] are never displayed, so registry passwords stay
/// out of the audit trail.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    secrets: Vec<usize>,
    stdin: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secrets: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an argument that renders as `***`.
    pub fn secret(mut self, arg: impl Into<String>) -> Self {
        self.secrets.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Feeds `input` to the process on stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter().enumerate().map(|(i, arg)| {
            if self.secrets.contains(&i) {
                MASK
            } else {
                arg.as_str()
            }
        });
        let words = std::iter::once(self.program.as_str()).chain(args);
        write!(f, "{}", shell_words::join(words))
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandLine").field(&self.to_string()).finish()
    }
}
