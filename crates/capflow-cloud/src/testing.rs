//! Scripted fakes for tests
//!
//! Available to other crates through the `test-utils` feature.

use crate::command::CommandLine;
use crate::error::Result;
use crate::health::HttpProbe;
use crate::runner::{CommandExecutor, CommandOutput};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Rule {
    pattern: String,
    outputs: VecDeque<CommandOutput>,
}

/// Executor that answers from scripted rules instead of spawning.
///
/// A rule matches when its pattern is a substring of the rendered command
/// line; the first matching rule wins. Its outputs are handed out in
/// order and the last one repeats. Unmatched commands succeed with empty
/// output.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandLine>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<I>(self, pattern: &str, outputs: I) -> Self
    where
        I: IntoIterator<Item = CommandOutput>,
    {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            outputs: outputs.into_iter().collect(),
        });
        self
    }

    /// Every command executed so far, in order.
    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }

    /// Executed commands whose rendered line contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> Vec<CommandLine> {
        self.calls()
            .into_iter()
            .filter(|c| c.to_string().contains(pattern))
            .collect()
    }

    fn answer(&self, command: &CommandLine) -> CommandOutput {
        self.calls.lock().unwrap().push(command.clone());

        let line = command.to_string();
        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().find(|r| line.contains(&r.pattern)) else {
            return CommandOutput::default();
        };
        if rule.outputs.len() > 1 {
            rule.outputs.pop_front().unwrap_or_default()
        } else {
            rule.outputs.front().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn status(&self, command: &CommandLine) -> Result<i32> {
        Ok(self.answer(command).exit_code)
    }

    async fn output(&self, command: &CommandLine) -> Result<CommandOutput> {
        Ok(self.answer(command))
    }
}

/// HTTP probe returning scripted status codes; the last one repeats.
pub struct ScriptedProbe {
    statuses: Mutex<VecDeque<u16>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new<I: IntoIterator<Item = u16>>(statuses: I) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpProbe for ScriptedProbe {
    async fn get_status(&self, _url: &str) -> Result<u16> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.unwrap_or(200))
    }
}
