//! Interactive chat loop.
//!
//! An explicit state machine: `AwaitingInput → Processing → (AwaitingInput | Terminated)`.
//! One line is read per iteration and every collaborator call is awaited
//! before the next read, so there is never more than one request in flight.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use docchat_config::ErrorPolicy;
use docchat_core::message::{Conversation, Message};
use docchat_core::provider::Provider;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, error, info};

use crate::assembler::PromptAssembler;

/// Shown before every read.
pub const PROMPT: &str = "You: ";

/// Where the loop reads user lines from.
#[async_trait]
pub trait LineSource: Send {
    /// The next line without its terminator, or `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Lines from the process's standard input.
pub struct StdinLines {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinLines {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Scripted input; empty means end of input.
#[async_trait]
impl LineSource for VecDeque<String> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.pop_front())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed `exit`.
    UserExit,
    /// The input source was exhausted.
    EndOfInput,
    /// A turn failed under [`ErrorPolicy::Terminate`].
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Turns that produced at least one assistant reply.
    pub turns_completed: usize,
    pub exit_reason: ExitReason,
}

enum LoopState {
    AwaitingInput,
    Processing(String),
    Terminated(ExitReason),
}

/// Owns one conversation and drives it from a [`LineSource`].
pub struct ChatLoop<O: Write = std::io::Stdout> {
    assembler: PromptAssembler,
    provider: Arc<dyn Provider>,
    conversation: Conversation,
    on_error: ErrorPolicy,
    out: O,
}

impl ChatLoop<std::io::Stdout> {
    /// A loop writing to stdout with the default retry policy.
    pub fn new(
        assembler: PromptAssembler,
        provider: Arc<dyn Provider>,
        conversation: Conversation,
    ) -> Self {
        Self {
            assembler,
            provider,
            conversation,
            on_error: ErrorPolicy::default(),
            out: std::io::stdout(),
        }
    }
}

impl<O: Write + Send> ChatLoop<O> {
    /// Send prompts, replies and errors to `out` instead.
    pub fn with_output<W: Write + Send>(self, out: W) -> ChatLoop<W> {
        ChatLoop {
            assembler: self.assembler,
            provider: self.provider,
            conversation: self.conversation,
            on_error: self.on_error,
            out,
        }
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    /// Run until `exit`, end of input, or a terminating failure.
    ///
    /// A read error ends the session and is returned as the error.
    pub async fn run(
        &mut self,
        input: &mut dyn LineSource,
    ) -> docchat_core::Result<SessionOutcome> {
        let mut turns_completed = 0;
        let mut state = LoopState::AwaitingInput;
        debug!(conversation = %self.conversation.id, "Chat session started");

        loop {
            state = match state {
                LoopState::AwaitingInput => {
                    write!(self.out, "{PROMPT}")?;
                    self.out.flush()?;

                    match input.next_line().await {
                        Ok(Some(line)) => classify(&line),
                        Ok(None) => LoopState::Terminated(ExitReason::EndOfInput),
                        Err(e) => {
                            error!(error = %e, "Failed to read input");
                            return Err(e.into());
                        }
                    }
                }

                LoopState::Processing(line) => match self.submit(&line).await {
                    Ok(replies) => {
                        for reply in &replies {
                            writeln!(self.out, "\nAssistant: {}", reply.content)?;
                        }
                        turns_completed += 1;
                        LoopState::AwaitingInput
                    }
                    Err(e) => {
                        writeln!(self.out, "Error: {e}")?;
                        error!(error = %e, "Chat turn failed");
                        match self.on_error {
                            ErrorPolicy::Retry => LoopState::AwaitingInput,
                            ErrorPolicy::Terminate => {
                                LoopState::Terminated(ExitReason::Failed(e.to_string()))
                            }
                        }
                    }
                },

                LoopState::Terminated(exit_reason) => {
                    info!(
                        conversation = %self.conversation.id,
                        turns = turns_completed,
                        reason = ?exit_reason,
                        "Chat session ended"
                    );
                    return Ok(SessionOutcome {
                        turns_completed,
                        exit_reason,
                    });
                }
            };
        }
    }

    /// One turn: assemble from the history as it stands, record the user
    /// message, then record every returned choice.
    ///
    /// If retrieval fails the line is not recorded at all. If the completion
    /// fails the user message stays in the history without a reply.
    ///
    /// Returns the assistant messages that were appended.
    pub async fn submit(&mut self, line: &str) -> docchat_core::Result<Vec<Message>> {
        let payload = self.assembler.assemble(line, &self.conversation).await?;
        self.conversation.append(Message::user(line));

        let response = self.provider.complete(payload).await?;
        debug!(
            choices = response.choices.len(),
            model = %response.model,
            "Completion received"
        );

        let replies: Vec<Message> = response.choices.into_iter().map(|c| c.message).collect();
        for reply in &replies {
            self.conversation.append(reply.clone());
        }
        Ok(replies)
    }
}

/// Decide what a raw input line means.
fn classify(line: &str) -> LoopState {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("exit") {
        LoopState::Terminated(ExitReason::UserExit)
    } else if trimmed.is_empty() {
        LoopState::AwaitingInput
    } else {
        LoopState::Processing(trimmed.to_string())
    }
}
