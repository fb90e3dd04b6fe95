//! Line-oriented chat transport over any async reader/writer (stdin/stdout
//! in the binary). A message is one or more lines ended by a blank line or
//! end of input.

use crate::reply::{ReplyEnvelope, Reviewer};
use anyhow::Result;
use std::collections::HashSet;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Sender name used for the local terminal.
pub const LOCAL_SENDER: &str = "local";

/// Output side of a chat: greets each sender once and writes replies as
/// two segments.
pub struct ChatSession<W> {
    output: W,
    greeted: HashSet<String>,
}

impl<W: AsyncWrite + Unpin> ChatSession<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            greeted: HashSet::new(),
        }
    }

    /// Send the welcome line the first time `sender` starts a session.
    pub async fn start(&mut self, reviewer: &Reviewer, sender: &str) -> Result<bool> {
        if !self.greeted.insert(sender.to_string()) {
            return Ok(false);
        }
        self.write_segment(reviewer.session_greeting()).await?;
        self.output.flush().await?;
        Ok(true)
    }

    pub async fn deliver(&mut self, reply: &ReplyEnvelope) -> Result<()> {
        for segment in reply.lines() {
            self.write_segment(segment).await?;
        }
        self.output.flush().await?;
        Ok(())
    }

    async fn write_segment(&mut self, segment: &str) -> Result<()> {
        self.output.write_all(segment.as_bytes()).await?;
        self.output.write_all(b"\n\n").await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

/// Read messages until end of input, replying to each. Returns the number of
/// replies sent.
pub async fn run_chat<R, W>(reviewer: &Reviewer, input: R, output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = ChatSession::new(output);
    session.start(reviewer, LOCAL_SENDER).await?;

    let mut lines = input.lines();
    let mut buffer: Vec<String> = Vec::new();
    let mut replies = 0;

    loop {
        let next = lines.next_line().await?;
        let end_of_message = match &next {
            Some(line) if line.trim().is_empty() => true,
            Some(line) => {
                buffer.push(line.clone());
                false
            }
            None => true,
        };

        if end_of_message && !buffer.is_empty() {
            let message = buffer.join("\n");
            buffer.clear();
            debug!(chars = message.len(), "chat message received");
            if let Some(reply) = reviewer.respond(&message).await {
                session.deliver(&reply).await?;
                replies += 1;
            }
        }

        if next.is_none() {
            break;
        }
    }

    info!(replies, "chat input closed");
    Ok(replies)
}
