//! Outbound reply channel
//!
//! The engine reports outcomes through a single send_text capability and
//! never depends on message formatting beyond plain text.

use crate::core::error::Result;

#[allow(async_fn_in_trait)]
pub trait ReplyChannel {
    async fn send_text(&self, message: &str) -> Result<()>;
}

/// Reply channel writing to stdout; used by the CLI binary
pub struct ConsoleReply;

impl ReplyChannel for ConsoleReply {
    async fn send_text(&self, message: &str) -> Result<()> {
        println!("{}", message);
        Ok(())
    }
}
