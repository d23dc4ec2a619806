//! Minimal marker traits for the Builder/Formatter collaborators named
//! out of scope in §1/§6: the core never depends on a concrete codec
//! crate, only on these two narrow contracts, so a mediator like
//! `Transform` is testable against a trait object alone.

use esb_common::{Message, Result};

/// Bytes + content-type → Message.
pub trait Builder: Send + Sync {
    fn build(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Message>;
}

/// Message → bytes.
pub trait Formatter: Send + Sync {
    fn format(&self, msg: &Message) -> Result<Vec<u8>>;
}

#[cfg(test)]
pub struct IdentityBuilder;

#[cfg(test)]
impl Builder for IdentityBuilder {
    fn build(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Message> {
        let mut msg = Message::new(esb_common::Direction::Request);
        msg.content_type = content_type.map(|s| s.to_string());
        msg.set_payload(bytes.to_vec());
        Ok(msg)
    }
}

#[cfg(test)]
pub struct NoopFormatter;

#[cfg(test)]
impl Formatter for NoopFormatter {
    fn format(&self, msg: &Message) -> Result<Vec<u8>> {
        Ok(msg.payload.clone())
    }
}
