//! Wire-level data model for the ESB mediation runtime.
//!
//! `esb-common` has no knowledge of mediation control flow — it defines the
//! `Message` envelope, its property values, and the error taxonomy that
//! `esb-core` and (eventually) transport-adapter crates build on.

pub mod error;
pub mod logging;
pub mod message;

pub use error::{EsbError, Result};
pub use message::{
    Direction, HeaderMap, InvalidArgument, Message, PropertyValue, DEFAULT_ENDPOINT,
    FIX_SESSION_ID, HTTP_METHOD, HTTP_STATUS_CODE, HTTP_URI, JMS_CORRELATION_ID, JMS_REPLY_TO,
    MAIL_ATTACHMENTS, MAIL_FROM, MAIL_SUBJECT, ORIGINAL_MESSAGE, STOP_FLOW,
};
