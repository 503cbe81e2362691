mod machine;
mod ticket;
mod types;
#[cfg(test)]
mod tests;

pub use machine::CaptureSession;
pub use ticket::UploadTicket;
pub use types::{
    truncate_description, Phase, Privacy, SessionDefaults, SessionSnapshot, UploadOutcome,
    MAX_DESCRIPTION_CHARS,
};
