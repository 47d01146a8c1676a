//! File attached to an assignment or an event

use serde::{Deserialize, Serialize};

/// Metadata of an attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

/// Kind of record an attachment hangs off, which decides its download path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOwner {
    Assignment,
    Event,
}

impl AttachmentOwner {
    /// Resource call (relative to the student scope) serving the file
    pub fn call(&self, file_id: i64) -> String {
        match self {
            AttachmentOwner::Assignment => format!("compito/allegato/{}", file_id),
            AttachmentOwner::Event => format!("eventi-classe/allegato/{}", file_id),
        }
    }
}
