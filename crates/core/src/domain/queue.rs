// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::job::PublishJob;
use sha2::{Digest, Sha512};

/// Length of the hex digest kept as the dedup key
pub const PAYLOAD_HASH_LEN: usize = 64;

const MAX_QUEUE_NAME_LEN: usize = 64;

/// Dedup key for a payload: SHA-512 over `queue || payload`, hex encoded and truncated.
///
/// Queue names are restricted to `[A-Za-z0-9_-]` and payloads are JSON objects,
/// so the concatenation is unambiguous.
pub fn payload_hash(queue: &str, payload: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(queue.as_bytes());
    hasher.update(payload.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(PAYLOAD_HASH_LEN);
    digest
}

/// Validate a queue name (alphanumeric, underscore, dash)
pub fn validate_queue_name(queue: &str) -> Result<()> {
    if queue.is_empty() {
        return Err(DomainError::InvalidQueueName(
            "Queue name cannot be empty".to_string(),
        ));
    }
    if queue.len() > MAX_QUEUE_NAME_LEN {
        return Err(DomainError::InvalidQueueName(format!(
            "Queue name too long ({} > {})",
            queue.len(),
            MAX_QUEUE_NAME_LEN
        )));
    }
    if !queue
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::InvalidQueueName(format!(
            "Queue name must be alphanumeric, underscore or dash: {}",
            queue
        )));
    }
    Ok(())
}

/// Record to insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueRecord {
    pub queue: String,
    pub payload_hash: String,
    pub payload: String,
    pub created_at: i64, // epoch ms
}

impl NewQueueRecord {
    pub fn from_job(
        queue: impl Into<String>,
        job: &PublishJob,
        created_at: i64,
    ) -> std::result::Result<Self, serde_json::Error> {
        let queue = queue.into();
        let payload = serde_json::to_string(job)?;
        Ok(Self {
            payload_hash: payload_hash(&queue, &payload),
            queue,
            payload,
            created_at,
        })
    }
}

/// Persisted queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub id: i64,
    pub queue: String,
    pub payload_hash: String,
    pub payload: String,
    pub created_at: i64,
    /// Epoch ms; 0 while unclaimed
    pub lease_expires_at: i64,
}

impl QueueRecord {
    pub fn is_leased(&self, now_millis: i64) -> bool {
        self.lease_expires_at > now_millis
    }

    pub fn decode(&self) -> std::result::Result<PublishJob, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// A record handed to a worker together with its decoded job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: i64,
    pub job: PublishJob,
    pub lease_expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_hash_is_stable_and_truncated() {
        let a = payload_hash("publish", r#"{"kind":"route","route":"/a"}"#);
        let b = payload_hash("publish", r#"{"kind":"route","route":"/a"}"#);
        assert_eq!(a, b);
        assert_eq!(a.len(), PAYLOAD_HASH_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_payload_hash_depends_on_queue() {
        let payload = r#"{"kind":"route","route":"/a"}"#;
        assert_ne!(payload_hash("publish", payload), payload_hash("files", payload));
    }

    #[test]
    fn test_validate_queue_name() {
        assert!(validate_queue_name("publish").is_ok());
        assert!(validate_queue_name("seed_2024-01").is_ok());

        let empty = validate_queue_name("").unwrap_err();
        assert!(empty.to_string().contains("empty"));

        let long = validate_queue_name(&"a".repeat(65)).unwrap_err();
        assert!(long.to_string().contains("too long"));

        let invalid = validate_queue_name("invalid@queue!").unwrap_err();
        assert!(invalid.to_string().contains("alphanumeric"));
    }

    #[test]
    fn test_new_record_from_job() {
        let job = PublishJob::route("/hello");
        let record = NewQueueRecord::from_job("publish", &job, 1000).unwrap();
        assert_eq!(record.payload, r#"{"kind":"route","route":"/hello"}"#);
        assert_eq!(record.payload_hash, payload_hash("publish", &record.payload));
        assert_eq!(record.created_at, 1000);
    }
}
