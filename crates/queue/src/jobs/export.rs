//! Export generation job.

use emporium_core::{EXPORT_MESSAGE_TYPE, ExportJobPayload};
use serde::{Deserialize, Serialize};

/// Queue message carrying one export payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMessage {
    /// Message type tag (`export:generate`).
    #[serde(rename = "type")]
    pub kind: String,

    /// The export to run.
    pub payload: ExportJobPayload,
}

impl ExportMessage {
    /// Create an `export:generate` message.
    #[must_use]
    pub fn generate(payload: ExportJobPayload) -> Self {
        Self {
            kind: EXPORT_MESSAGE_TYPE.to_string(),
            payload,
        }
    }

    /// Whether this message asks for export generation.
    #[must_use]
    pub fn is_generate(&self) -> bool {
        self.kind == EXPORT_MESSAGE_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_db::entities::export_job::ExportFormat;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let message = ExportMessage::generate(ExportJobPayload {
            job_id: "job1".to_string(),
            resource: "users".to_string(),
            format: ExportFormat::Csv,
            filters: Some(json!({ "isActive": true })),
            columns: None,
            options: None,
            requested_by: None,
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "export:generate",
                "payload": {
                    "jobId": "job1",
                    "resource": "users",
                    "format": "csv",
                    "filters": { "isActive": true },
                },
            })
        );
    }

    #[test]
    fn test_decode_minimal_payload() {
        let message: ExportMessage = serde_json::from_value(json!({
            "type": "export:generate",
            "payload": { "jobId": "job2", "resource": "products" },
        }))
        .unwrap();

        assert!(message.is_generate());
        assert_eq!(message.payload.format, ExportFormat::Csv);
        assert!(message.payload.columns.is_none());
    }
}
