use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A manually uploaded proof of payment awaiting or past admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProof {
    pub id: i64,
    pub booking_id: i64,
    pub status: ProofStatus,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Pending,
    Verified,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Verified => "verified",
            ProofStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ProofStatus::Pending),
            "verified" => Some(ProofStatus::Verified),
            "rejected" => Some(ProofStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProofRequest {
    pub payment_method: String,
    pub reference_number: Option<String>,
}

/// Outcome of an admin review, written onto the proof row.
#[derive(Debug, Clone)]
pub struct ProofReview {
    pub status: ProofStatus,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub admin_notes: Option<String>,
}
