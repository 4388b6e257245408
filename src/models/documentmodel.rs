use std::{fmt, str::FromStr};

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::usermodel::User;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    IdProof,
    AddressProof,
    Qualification,
}

impl DocumentType {
    pub const REQUIRED: [DocumentType; 3] = [
        DocumentType::IdProof,
        DocumentType::AddressProof,
        DocumentType::Qualification,
    ];

    pub fn to_str(&self) -> &str {
        match self {
            DocumentType::IdProof => "idProof",
            DocumentType::AddressProof => "addressProof",
            DocumentType::Qualification => "qualification",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idProof" => Ok(DocumentType::IdProof),
            "addressProof" => Ok(DocumentType::AddressProof),
            "qualification" => Ok(DocumentType::Qualification),
            other => Err(format!("Unknown document type: {}", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub document_type: DocumentType,
    pub filename: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub verified: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// Which required documents block approval.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub missing: Vec<DocumentType>,
    pub unverified: Vec<DocumentType>,
}

impl VerificationReport {
    pub fn of(documents: &[Document]) -> Self {
        let mut report = VerificationReport::default();
        for doc_type in DocumentType::REQUIRED {
            let mut of_type = documents.iter().filter(|d| d.document_type == doc_type).peekable();
            if of_type.peek().is_none() {
                report.missing.push(doc_type);
            } else if of_type.any(|d| !d.verified) {
                report.unverified.push(doc_type);
            }
        }
        report
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unverified.is_empty()
    }
}

/// True when every required type is present and every document of those types is verified.
pub fn fully_verified(documents: &[Document]) -> bool {
    VerificationReport::of(documents).is_complete()
}

#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Approved(User),
    Incomplete(VerificationReport),
    Missing,
}
