//! Wire models for the Consorcio REST API
//!
//! Field and status names mirror the backend's Portuguese wire contract;
//! Rust-side names are English. Status enums keep an untagged passthrough
//! variant so a backend rollout adding states does not break deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Paginated list envelope used by listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    #[serde(rename = "EM_OPERACAO")]
    Operating,
    #[serde(rename = "ATIVO_DISPONIVEL")]
    ActiveAvailable,
    #[serde(untagged)]
    Other(String),
}

impl GroupStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GroupStatus::Operating => "EM_OPERACAO",
            GroupStatus::ActiveAvailable => "ATIVO_DISPONIVEL",
            GroupStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub status: GroupStatus,
}

/// Body for `PUT /grupos/{id}/status`
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatusUpdate {
    #[serde(rename = "grupoId")]
    pub group_id: i64,
    pub status: GroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaStatus {
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "ATIVA_ADIMPLENTE_NAO_CONTEMPLADA")]
    ActiveCurrentNotDrawn,
    #[serde(untagged)]
    Other(String),
}

impl QuotaStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QuotaStatus::Pending => "PENDENTE",
            QuotaStatus::ActiveCurrentNotDrawn => "ATIVA_ADIMPLENTE_NAO_CONTEMPLADA",
            QuotaStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    /// Some endpoints call this `cotaId`
    #[serde(alias = "cotaId")]
    pub id: i64,
    #[serde(rename = "numero", default)]
    pub number: i64,
    pub status: QuotaStatus,
    #[serde(rename = "participante", default)]
    pub participant: Option<Participant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "PAGO")]
    Paid,
    #[serde(untagged)]
    Other(String),
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstallmentStatus::Pending => "PENDENTE",
            InstallmentStatus::Paid => "PAGO",
            InstallmentStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: i64,
    #[serde(rename = "numeroParcela")]
    pub number: i64,
    pub status: InstallmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_page_deserializes() {
        let json = r#"{
            "data": [
                { "id": 7, "nome": "Grupo QA abc123", "status": "EM_OPERACAO" }
            ]
        }"#;
        let page: Page<Group> = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Grupo QA abc123");
        assert_eq!(page.data[0].status, GroupStatus::Operating);
    }

    #[test]
    fn test_quota_id_alias() {
        let json = r#"{
            "cotaId": 42,
            "numero": 3,
            "status": "PENDENTE",
            "participante": { "nome": "Participante QA abc123" }
        }"#;
        let quota: Quota = serde_json::from_str(json).unwrap();
        assert_eq!(quota.id, 42);
        assert_eq!(quota.number, 3);
        assert_eq!(quota.status, QuotaStatus::Pending);
        assert_eq!(quota.participant.unwrap().name, "Participante QA abc123");
    }

    #[test]
    fn test_unknown_status_passes_through() {
        let quota: Quota =
            serde_json::from_str(r#"{ "id": 1, "numero": 1, "status": "CONTEMPLADA" }"#).unwrap();
        assert_eq!(quota.status, QuotaStatus::Other("CONTEMPLADA".to_string()));
        assert_eq!(quota.status.as_str(), "CONTEMPLADA");
    }

    #[test]
    fn test_status_update_wire_shape() {
        let body = GroupStatusUpdate {
            group_id: 9,
            status: GroupStatus::ActiveAvailable,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["grupoId"], 9);
        assert_eq!(json["status"], "ATIVO_DISPONIVEL");
    }

    #[test]
    fn test_installment_wire_names() {
        let json = r#"{ "id": 10, "numeroParcela": 1, "status": "PAGO" }"#;
        let installment: Installment = serde_json::from_str(json).unwrap();
        assert_eq!(installment.number, 1);
        assert_eq!(installment.status, InstallmentStatus::Paid);
    }
}
