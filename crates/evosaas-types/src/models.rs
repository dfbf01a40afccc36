use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Professional,
    Enterprise,
}

/// Stored user record. The password hash never leaves the store layer;
/// handlers expose `api::UserProfile` instead, so this type is deliberately
/// not serializable.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Connected,
    Disconnected,
}

/// A tenant's named connection slot to the external WhatsApp gateway.
/// Status always starts `pending`; transitions would arrive via gateway
/// webhooks, which are not wired up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub instance_name: String,
    pub status: InstanceStatus,
    pub phone_number: Option<String>,
    pub qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

/// Outbound message record. Status is fixed to `sent` at creation; delivery
/// confirmations would come from the gateway webhook, which only logs today.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub phone_number: String,
    pub message: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}
