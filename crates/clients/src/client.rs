use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bilio_core::{ClientId, DomainError, DomainResult, Entity, Owned, UserId, currency_or_default};

/// Contact details for a client; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

/// A billed party owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub user_id: UserId,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or fully replacing a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInput {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub currency: String,
}

impl ClientInput {
    fn validated_name(&self) -> DomainResult<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        Ok(name.to_string())
    }
}

impl Client {
    /// Build a new client for `user_id` from caller input.
    pub fn register(user_id: UserId, input: ClientInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.validated_name()?;
        Ok(Self {
            id: ClientId::new(),
            user_id,
            name,
            contact: input.contact,
            currency: currency_or_default(&input.currency),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace every mutable field from `input`.
    pub fn replace(&mut self, input: ClientInput, now: DateTime<Utc>) -> DomainResult<()> {
        self.name = input.validated_name()?;
        self.contact = input.contact;
        self.currency = currency_or_default(&input.currency);
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Client {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> ClientInput {
        ClientInput {
            name: name.to_string(),
            contact: ContactInfo {
                email: Some("billing@acme.test".to_string()),
                ..ContactInfo::default()
            },
            currency: String::new(),
        }
    }

    #[test]
    fn register_defaults_currency_and_trims_name() {
        let user = UserId::new();
        let client = Client::register(user, input("  Acme  "), Utc::now()).unwrap();
        assert_eq!(client.name, "Acme");
        assert_eq!(client.currency, "USD");
        assert!(client.is_owned_by(user));
        assert!(!client.is_owned_by(UserId::new()));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Client::register(UserId::new(), input("   "), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("name is required"));
    }

    #[test]
    fn replace_overwrites_contact_details() {
        let mut client = Client::register(UserId::new(), input("Acme"), Utc::now()).unwrap();
        let mut next = input("Acme Ltd");
        next.contact = ContactInfo::default();
        next.currency = "EUR".to_string();

        client.replace(next, Utc::now()).unwrap();
        assert_eq!(client.name, "Acme Ltd");
        assert_eq!(client.contact, ContactInfo::default());
        assert_eq!(client.currency, "EUR");
    }
}
