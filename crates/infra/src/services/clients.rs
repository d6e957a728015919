use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bilio_clients::{Client, ClientInput};
use bilio_core::{ClientId, UserId};

use super::{ServiceError, ServiceResult};
use crate::store::{ClientStore, StoreError};

const CLIENT_NOT_FOUND: &str = "client not found";

/// Client directory.
#[derive(Clone)]
pub struct ClientService {
    clients: Arc<dyn ClientStore>,
}

impl ClientService {
    pub fn new(clients: Arc<dyn ClientStore>) -> Self {
        Self { clients }
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn list(&self, user_id: UserId) -> ServiceResult<Vec<Client>> {
        Ok(self.clients.list(user_id).await?)
    }

    #[instrument(skip(self), fields(user_id = %user_id, client_id = %id), err)]
    pub async fn get(&self, id: ClientId, user_id: UserId) -> ServiceResult<Client> {
        self.clients
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(CLIENT_NOT_FOUND))
    }

    #[instrument(skip(self, input), fields(user_id = %user_id), err)]
    pub async fn create(&self, user_id: UserId, input: ClientInput) -> ServiceResult<Client> {
        let client = Client::register(user_id, input, Utc::now())?;
        self.clients.insert(&client).await?;
        tracing::info!(client_id = %client.id, "client created");
        Ok(client)
    }

    #[instrument(skip(self, input), fields(user_id = %user_id, client_id = %id), err)]
    pub async fn update(&self, id: ClientId, user_id: UserId, input: ClientInput) -> ServiceResult<Client> {
        let mut client = self.get(id, user_id).await?;
        client.replace(input, Utc::now())?;
        self.clients.update(&client).await.map_err(not_found_as_client)?;
        Ok(client)
    }

    #[instrument(skip(self), fields(user_id = %user_id, client_id = %id), err)]
    pub async fn delete(&self, id: ClientId, user_id: UserId) -> ServiceResult<()> {
        self.clients.delete(user_id, id).await.map_err(not_found_as_client)?;
        tracing::info!("client deleted");
        Ok(())
    }
}

fn not_found_as_client(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::not_found(CLIENT_NOT_FOUND),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedgerStore;

    fn service() -> ClientService {
        ClientService::new(Arc::new(InMemoryLedgerStore::new()))
    }

    fn input(name: &str) -> ClientInput {
        ClientInput {
            name: name.to_string(),
            ..ClientInput::default()
        }
    }

    #[tokio::test]
    async fn create_update_delete() {
        let svc = service();
        let user = UserId::new();

        let client = svc.create(user, input("Acme")).await.unwrap();
        assert_eq!(client.currency, "USD");

        let mut next = input("Acme Corp");
        next.currency = "EUR".to_string();
        let updated = svc.update(client.id, user, next).await.unwrap();
        assert_eq!(updated.name, "Acme Corp");
        assert_eq!(svc.get(client.id, user).await.unwrap().currency, "EUR");

        svc.delete(client.id, user).await.unwrap();
        assert_eq!(
            svc.get(client.id, user).await.unwrap_err(),
            ServiceError::not_found("client not found")
        );
        assert_eq!(svc.delete(client.id, user).await.unwrap_err().kind(), "not_found");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = service().create(UserId::new(), input("   ")).await.unwrap_err();
        assert_eq!(err, ServiceError::validation("name is required"));
    }

    #[tokio::test]
    async fn other_users_clients_are_invisible() {
        let svc = service();
        let owner = UserId::new();
        let client = svc.create(owner, input("Acme")).await.unwrap();

        let stranger = UserId::new();
        assert_eq!(svc.get(client.id, stranger).await.unwrap_err().kind(), "not_found");
        assert_eq!(
            svc.update(client.id, stranger, input("Hijack")).await.unwrap_err().kind(),
            "not_found"
        );
        assert!(svc.list(stranger).await.unwrap().is_empty());
        assert_eq!(svc.list(owner).await.unwrap().len(), 1);
    }
}
