use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bilio_core::{ClientId, ExpenseId, UserId};
use bilio_expenses::{Expense, ExpenseFilter, ExpenseInput};

use super::{ServiceError, ServiceResult};
use crate::store::{ClientStore, ExpenseStore};

/// Expense ledger.
#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseStore>,
    clients: Arc<dyn ClientStore>,
}

impl ExpenseService {
    pub fn new(expenses: Arc<dyn ExpenseStore>, clients: Arc<dyn ClientStore>) -> Self {
        Self { expenses, clients }
    }

    #[instrument(skip(self, input), fields(user_id = %user_id), err)]
    pub async fn create(&self, user_id: UserId, input: ExpenseInput) -> ServiceResult<Expense> {
        input.validate()?;
        self.ensure_client(user_id, input.client_id).await?;

        let expense = Expense::record(user_id, input, Utc::now())?;
        self.expenses.insert(&expense).await?;
        tracing::info!(expense_id = %expense.id, amount = %expense.amount, "expense recorded");
        Ok(expense)
    }

    /// Full replacement; omitted optional fields are cleared.
    ///
    /// The expense is looked up first, so an unknown id is `NotFound` whatever
    /// the payload holds.
    #[instrument(skip(self, input), fields(user_id = %user_id, expense_id = %id), err)]
    pub async fn update(&self, id: ExpenseId, user_id: UserId, input: ExpenseInput) -> ServiceResult<Expense> {
        let mut expense = self.get(id, user_id).await?;

        input.validate()?;
        self.ensure_client(user_id, input.client_id).await?;

        expense.replace(input, Utc::now())?;
        self.expenses.update(&expense).await?;
        Ok(expense)
    }

    #[instrument(skip(self), fields(user_id = %user_id, expense_id = %id), err)]
    pub async fn get(&self, id: ExpenseId, user_id: UserId) -> ServiceResult<Expense> {
        self.expenses
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("expense not found"))
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id), err)]
    pub async fn list(&self, user_id: UserId, filter: &ExpenseFilter) -> ServiceResult<Vec<Expense>> {
        Ok(self.expenses.list(user_id, filter).await?)
    }

    async fn ensure_client(&self, user_id: UserId, client_id: Option<ClientId>) -> ServiceResult<()> {
        let Some(client_id) = client_id else {
            return Ok(());
        };
        match self.clients.get(user_id, client_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("client not found")),
        }
    }
}
