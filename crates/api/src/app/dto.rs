use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bilio_core::{ClientId, DateRange};
use bilio_expenses::ExpenseFilter;
use bilio_infra::store::InsertOutcome;
use bilio_invoicing::{InvoiceFilter, InvoiceStatus};
use bilio_promotions::{Promocode, WaitlistEntry};

use crate::app::errors;

// -------------------------
// Query DTOs
// -------------------------

/// Query string shared by list and report endpoints. Values stay raw so a bad
/// one can be reported with the field name.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub category: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl ListQuery {
    pub fn range(&self) -> Result<DateRange, axum::response::Response> {
        Ok(DateRange::new(
            parse_date("from_date", self.from_date.as_deref())?,
            parse_date("to_date", self.to_date.as_deref())?,
        ))
    }

    pub fn client_id(&self) -> Result<Option<ClientId>, axum::response::Response> {
        match non_blank(self.client_id.as_deref()) {
            None => Ok(None),
            Some(raw) => parse_id(raw, "client_id").map(Some),
        }
    }

    pub fn invoice_filter(&self) -> Result<InvoiceFilter, axum::response::Response> {
        let status = match non_blank(self.status.as_deref()) {
            None => None,
            Some(raw) => Some(
                raw.parse::<InvoiceStatus>()
                    .map_err(|e| errors::bad_request(e.to_string()))?,
            ),
        };
        Ok(InvoiceFilter {
            status,
            client_id: self.client_id()?,
            issued: self.range()?,
        })
    }

    pub fn expense_filter(&self) -> Result<ExpenseFilter, axum::response::Response> {
        Ok(ExpenseFilter {
            client_id: self.client_id()?,
            category: non_blank(self.category.as_deref()).map(str::to_string),
            incurred: self.range()?,
        })
    }
}

pub fn parse_id<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, axum::response::Response> {
    raw.trim()
        .parse()
        .map_err(|_| errors::bad_request(format!("invalid {field}")))
}

pub fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, axum::response::Response> {
    match non_blank(raw) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| errors::bad_request(format!("{field} must be YYYY-MM-DD"))),
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct WaitlistRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub promocode: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct PromocodeResponse {
    pub promocode: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Promocode> for PromocodeResponse {
    fn from(value: Promocode) -> Self {
        Self {
            promocode: value.code,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub message: &'static str,
    pub email: String,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub already_joined: bool,
}

impl From<InsertOutcome<WaitlistEntry>> for WaitlistResponse {
    fn from(outcome: InsertOutcome<WaitlistEntry>) -> Self {
        let already_joined = !outcome.is_created();
        let entry = outcome.into_inner();
        Self {
            message: if already_joined {
                "already on the waitlist"
            } else {
                "successfully joined the waitlist"
            },
            email: entry.email,
            joined_at: entry.joined_at,
            already_joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_are_ignored() {
        let query = ListQuery {
            status: Some(" ".to_string()),
            client_id: Some(String::new()),
            category: Some("  ".to_string()),
            from_date: None,
            to_date: Some(String::new()),
        };
        assert_eq!(query.invoice_filter().ok(), Some(InvoiceFilter::default()));
        assert_eq!(query.expense_filter().ok(), Some(ExpenseFilter::default()));
    }

    #[test]
    fn bad_values_are_rejected() {
        let query = ListQuery {
            from_date: Some("01/02/2024".to_string()),
            ..ListQuery::default()
        };
        assert!(query.range().is_err());

        let query = ListQuery {
            status: Some("archived".to_string()),
            ..ListQuery::default()
        };
        assert!(query.invoice_filter().is_err());

        let query = ListQuery {
            client_id: Some("nope".to_string()),
            ..ListQuery::default()
        };
        assert!(query.client_id().is_err());
    }

    #[test]
    fn dates_parse_inclusive_range() {
        let query = ListQuery {
            from_date: Some("2024-01-01".to_string()),
            to_date: Some("2024-01-31".to_string()),
            ..ListQuery::default()
        };
        let range = query.range().ok().unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }
}
