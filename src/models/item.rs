use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Database-assigned item identifier (BIGSERIAL).
pub type ItemId = i64;

pub const NAME_MAX_CHARS: usize = 100;
pub const PRICE_MIN: f64 = 1.0;

/// A stored item. Rows with `deleted_at` set are soft-deleted and never leave
/// the store through the read paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub name: String,
    pub price: f64,
    pub in_stock: bool,
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Create/update body as received. Every field is optional at this stage so a
/// missing field surfaces as a validation error instead of a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub in_stock: Option<bool>,
}

/// Validated fields, the only shape the store accepts for writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub name: String,
    pub price: f64,
    pub in_stock: bool,
}

impl ItemInput {
    pub fn validate(self) -> AppResult<ItemFields> {
        let mut problems = Vec::new();

        match &self.name {
            None => problems.push("name is required".to_string()),
            Some(name) => {
                let len = name.chars().count();
                if len == 0 || len > NAME_MAX_CHARS {
                    problems.push(format!(
                        "name must be between 1 and {NAME_MAX_CHARS} characters, got {len}"
                    ));
                }
                if name.contains('\0') {
                    problems.push("name must not contain NUL characters".to_string());
                }
            }
        }

        match self.price {
            None => problems.push("price is required".to_string()),
            Some(price) if !price.is_finite() || price < PRICE_MIN => {
                problems.push(format!("price must be at least {PRICE_MIN}, got {price}"));
            }
            Some(_) => {}
        }

        if self.in_stock.is_none() {
            problems.push("inStock is required".to_string());
        }

        match (self.name, self.price, self.in_stock) {
            (Some(name), Some(price), Some(in_stock)) if problems.is_empty() => Ok(ItemFields {
                name,
                price,
                in_stock,
            }),
            _ => Err(AppError::Validation(problems.join("; "))),
        }
    }
}
