//! Payload types and runners shared by the unit tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::describe::{Describe, FieldDecl, TypeArg};
use super::runner::TaskRunner;
use crate::domain::envelope::TaskEnvelope;
use crate::domain::errors::TaskError;

pub const CHARGE_TASK: &str = "billing.ChargeTask";
pub const BATCH_TASK: &str = "shop.BatchTask";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: u64,
    pub currency: String,
}

impl Describe for Money {
    fn declare() -> TypeArg {
        TypeArg::record(
            "billing.Money",
            [FieldDecl::of::<u64>("amount"), FieldDecl::of::<String>("currency")],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub charged: Money,
}

impl Describe for Receipt {
    fn declare() -> TypeArg {
        TypeArg::record(
            "billing.Receipt",
            [FieldDecl::of::<String>("id"), FieldDecl::of::<Money>("charged")],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub sku: String,
    pub qty: u32,
}

impl Describe for Item {
    fn declare() -> TypeArg {
        TypeArg::record(
            "shop.Item",
            [FieldDecl::of::<String>("sku"), FieldDecl::of::<u32>("qty")],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl<T: Describe> Describe for Page<T> {
    fn declare() -> TypeArg {
        TypeArg::generic(
            "Page",
            [
                FieldDecl::new("items", TypeArg::list(TypeArg::Param(0))),
                FieldDecl::of::<Option<String>>("next"),
            ],
            [TypeArg::of::<T>()],
        )
    }
}

/// Self-referential on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub children: Vec<Tree>,
}

impl Describe for Tree {
    fn declare() -> TypeArg {
        TypeArg::record("Tree", [FieldDecl::of::<Vec<Tree>>("children")])
    }
}

pub struct ChargeRunner;

#[async_trait]
impl TaskRunner<Money, Receipt> for ChargeRunner {
    async fn run_task(&self, envelope: TaskEnvelope<Money, Receipt>) -> Result<Receipt, TaskError> {
        let money = envelope
            .into_param()
            .ok_or_else(|| TaskError::data("charge without money"))?;
        if money.amount == 0 {
            return Err(TaskError::data("nothing to charge"));
        }
        Ok(Receipt {
            id: format!("rcpt-{}-{}", money.currency, money.amount),
            charged: money,
        })
    }
}

/// Counts every item on every page of batches.
pub struct BatchRunner;

#[async_trait]
impl TaskRunner<Page<Vec<Item>>, u64> for BatchRunner {
    async fn run_task(&self, envelope: TaskEnvelope<Page<Vec<Item>>, u64>) -> Result<u64, TaskError> {
        let page = envelope
            .into_param()
            .ok_or_else(|| TaskError::data("empty batch"))?;
        Ok(page
            .items
            .iter()
            .flatten()
            .map(|item| u64::from(item.qty))
            .sum())
    }
}
