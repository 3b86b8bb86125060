//! Runners used by the loopback demo.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskbus_core::typed::{Describe, FieldDecl, TypeArg};
use taskbus_core::{TaskEnvelope, TaskError, TaskRunner};

pub const CHARGE_TASK: &str = "billing.ChargeTask";
pub const REFUND_TASK: &str = "billing.RefundTask";

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub charged: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Describe for Receipt {
    fn declare() -> TypeArg {
        TypeArg::record(
            "billing.Receipt",
            [
                FieldDecl::of::<String>("id"),
                FieldDecl::of::<Money>("charged"),
                FieldDecl::of::<Option<String>>("note"),
            ],
        )
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
            note: None,
        })
    }
}

/// Refunds go through a partner that only handles USD.
pub struct RefundRunner;

#[async_trait]
impl TaskRunner<Money, Receipt> for RefundRunner {
    async fn run_task(&self, envelope: TaskEnvelope<Money, Receipt>) -> Result<Receipt, TaskError> {
        let money = envelope
            .into_param()
            .ok_or_else(|| TaskError::data("refund without money"))?;
        if money.currency != "USD" {
            return Err(TaskError::partner(format!("cannot refund {}", money.currency)));
        }
        Ok(Receipt {
            id: format!("refund-{}", money.amount),
            charged: money,
            note: Some("refunded".to_string()),
        })
    }
}
