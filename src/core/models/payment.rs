use crate::core::errors::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Accepted,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Accepted)
                | (PaymentStatus::Pending, PaymentStatus::Rejected)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Accepted => "accepted",
            PaymentStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "accepted" => Ok(PaymentStatus::Accepted),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(LedgerError::InvalidInput(
                "status".to_string(),
                crate::core::errors::FieldError::new(
                    "status",
                    "Invalid status",
                    format!("Unknown status {}", other),
                ),
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Payment {
    pub id: String,
    pub group_id: String,
    pub debtor_id: String,
    pub creditor_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    /// Absent when the store predates the actor columns.
    pub marked_by: Option<String>,
    pub accepted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_accepted(&self) -> bool {
        self.status == PaymentStatus::Accepted
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Returns the terminal copy of this payment. The original row is left
    /// untouched; a resolved payment cannot be resolved again.
    pub fn resolve(
        &self,
        next: PaymentStatus,
        resolved_by: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Payment, LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::PaymentAlreadyResolved(self.id.clone()));
        }
        Ok(Payment {
            status: next,
            accepted_by: resolved_by,
            resolved_at: Some(at),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending() -> Payment {
        Payment {
            id: "p1".to_string(),
            group_id: "g1".to_string(),
            debtor_id: "d".to_string(),
            creditor_id: "c".to_string(),
            amount: dec!(50),
            status: PaymentStatus::Pending,
            marked_by: Some("d".to_string()),
            accepted_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn only_pending_payments_transition() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Accepted, Rejected] {
            assert!(terminal.is_terminal());
            for next in [Pending, Accepted, Rejected] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn resolve_produces_terminal_copy() {
        let payment = pending();
        let accepted = payment
            .resolve(PaymentStatus::Accepted, Some("c".to_string()), Utc::now())
            .unwrap();
        assert_eq!(accepted.status, PaymentStatus::Accepted);
        assert_eq!(accepted.accepted_by.as_deref(), Some("c"));
        assert!(accepted.resolved_at.is_some());
        assert!(payment.is_pending());

        let again = accepted.resolve(PaymentStatus::Rejected, None, Utc::now());
        assert!(matches!(again, Err(LedgerError::PaymentAlreadyResolved(id)) if id == "p1"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Accepted".parse::<PaymentStatus>().unwrap(), PaymentStatus::Accepted);
        assert!("settled".parse::<PaymentStatus>().is_err());
    }
}
