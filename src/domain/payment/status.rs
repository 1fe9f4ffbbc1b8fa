//! Provider status vocabulary
//!
//! Webhook strings are parsed here, once, into closed enums. Everything past
//! this point matches exhaustively.

use std::fmt;

use crate::domain::booking::BookingStatus;

/// `transaction_status` as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Settlement,
    Capture,
    Pending,
    Deny,
    Cancel,
    Expire,
    /// Anything this service does not act on (refund, authorize, ...)
    Other,
}

impl TransactionStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "settlement" => Self::Settlement,
            "capture" => Self::Capture,
            "pending" => Self::Pending,
            "deny" => Self::Deny,
            "cancel" => Self::Cancel,
            "expire" => Self::Expire,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settlement => "settlement",
            Self::Capture => "capture",
            Self::Pending => "pending",
            Self::Deny => "deny",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `fraud_status`, only meaningful together with `capture`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
    /// Absent or unrecognised
    Unspecified,
}

impl FraudStatus {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("accept") => Self::Accept,
            Some("challenge") => Self::Challenge,
            Some("deny") => Self::Deny,
            _ => Self::Unspecified,
        }
    }
}

/// Parsed settlement callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub order_id: String,
    pub transaction_status: TransactionStatus,
    pub fraud_status: FraudStatus,
}

impl PaymentNotification {
    pub fn parse(order_id: impl Into<String>, transaction_status: &str, fraud_status: Option<&str>) -> Self {
        Self {
            order_id: order_id.into(),
            transaction_status: TransactionStatus::parse(transaction_status),
            fraud_status: FraudStatus::parse(fraud_status),
        }
    }

    /// Booking status this notification asks for.
    ///
    /// | transaction_status     | fraud_status | result  |
    /// |------------------------|--------------|---------|
    /// | settlement             | any          | paid    |
    /// | capture                | accept       | paid    |
    /// | capture                | other        | pending |
    /// | deny / cancel / expire | any          | failed  |
    /// | anything else          | any          | pending |
    pub fn target_status(&self) -> BookingStatus {
        match (self.transaction_status, self.fraud_status) {
            (TransactionStatus::Settlement, _) => BookingStatus::Paid,
            (TransactionStatus::Capture, FraudStatus::Accept) => BookingStatus::Paid,
            (TransactionStatus::Capture, _) => BookingStatus::Pending,
            (TransactionStatus::Deny | TransactionStatus::Cancel | TransactionStatus::Expire, _) => {
                BookingStatus::Failed
            }
            (TransactionStatus::Pending | TransactionStatus::Other, _) => BookingStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(tx: &str, fraud: Option<&str>) -> BookingStatus {
        PaymentNotification::parse("RESV1", tx, fraud).target_status()
    }

    #[test]
    fn mapping_table() {
        assert_eq!(target("settlement", None), BookingStatus::Paid);
        assert_eq!(target("settlement", Some("challenge")), BookingStatus::Paid);
        assert_eq!(target("capture", Some("accept")), BookingStatus::Paid);
        assert_eq!(target("capture", Some("challenge")), BookingStatus::Pending);
        assert_eq!(target("capture", None), BookingStatus::Pending);
        assert_eq!(target("pending", None), BookingStatus::Pending);
        assert_eq!(target("deny", None), BookingStatus::Failed);
        assert_eq!(target("cancel", Some("accept")), BookingStatus::Failed);
        assert_eq!(target("expire", None), BookingStatus::Failed);
        assert_eq!(target("refund", None), BookingStatus::Pending);
        assert_eq!(target("", None), BookingStatus::Pending);
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(TransactionStatus::parse(" Settlement "), TransactionStatus::Settlement);
        assert_eq!(FraudStatus::parse(Some("ACCEPT")), FraudStatus::Accept);
        assert_eq!(FraudStatus::parse(Some("unknown")), FraudStatus::Unspecified);
    }
}
