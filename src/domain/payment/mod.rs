//! Payment provider vocabulary and the payment-intent port

pub mod gateway;
pub mod status;

pub use gateway::{
    CustomerDetails, GatewayError, LineItem, PaymentGateway, PaymentIntent, PaymentIntentRequest,
};
pub use status::{FraudStatus, PaymentNotification, TransactionStatus};
