pub mod notifier;
pub mod payments;

pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use payments::{MockPaymentProvider, PaymentError, PaymentProvider, PaymentReceipt};
