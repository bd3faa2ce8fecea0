pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod invoicing;
pub mod orders;
pub mod payments;
pub mod sequence;

pub use cart::{CartService, CartView, OwnerKey};
pub use catalog::{CatalogSyncService, SyncReport};
pub use checkout::{BillingInfo, CheckoutService, OrderConfirmation};
pub use invoicing::{InvoiceLine, InvoicingService};
pub use orders::OrderService;
pub use payments::PaymentService;
pub use sequence::{CounterKind, SequenceNumber, SequenceService};
