pub mod carts;
pub mod checkout;
pub mod common;
pub mod invoices;
pub mod orders;
pub mod products;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        CartService, CatalogSyncService, CheckoutService, InvoicingService, OrderService,
        PaymentService, SequenceService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub sequence: SequenceService,
    pub cart: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub invoicing: InvoicingService,
    pub payments: PaymentService,
    pub catalog: CatalogSyncService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let sequence = SequenceService::new(db.clone(), event_sender.clone());
        let cart = CartService::new(db.clone(), event_sender.clone());
        let checkout = CheckoutService::new(
            db.clone(),
            cart.clone(),
            sequence.clone(),
            event_sender.clone(),
            config.processing_fee_rate,
        );
        let orders = OrderService::new(db.clone(), event_sender.clone());
        let invoicing = InvoicingService::new(db.clone());
        let payments = PaymentService::new(db.clone(), sequence.clone(), event_sender.clone());
        let catalog = CatalogSyncService::new(
            db,
            config.catalog_base_url.clone(),
            config.catalog_page_size,
            config.catalog_batch_size,
            event_sender,
        );

        Self {
            sequence,
            cart,
            checkout,
            orders,
            invoicing,
            payments,
            catalog,
        }
    }
}
