pub mod cart;
pub mod cart_item;
pub mod invoice;
pub mod order;
pub mod order_item;
pub mod payment_transaction;
pub mod product;
pub mod sequence_counter;

// Re-export entities under their conventional names.
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use invoice::{Entity as Invoice, Model as InvoiceModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, VerificationStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment_transaction::{
    Entity as PaymentTransaction, Model as PaymentTransactionModel, TransactionStatus,
};
pub use product::{Entity as Product, Model as ProductModel};
pub use sequence_counter::{Entity as SequenceCounter, Model as SequenceCounterModel};
