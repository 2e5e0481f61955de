// Orders: read side and status transitions
pub mod order_status;
pub mod orders;

// Cart, checkout, catalog and accounts
pub mod commerce;
