pub mod card;
pub mod reconciliation;
pub mod wallet;

pub use card::{CardGateway, CheckoutSession};
pub use reconciliation::{CheckoutEvent, OrderLookup, TransitionIntent};
pub use wallet::{CaptureOutcome, WalletGateway, WalletOrder};
