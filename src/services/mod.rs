pub mod cart;
pub mod chat;
pub mod checkout;
pub mod email;
pub mod orders;
pub mod products;
pub mod users;

pub use cart::CartService;
pub use chat::ChatService;
pub use checkout::CheckoutService;
pub use email::EmailService;
pub use orders::OrderService;
pub use products::ProductService;
pub use users::UserService;
