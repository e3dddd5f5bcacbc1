pub mod cart_entry;
pub mod chat_message;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use cart_entry::Entity as CartEntry;
pub use chat_message::Entity as ChatMessage;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use user::Entity as User;
