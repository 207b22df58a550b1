pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod return_items;
pub mod return_requests;
pub mod users;
pub mod variants;
pub mod wishlist_items;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use coupons::Entity as Coupons;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use return_items::Entity as ReturnItems;
pub use return_requests::Entity as ReturnRequests;
pub use users::Entity as Users;
pub use variants::Entity as Variants;
pub use wishlist_items::Entity as WishlistItems;
