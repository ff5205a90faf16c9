pub mod admin_service;
pub mod auth_service;
pub mod category_service;
pub mod checkout_service;
pub mod order_service;
pub mod product_service;
pub mod proxy_service;
pub mod visibility;
