pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;
pub mod favorite_service;
pub mod profile_service;
pub mod review_service;
