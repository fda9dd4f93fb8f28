pub mod categories;
pub mod product_images;
pub mod products;
pub mod subcategories;
pub mod users;

pub use categories::Entity as Categories;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use subcategories::Entity as SubCategories;
pub use users::Entity as Users;
