use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse,
            RegisterRequest, UserSummary,
        },
        cart::{AddCartItemRequest, CartDto, CartItemDto, UpdateCartItemRequest},
        catalog::{CategoryDetail, CategoryList, SubCategoryDetail, SubCategoryList},
        favorites::{AddFavoriteItemRequest, FavoriteDto, FavoriteItemDto},
        products::{ProductDetail, ProductList, ProductListItem, SubCategoryRef},
        profile::UpdateProfileRequest,
        reviews::{CreateReviewRequest, ReviewAuthor, ReviewDto, ReviewList, UpdateReviewRequest},
    },
    models::{Category, Product, ProductImage, Review, SubCategory, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, favorites, health, params, products, profile, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        profile::get_profile,
        profile::update_profile,
        catalog::list_categories,
        catalog::get_category,
        catalog::list_subcategories,
        catalog::get_subcategory,
        products::list_products,
        products::get_product,
        products::list_product_reviews,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::create_subcategory,
        admin::update_subcategory,
        admin::delete_subcategory,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::add_product_image,
        admin::delete_product_image
    ),
    components(
        schemas(
            User,
            Category,
            SubCategory,
            Product,
            ProductImage,
            Review,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UserSummary,
            RefreshRequest,
            RefreshResponse,
            LogoutRequest,
            UpdateProfileRequest,
            CategoryList,
            CategoryDetail,
            SubCategoryList,
            SubCategoryDetail,
            ProductList,
            ProductListItem,
            ProductDetail,
            SubCategoryRef,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewAuthor,
            ReviewDto,
            ReviewList,
            AddCartItemRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartDto,
            AddFavoriteItemRequest,
            FavoriteItemDto,
            FavoriteDto,
            admin::CreateCategoryRequest,
            admin::UpdateCategoryRequest,
            admin::CreateSubCategoryRequest,
            admin::UpdateSubCategoryRequest,
            admin::CreateProductRequest,
            admin::UpdateProductRequest,
            admin::AddProductImageRequest,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<CategoryList>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<ReviewList>,
            ApiResponse<CartDto>,
            ApiResponse<FavoriteDto>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and token lifecycle"),
        (name = "Profile", description = "Own-profile endpoints"),
        (name = "Catalog", description = "Category, subcategory and product browsing"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Cart", description = "Shopping cart endpoints"),
        (name = "Favorites", description = "Favorites list endpoints"),
        (name = "Admin", description = "Staff-only catalog management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
