use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::{LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest},
    dto::cart::{AddCartItemRequest, UpdateCartItemRequest},
    dto::favorites::AddFavoriteItemRequest,
    dto::reviews::CreateReviewRequest,
    entity::{
        categories::ActiveModel as CategoryActive, products::ActiveModel as ProductActive,
        subcategories::ActiveModel as SubCategoryActive, users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::admin::UpdateProductRequest,
    services::{admin_service, auth_service, cart_service, catalog_service, favorite_service, review_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow: users review a product and the derived rating updates;
// the cart totals follow live product prices; favorites and the token
// lifecycle behave per contract.
#[tokio::test]
async fn reviews_cart_favorites_and_token_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };

    let state = setup_state(&database_url).await?;

    // Seed users
    let reviewer_id = create_user(&state, "bob", "bob@example.com", false).await?;
    let second_reviewer_id = create_user(&state, "carol", "carol@example.com", false).await?;
    let staff_id = create_user(&state, "root", "root@example.com", true).await?;

    // Seed a minimal catalog tree
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Apparel".into()),
        image: Set("/media/category_photo/apparel.png".into()),
    }
    .insert(&state.orm)
    .await?;

    let subcategory = SubCategoryActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(category.id),
        name: Set("Hoodies".into()),
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        subcategory_id: Set(subcategory.id),
        name: Set("Test Hoodie".into()),
        description: Set("A hoodie for testing".into()),
        price: Set(1000),
        article_number: Set(42),
        product_type: Set(true),
        video: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let reviewer = AuthUser {
        user_id: reviewer_id,
        is_staff: false,
    };
    let second_reviewer = AuthUser {
        user_id: second_reviewer_id,
        is_staff: false,
    };
    let staff = AuthUser {
        user_id: staff_id,
        is_staff: true,
    };

    // Two reviews -> average 4.5, count 2
    review_service::create_review(
        &state.pool,
        &reviewer,
        CreateReviewRequest {
            product_id: product.id,
            stars: 5,
            comment: "Excellent".into(),
        },
    )
    .await?;
    review_service::create_review(
        &state.pool,
        &second_reviewer,
        CreateReviewRequest {
            product_id: product.id,
            stars: 4,
            comment: "Pretty good".into(),
        },
    )
    .await?;

    let detail = catalog_service::get_product(&state, product.id).await?;
    let detail = detail.data.unwrap();
    assert_eq!(detail.avg_rating, 4.5);
    assert_eq!(detail.review_count, 2);
    assert_eq!(detail.reviews.len(), 2);

    // One review per (user, product)
    let duplicate = review_service::create_review(
        &state.pool,
        &reviewer,
        CreateReviewRequest {
            product_id: product.id,
            stars: 1,
            comment: "Changed my mind".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    // Cart: add 2 units at price 1000 -> total 2000
    let added = cart_service::add_item(
        &state.pool,
        &reviewer,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let added = added.data.unwrap();
    assert_eq!(added.total_price, 2000);

    let cart = cart_service::get_cart(&state.pool, &reviewer).await?;
    let cart = cart.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_price, 2000);

    // Totals follow the current product price, not a snapshot
    admin_service::update_product(
        &state,
        &staff,
        product.id,
        UpdateProductRequest {
            subcategory_id: None,
            name: None,
            description: None,
            price: Some(1500),
            article_number: None,
            product_type: None,
            video: None,
        },
    )
    .await?;

    let cart = cart_service::get_cart(&state.pool, &reviewer).await?;
    assert_eq!(cart.data.unwrap().total_price, 3000);

    // Changing the quantity changes the total
    let updated = cart_service::update_item(
        &state.pool,
        &reviewer,
        added.id,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await?;
    assert_eq!(updated.data.unwrap().total_price, 1500);

    // A non-staff caller cannot manage the catalog
    let forbidden = admin_service::delete_product(&state, &reviewer, product.id).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Favorites: add is idempotent, remove works once
    favorite_service::add_item(
        &state.pool,
        &reviewer,
        AddFavoriteItemRequest {
            product_id: product.id,
        },
    )
    .await?;
    favorite_service::add_item(
        &state.pool,
        &reviewer,
        AddFavoriteItemRequest {
            product_id: product.id,
        },
    )
    .await?;
    let favorites = favorite_service::list_favorites(&state.pool, &reviewer).await?;
    assert_eq!(favorites.data.unwrap().items.len(), 1);

    favorite_service::remove_item(&state.pool, &reviewer, product.id).await?;
    let gone = favorite_service::remove_item(&state.pool, &reviewer, product.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    // Token lifecycle: register, login, refresh, logout, refresh again fails
    auth_service::register_user(
        &state.pool,
        RegisterRequest {
            username: "dave".into(),
            email: "dave@example.com".into(),
            password: "hunter2hunter2".into(),
            first_name: Some("Dave".into()),
            last_name: None,
            age: Some(30),
            phone_number: None,
        },
    )
    .await?;

    let login = auth_service::login_user(
        &state.pool,
        LoginRequest {
            username: "dave".into(),
            password: "hunter2hunter2".into(),
        },
    )
    .await?;
    let tokens = login.data.unwrap();

    let refreshed = auth_service::refresh_access_token(
        &state.pool,
        RefreshRequest {
            refresh: tokens.refresh.clone(),
        },
    )
    .await?;
    assert!(refreshed.data.unwrap().access.len() > 0);

    // Access tokens are not refresh tokens
    let wrong_kind = auth_service::refresh_access_token(
        &state.pool,
        RefreshRequest {
            refresh: tokens.access.clone(),
        },
    )
    .await;
    assert!(matches!(wrong_kind, Err(AppError::Unauthorized(_))));

    auth_service::logout_user(
        &state.pool,
        LogoutRequest {
            refresh: tokens.refresh.clone(),
        },
    )
    .await?;
    // Logging out twice is fine
    auth_service::logout_user(
        &state.pool,
        LogoutRequest {
            refresh: tokens.refresh.clone(),
        },
    )
    .await?;

    let revoked = auth_service::refresh_access_token(
        &state.pool,
        RefreshRequest {
            refresh: tokens.refresh,
        },
    )
    .await;
    assert!(matches!(revoked, Err(AppError::Unauthorized(_))));

    // Bad credentials are a 401, not a 400
    let bad_login = auth_service::login_user(
        &state.pool,
        LoginRequest {
            username: "dave".into(),
            password: "wrong-password".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::Unauthorized(_))));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE favorite_items, favorites, cart_items, carts, reviews, product_images, products, subcategories, categories, revoked_tokens, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(
    state: &AppState,
    username: &str,
    email: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        first_name: Set(None),
        last_name: Set(None),
        age: Set(None),
        phone_number: Set(None),
        avatar: Set(None),
        status: Set("simple".into()),
        is_staff: Set(is_staff),
        date_registered: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
