use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let staff_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", true).await?;
    let user_id = ensure_user(&pool, "alice", "alice@example.com", "alice123", false).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Staff ID: {staff_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_staff)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (username) DO UPDATE SET is_staff = EXCLUDED.is_staff
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (staff={is_staff})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (category_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, image)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET image = EXCLUDED.image
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Apparel")
    .bind("/media/category_photo/apparel.png")
    .fetch_one(pool)
    .await?;

    let subcategories = vec!["Hoodies", "T-Shirts", "Accessories"];
    let mut subcategory_ids = Vec::new();
    for name in subcategories {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM subcategories WHERE category_id = $1 AND name = $2")
                .bind(category_id)
                .bind(name)
                .fetch_optional(pool)
                .await?;
        let id = match existing {
            Some((id,)) => id,
            None => {
                let (id,): (Uuid,) = sqlx::query_as(
                    "INSERT INTO subcategories (id, category_id, name) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(Uuid::new_v4())
                .bind(category_id)
                .bind(name)
                .fetch_one(pool)
                .await?;
                id
            }
        };
        subcategory_ids.push(id);
    }

    let products: Vec<(&str, &str, i64, i64, usize)> = vec![
        ("Ferris Hoodie", "Warm hoodie for Rustaceans", 550_000, 1001, 0),
        ("Ferris Tee", "Classic crab print", 120_000, 1002, 1),
        ("Ferris Mug", "Coffee tastes better with Ferris", 50_000, 1003, 2),
        ("Sticker Pack", "Decorate your laptop", 25_000, 1004, 2),
    ];

    for (name, desc, price, article_number, sub_idx) in products {
        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, subcategory_id, name, description, price, article_number, product_type)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ON CONFLICT (article_number) DO UPDATE SET price = EXCLUDED.price
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subcategory_ids[sub_idx])
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(article_number)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO product_images (id, product_id, image)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM product_images WHERE product_id = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(format!("/media/product_images/{article_number}.png"))
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
