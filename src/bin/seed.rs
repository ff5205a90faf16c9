use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_admin(&pool, "admin@example.com", "admin123").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "admin").await
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    ensure_user_with_role(pool, email, password, "user").await
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    row.map(|(id,)| id)
        .ok_or_else(|| anyhow::anyhow!("failed to upsert user {email}"))
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let category_id: i32 = match sqlx::query_as::<_, (i32,)>(
        "SELECT id FROM categories WHERE name = 'Downloads'",
    )
    .fetch_optional(pool)
    .await?
    {
        Some((id,)) => id,
        None => {
            let (id,): (i32,) = sqlx::query_as(
                r#"
                INSERT INTO categories (name, description, is_public, hidden)
                VALUES ('Downloads', 'Digital downloads', TRUE, FALSE)
                RETURNING id
                "#,
            )
            .fetch_one(pool)
            .await?;
            id
        }
    };

    let samples: &[(&str, &str, Decimal, i32, bool)] = &[
        (
            "Field Guide (PDF)",
            "Downloadable field guide",
            Decimal::new(1299, 2),
            0,
            false,
        ),
        (
            "Poster Print",
            "A2 poster, shipped rolled",
            Decimal::new(900, 2),
            25,
            true,
        ),
    ];

    for (name, description, price, stock, physical) in samples {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO products
                (name, description, price, stock, has_physical_variant, category_id, is_public, hidden)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, FALSE)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(physical)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}
