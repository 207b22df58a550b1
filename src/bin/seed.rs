use axum_storefront_api::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, run_migrations},
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    slug: &'static str,
    category: &'static str,
    description: &'static str,
    base_price: i64,
    sale_price: Option<i64>,
    colors: &'static [&'static str],
}

const CATEGORIES: &[(&str, &str)] = &[("T-Shirts", "t-shirts"), ("Hoodies", "hoodies"), ("Joggers", "joggers")];

const SIZES: &[&str] = &["S", "M", "L", "XL"];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Classic Crew Tee",
        slug: "classic-crew-tee",
        category: "t-shirts",
        description: "Heavyweight cotton tee with a relaxed fit",
        base_price: 799,
        sale_price: Some(599),
        colors: &["Black", "White", "Navy"],
    },
    SeedProduct {
        name: "Oversized Graphic Tee",
        slug: "oversized-graphic-tee",
        category: "t-shirts",
        description: "Drop-shoulder tee with a front print",
        base_price: 999,
        sale_price: None,
        colors: &["Black", "Beige"],
    },
    SeedProduct {
        name: "Fleece Pullover Hoodie",
        slug: "fleece-pullover-hoodie",
        category: "hoodies",
        description: "Brushed fleece hoodie with kangaroo pocket",
        base_price: 1999,
        sale_price: Some(1499),
        colors: &["Grey", "Olive"],
    },
    SeedProduct {
        name: "Tapered Joggers",
        slug: "tapered-joggers",
        category: "joggers",
        description: "Cuffed joggers with zip pockets",
        base_price: 1299,
        sale_price: None,
        colors: &["Black", "Charcoal"],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let (pool, orm) = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user(&pool, "shopper", "user@example.com", "user123", ROLE_USER).await?;
    seed_catalog(&pool).await?;
    seed_coupon(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &DbPool, username: &str, email: &str, password: &str, role: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (email, username, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &DbPool) -> anyhow::Result<()> {
    for (name, slug) in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (name, slug, is_display) VALUES ($1, $2, TRUE) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await?;
    }

    for product in PRODUCTS {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (name, slug, category_id, description, base_price, sale_price)
            SELECT $1, $2, c.id, $4, $5, $6 FROM categories c WHERE c.slug = $3
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(product.name)
        .bind(product.slug)
        .bind(product.category)
        .bind(product.description)
        .bind(Decimal::from(product.base_price))
        .bind(product.sale_price.map(Decimal::from))
        .fetch_optional(pool)
        .await?;

        // Already seeded.
        let Some((product_id,)) = row else { continue };

        for color in product.colors {
            for size in SIZES {
                let sku = format!("{}-{}-{}", product.slug, color, size).to_uppercase();
                sqlx::query(
                    r#"
                    INSERT INTO variants (product_id, size, color, sku, stock, cost_price)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (sku) DO NOTHING
                    "#,
                )
                .bind(product_id)
                .bind(size)
                .bind(color)
                .bind(sku)
                .bind(25_i32)
                .bind(Decimal::from(product.base_price) * Decimal::new(35, 2))
                .execute(pool)
                .await?;
            }
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_coupon(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (code, description, discount_percent, active)
        VALUES ('WELCOME10', 'Ten percent off your first order', 10, TRUE)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .execute(pool)
    .await?;
    println!("Seeded coupon WELCOME10");
    Ok(())
}
