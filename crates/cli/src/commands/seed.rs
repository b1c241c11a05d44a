//! Seed the demo catalog.
//!
//! Inserts the demo products with their customization types and options.
//! Products are matched by name: existing ones are skipped, or overwritten
//! with `--replace`. Customization types and options are shared and
//! upserted by name.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use virtual_craft_core::{CustomizationTypeId, Price, ProductId};
use virtual_craft_storefront::db;

use super::{CommandError, database_url};

/// One demo product.
#[derive(Debug, Clone, Copy)]
pub struct SeedProduct {
    pub name: &'static str,
    pub description: &'static str,
    pub cents: u32,
    pub customizations: &'static [(&'static str, &'static [&'static str])],
}

/// The demo catalog.
pub const DEMO_CATALOG: &[SeedProduct] = &[
    SeedProduct {
        name: "3D Printed Vase",
        description: "A beautiful customizable vase",
        cents: 2999,
        customizations: &[
            ("Color", &["Red", "Blue", "Green"]),
            ("Size", &["Small", "Medium", "Large"]),
        ],
    },
    SeedProduct {
        name: "Personalized Keychain",
        description: "A stylish keychain with your name or logo",
        cents: 999,
        customizations: &[
            ("Material", &["Plastic", "Wood", "Metal"]),
            ("Shape", &["Circle", "Square", "Heart"]),
        ],
    },
    SeedProduct {
        name: "Custom Phone Stand",
        description: "A practical stand for your phone, designed to fit your style",
        cents: 1499,
        customizations: &[
            ("Material", &["Plastic", "Wood", "Acrylic"]),
            ("Height", &["Short", "Medium", "Tall"]),
        ],
    },
    SeedProduct {
        name: "3D Printed Planter Pot",
        description: "A modern, customizable planter pot for your plants",
        cents: 1999,
        customizations: &[
            ("Color", &["Gray", "White", "Terracotta"]),
            ("Shape", &["Round", "Square", "Hexagonal"]),
        ],
    },
    SeedProduct {
        name: "Customized Coasters Set",
        description: "A set of coasters with your custom design or logo",
        cents: 1299,
        customizations: &[
            ("Material", &["Wood", "Plastic", "Cork"]),
            ("Shape", &["Circle", "Square"]),
        ],
    },
    SeedProduct {
        name: "3D Printed Desk Organizer",
        description: "A stylish and practical desk organizer for your workspace",
        cents: 2499,
        customizations: &[
            ("Material", &["Plastic", "Wood", "Metal"]),
            ("Size", &["Small", "Medium", "Large"]),
        ],
    },
    SeedProduct {
        name: "Customizable Earbud Holder",
        description: "A neat holder for your earbuds, available in various styles",
        cents: 799,
        customizations: &[
            ("Material", &["Plastic", "Wood"]),
            ("Shape", &["Rectangle", "Circle"]),
        ],
    },
    SeedProduct {
        name: "3D Printed Robot Model",
        description: "A customizable robot figure, perfect for display or collection",
        cents: 3999,
        customizations: &[
            ("Color", &["Silver", "Black", "Gold"]),
            ("Size", &["Small", "Medium", "Large"]),
        ],
    },
];

/// Counts from a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedAction {
    Insert,
    Replace(ProductId),
    Skip,
}

const fn plan(existing: Option<ProductId>, replace: bool) -> SeedAction {
    match existing {
        None => SeedAction::Insert,
        Some(id) if replace => SeedAction::Replace(id),
        Some(_) => SeedAction::Skip,
    }
}

/// Seed the demo catalog into the storefront database.
///
/// # Errors
///
/// Returns an error if the URL is missing or any statement fails. The run
/// is a single transaction.
pub async fn demo_catalog(replace: bool) -> Result<SeedReport, CommandError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!(replace, products = DEMO_CATALOG.len(), "Seeding demo catalog");
    seed(&pool, DEMO_CATALOG, replace).await
}

/// Seed `catalog` into `pool` in one transaction.
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is committed.
pub async fn seed(
    pool: &PgPool,
    catalog: &[SeedProduct],
    replace: bool,
) -> Result<SeedReport, CommandError> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for item in catalog {
        let existing: Option<ProductId> = sqlx::query_scalar(
            "SELECT id FROM storefront.products WHERE name = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(item.name)
        .fetch_optional(&mut *tx)
        .await?;

        let product_id = match plan(existing, replace) {
            SeedAction::Skip => {
                debug!(name = item.name, "Product exists, skipping");
                report.skipped += 1;
                continue;
            }
            SeedAction::Insert => {
                report.inserted += 1;
                sqlx::query_scalar::<_, ProductId>(
                    r"
                    INSERT INTO storefront.products (name, description, price, active)
                    VALUES ($1, $2, $3, TRUE)
                    RETURNING id
                    ",
                )
                .bind(item.name)
                .bind(item.description)
                .bind(Price::from_cents(item.cents))
                .fetch_one(&mut *tx)
                .await?
            }
            SeedAction::Replace(id) => {
                report.replaced += 1;
                sqlx::query(
                    r"
                    UPDATE storefront.products
                    SET description = $2, price = $3, active = TRUE, updated_at = now()
                    WHERE id = $1
                    ",
                )
                .bind(id)
                .bind(item.description)
                .bind(Price::from_cents(item.cents))
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM storefront.product_customizations WHERE product_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                id
            }
        };

        for (kind, options) in item.customizations {
            attach_customization(&mut tx, product_id, kind, options).await?;
        }
        debug!(name = item.name, %product_id, "Seeded product");
    }

    tx.commit().await?;
    Ok(report)
}

async fn attach_customization(
    conn: &mut PgConnection,
    product_id: ProductId,
    kind: &str,
    options: &[&str],
) -> Result<(), CommandError> {
    // DO UPDATE so RETURNING yields the existing row's id
    let type_id: CustomizationTypeId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.customization_types (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;

    for value in options {
        sqlx::query(
            r"
            INSERT INTO storefront.customization_options (type_id, value)
            VALUES ($1, $2)
            ON CONFLICT (type_id, value) DO NOTHING
            ",
        )
        .bind(type_id)
        .bind(*value)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query(
        r"
        INSERT INTO storefront.product_customizations (product_id, customization_type_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(product_id)
    .bind(type_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
