//! Stock lookup commands.

use shopcart_core::ProductId;
use shopcart_store::LoadOutcome;

use super::{CliError, Context};

pub async fn product(ctx: &mut Context, id: ProductId) -> Result<(), CliError> {
    let available = ctx.store.fetch_product_stock(ctx.session(), &id).await;
    ctx.flush_notifications();
    log_single(&id, available)
}

pub async fn accessory(ctx: &mut Context, id: ProductId) -> Result<(), CliError> {
    let available = ctx.store.fetch_accessory_stock(ctx.session(), &id).await;
    ctx.flush_notifications();
    log_single(&id, available)
}

/// Merge a fresh stock snapshot and print the cache.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be fetched.
pub async fn refresh(ctx: &mut Context) -> Result<(), CliError> {
    match ctx.store.refresh_all_stocks(ctx.session()).await {
        LoadOutcome::Loaded => {
            for (id, available) in &ctx.store.snapshot().stocks {
                tracing::info!("{id}: {available}");
            }
            Ok(())
        }
        LoadOutcome::Skipped => Err(CliError::Failed("Not signed in")),
        LoadOutcome::Failed => Err(CliError::Failed("Stock refresh failed")),
    }
}

/// Fill in stock for cart products that have none cached.
///
/// # Errors
///
/// Never fails; individual lookup failures are logged.
pub async fn missing(ctx: &mut Context) -> Result<(), CliError> {
    let fetched = ctx.store.fetch_all_cart_stocks(ctx.session()).await;
    ctx.flush_notifications();
    tracing::info!("Fetched stock for {fetched} product(s)");
    Ok(())
}

fn log_single(id: &ProductId, available: Option<i64>) -> Result<(), CliError> {
    match available {
        Some(n) => {
            tracing::info!("{id}: {n} available");
            Ok(())
        }
        None => Err(CliError::Failed("Stock lookup failed")),
    }
}
