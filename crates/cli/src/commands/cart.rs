//! Cart commands: show, add, remove, clear, purge.

use shopcart_core::CartItemId;
use shopcart_store::{CartLine, CartState, LoadOutcome};

use super::{CliError, Context};

/// Print the cart, after loading it from the server unless `offline`.
///
/// # Errors
///
/// Returns an error if the load fails.
pub async fn show(ctx: &mut Context, offline: bool) -> Result<(), CliError> {
    if !offline {
        let outcome = ctx.store.load_cart(ctx.session()).await;
        ctx.flush_notifications();
        match outcome {
            LoadOutcome::Loaded => {}
            LoadOutcome::Skipped => tracing::warn!("Not signed in; showing saved cart"),
            LoadOutcome::Failed => return Err(CliError::Failed("Cart load failed")),
        }
    }

    report(ctx, &ctx.store.snapshot());
    Ok(())
}

/// Add a line, reserving stock first unless it is marked reserved.
///
/// # Errors
///
/// Returns the store error if the add fails at any step.
pub async fn add(ctx: &mut Context, line: CartLine) -> Result<(), CliError> {
    let product_id = line.product_id.clone();
    let result = ctx.store.add_to_cart(ctx.session(), line).await;
    ctx.flush_notifications();

    let available = result?;
    tracing::info!(
        "{product_id}: {available} left, {} item(s) in cart",
        ctx.store.item_count()
    );
    Ok(())
}

/// Remove one persisted line.
///
/// # Errors
///
/// Returns the store error if the server call fails.
pub async fn remove(ctx: &mut Context, cart_item_id: CartItemId) -> Result<(), CliError> {
    let result = ctx.store.remove_from_cart(ctx.session(), &cart_item_id).await;
    ctx.flush_notifications();
    result?;

    report(ctx, &ctx.store.snapshot());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns the store error if the server call fails.
pub async fn clear(ctx: &mut Context) -> Result<(), CliError> {
    let result = ctx.store.clear_cart(ctx.session()).await;
    ctx.flush_notifications();
    Ok(result?)
}

/// Delete the saved cart file.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn purge(ctx: &Context) -> Result<(), CliError> {
    ctx.store.purge()?;
    tracing::info!("Local cart state deleted");
    Ok(())
}

fn report(ctx: &Context, state: &CartState) {
    if state.lines.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for line in &state.lines {
        let id = line
            .cart_item_id
            .as_ref()
            .map_or("(unsaved)", |id| id.as_str());
        let stock = state
            .available_stock(line.product_id.as_str())
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        tracing::info!(
            "{id}  {} x{} size={} colors=[{}] unit={} stock={stock}",
            line.title,
            line.quantity,
            line.size,
            line.colors.join(","),
            line.unit_price,
        );
    }

    match state.total_price(ctx.currency) {
        Ok(total) => tracing::info!("{} item(s), total {total}", state.item_count()),
        Err(e) => tracing::warn!("{} item(s), total unavailable: {e}", state.item_count()),
    }
}
