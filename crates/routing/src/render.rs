use crate::route::{Route, RoutingTable};

/// Placeholder shown for an empty route list.
pub const EMPTY_PLACEHOLDER: &str = "(none)";

/// Render the table for the `/showconfig` reply.
pub fn render_table(table: &RoutingTable) -> String {
    format!(
        "Sources:\n{}\n\nDestinations:\n{}",
        render_routes(&table.sources),
        render_routes(&table.dests)
    )
}

fn render_routes(routes: &[Route]) -> String {
    if routes.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    routes
        .iter()
        .map(Route::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
