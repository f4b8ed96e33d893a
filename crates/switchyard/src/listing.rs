//! Plain-text route tables.

use crate::collector::RouteCollector;

/// Message rendered for an empty collector.
pub const NO_ROUTES: &str = "No routes registered.";

/// Renders the routes as an aligned table. Unnamed routes show `-`.
///
/// ```text
/// METHOD  URL     NAME         > HANDLER
/// GET     /users  users.index  > UserController::index
/// POST    /ping   ping         > Closure
/// ```
pub fn render_route_table(routes: &RouteCollector) -> String {
    let rows: Vec<[String; 4]> = routes
        .routes()
        .iter()
        .map(|route| {
            [
                route.method.to_string(),
                route.path.clone(),
                route.name.clone().unwrap_or_else(|| "-".to_string()),
                route.handler.describe(),
            ]
        })
        .collect();

    if rows.is_empty() {
        return format!("{NO_ROUTES}\n");
    }

    let mut widths = ["METHOD".len(), "URL".len(), "NAME".len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let [method, url, name] = widths;
    let mut out = format!("{:method$}  {:url$}  {:name$}  > HANDLER\n", "METHOD", "URL", "NAME");
    for [m, u, n, handler] in &rows {
        out.push_str(&format!("{m:method$}  {u:url$}  {n:name$}  > {handler}\n"));
    }
    out
}
