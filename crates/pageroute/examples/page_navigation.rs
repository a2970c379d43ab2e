//! Registers a small page table and resolves a few request paths.
//!
//! Run with: `cargo run --example page_navigation`

use pageroute::prelude::*;

fn main() -> Result<(), RegistrationError> {
    let router = Router::new();

    router.set_index_route("HomePage");
    router.add("/counter", "CounterPage")?;
    router.add("/products/{category:alpha}/{id:int}", "ProductPage")?;
    router.add("/blog/{page=1:int}", "BlogPage")?;
    router.add_route(RouteSpec::new("/admin/{**rest}", "AdminPage").role("admin"))?;
    router.add("/settings/index", "SettingsPage")?;
    router.add_controller("settings");

    for path in [
        "/",
        "/counter",
        "/products/books/42",
        "/blog",
        "/admin/users/new",
        "/settings",
        "/products/42/books",
    ] {
        let outcome = router.match_path(path);
        match outcome.route() {
            Some(route) => {
                let params: Vec<String> = outcome
                    .params()
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                println!("{path} -> {} [{}]", route.handler(), params.join(", "));
            }
            None => println!("{path} -> (no page)"),
        }
    }

    Ok(())
}
