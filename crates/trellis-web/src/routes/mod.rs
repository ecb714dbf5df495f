mod health;
mod live;
mod pages;

pub use health::health_routes;
pub use live::live_routes;
pub use pages::page_routes;
