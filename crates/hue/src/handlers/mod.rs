//! REST API handlers.

mod auth;
mod error;
mod health;
mod nodes;
mod packages;
mod services;
mod stats;
mod users;

pub use auth::ApiSecret;
pub use error::{ApiError, OptionExt, ResultExt};
pub use health::health;
pub use nodes::{create_node, delete_node, get_node, list_nodes};
pub use packages::{create_package, get_package};
pub use services::{create_service, delete_service, get_service};
pub use stats::get_stats;
pub use users::{
    create_user, delete_user, get_user, get_user_package, list_users, update_user,
};
