mod handler;
mod model;

pub use handler::{follow_user, get_user_posts, update_profile};
