pub mod follow;
pub mod post;
pub mod user;

pub use follow::FollowRepository;
pub use post::{PgPostRepository, PostRepository};
pub use user::UserRepository;
