pub mod follow;
pub mod post;
pub mod user;

pub use follow::FollowEntity;
pub use post::{PostEntity, PostPage};
pub use user::UserEntity;
