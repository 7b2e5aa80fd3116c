pub mod sessions;
pub mod users;

pub use users::UserRepository;
