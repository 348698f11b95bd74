//! In-process implementations of the collaborator traits

pub mod mock_directory;
pub mod static_images;

pub use mock_directory::{DirectoryCall, MockDirectory};
pub use static_images::StaticImageResolver;
