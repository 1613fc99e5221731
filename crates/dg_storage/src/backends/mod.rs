pub mod drive;
pub mod local;

pub use drive::DriveStorage;
pub use local::LocalStorage;
