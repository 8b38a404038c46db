pub mod api;
pub mod coupon;
pub mod designer;
pub mod storage;
#[cfg(test)]
pub mod test_utils;

pub use api::{ApiClient, Transport};
pub use coupon::Coupon;
pub use designer::Designer;
pub use storage::{FirebaseStorage, ImageFile, ImageStore};
