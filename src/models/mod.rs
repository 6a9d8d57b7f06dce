pub mod booking;
pub mod item;
pub mod notification;
pub mod profile;
pub mod review;

pub use booking::{Booking, BookingDetails, BookingStatus};
pub use item::Item;
pub use notification::{Notification, NotificationKind};
pub use profile::{Actor, Profile, ProfileStats};
pub use review::{Review, ReviewDetails};
