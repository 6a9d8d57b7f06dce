pub mod booking;
pub mod notify;
