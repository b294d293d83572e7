pub mod activity_log;
pub mod otp;

pub use activity_log::ActivityLogService;
pub use otp::OtpStore;
