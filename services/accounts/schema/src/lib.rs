pub mod auth_otps;
pub mod user_auth_otps;
pub mod users;
