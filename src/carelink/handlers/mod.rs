//! Route handlers for the session and contact flows.

pub mod contact;
pub mod dashboard;
pub mod health;
pub mod login;
pub mod session;

pub use self::contact::contact;
pub use self::dashboard::dashboard;
pub use self::health::health;
pub use self::login::login;
pub use self::session::{logout, session};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const HOME_PATH: &str = "/";
