/// Client ID sent when the caller does not configure one.
pub const DEFAULT_CLIENT_ID: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
