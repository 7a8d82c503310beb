pub mod oauth2;

pub use self::oauth2::CtpTokenProvider;
