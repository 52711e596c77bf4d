//! movies-sdk: movies API クライアントライブラリ。
//!
//! トークン発行元から取得した Bearer トークンをキャッシュし、期限切れ時には
//! 一度に一つのリフレッシュだけを発行元に送る。
//!
//! # 使い方
//!
//! ```ignore
//! use movies_sdk::{MoviesApiClient, SdkConfig};
//!
//! let config = SdkConfig::new(
//!     "http://localhost:5000",
//!     "http://localhost:5002/token",
//!     "d8566de3-b1a6-4a9b-b842-8e3887a82e42",
//!     "nick@example.com",
//! )
//! .with_claim("admin", true)
//! .with_claim("trusted_member", true);
//!
//! let client = MoviesApiClient::from_config(config).unwrap();
//! let movie = client.get_movie("nick-the-greek-2023").await.unwrap();
//! ```

pub mod client;
pub mod config;
pub mod credential_cache;
pub mod error;
pub mod issuer;
pub mod token;

pub use client::MoviesApiClient;
pub use config::SdkConfig;
pub use credential_cache::CredentialCache;
pub use error::SdkError;
pub use issuer::{HttpTokenIssuer, IssueTokenRequest, TokenIssuer};
pub use token::Credential;

#[cfg(feature = "mock")]
pub use issuer::MockTokenIssuer;
