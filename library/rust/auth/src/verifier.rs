//! 共有鍵 (HS256) による JWT 検証器。

use crate::claims::TokenClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

/// AuthError は認証・認可エラーを表す。
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,

    /// トークンが不正な形式、署名不一致、または必須 Claim 欠落。
    #[error("token decode failure: {0}")]
    TokenDecodeFailure(String),

    #[error("missing Authorization header")]
    MissingToken,

    #[error("invalid Authorization header format")]
    InvalidAuthHeader,

    /// 要求ポリシーの要件が Allowed に到達しなかった。
    #[error("authorization denied by policy {policy}")]
    AuthorizationDenied {
        policy: String,
        /// 評価時の Principal が認証済みだったか（401 / 403 の出し分けに使う）。
        authenticated: bool,
    },

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
}

/// jsonwebtoken のデフォルトと同じ 60 秒の時計ずれ許容。
const DEFAULT_LEEWAY_SECS: u64 = 60;

/// TokenVerifier は共有鍵で署名された JWT を検証し、Claims を返す。
///
/// 署名に加えて発行者・オーディエンス・有効期限を検証する。
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// 新しい TokenVerifier を生成する。
    pub fn new(signing_key: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = DEFAULT_LEEWAY_SECS;

        Self {
            key: DecodingKey::from_secret(signing_key),
            validation,
        }
    }

    /// 有効期限判定の許容秒数を設定する。
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }

    /// JWT トークン文字列を検証し、Claims を返す。
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenDecodeFailure(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}
