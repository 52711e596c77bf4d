//! クライアント側で保持する資格情報。

use crate::error::SdkError;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;

/// 署名検証なしで読み出すペイロード。
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    exp: i64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(flatten)]
    custom: HashMap<String, serde_json::Value>,
}

/// Credential は発行元から取得したトークンとその解析結果。
///
/// 不変値として扱い、リフレッシュは新しい Credential を作る。
#[derive(Debug, Clone)]
pub struct Credential {
    pub encoded_token: String,
    pub subject: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub custom_claims: HashMap<String, serde_json::Value>,
}

impl Credential {
    /// トークンの exp と Claims を読み出す。署名は検証しない（検証はサーバーの責務）。
    pub fn decode(encoded_token: &str) -> Result<Self, SdkError> {
        let token = encoded_token.trim();
        if token.is_empty() {
            return Err(SdkError::TokenDecodeFailure("empty token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| SdkError::TokenDecodeFailure(e.to_string()))?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| {
                SdkError::TokenDecodeFailure(format!("exp out of range: {}", data.claims.exp))
            })?;

        Ok(Self {
            encoded_token: token.to_string(),
            subject: data.claims.sub,
            expires_at,
            custom_claims: data.claims.custom,
        })
    }

    /// `now < expires_at` のときだけ使用可能。
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Authorization ヘッダー用の Bearer 文字列を返す。
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.encoded_token)
    }
}
