//! movies-auth: 共有鍵 JWT 検証 + ポリシーベース認可ライブラリ
//!
//! Bearer トークンを検証してリクエスト単位の [`Principal`] を組み立て、
//! 名前付きポリシー（Admin / Trusted / Authenticated）で認可判定を行う。
//! Admin ポリシーは共有シークレットヘッダーによるサービス間呼び出しの昇格も受け付ける。
//!
//! # 使い方
//!
//! ```ignore
//! use movies_auth::{ApiKeySettings, AuthorizationEngine, TokenVerifier, ADMIN_POLICY};
//!
//! let verifier = TokenVerifier::new(b"signing-key", "https://id.example.com", "https://movies.example.com");
//! let claims = verifier.verify_token("eyJ...")?;
//! let principal = Principal::from_token(&claims);
//!
//! let engine = AuthorizationEngine::with_default_policies(api_key_settings);
//! let principal = engine.authorize(ADMIN_POLICY, principal, &headers)?;
//! ```

pub mod claims;
pub mod middleware;
pub mod policy;
pub mod verifier;

pub use claims::{
    Claim, IdentitySource, Principal, TokenClaims, ADMIN_CLAIM, TRUSTED_MEMBER_CLAIM,
    USER_ID_CLAIM,
};
pub use middleware::{
    authenticate, require_policy, require_policy_with_hook, AuthErrorResponse,
    AuthMiddlewareFuture, AuthState, CurrentPrincipal, DecisionHook,
};
pub use policy::{
    ApiKeySettings, AuthorizationEngine, Policy, PolicyDecision, Requirement, ADMIN_POLICY,
    AUTHENTICATED_POLICY, DEFAULT_API_KEY_HEADER, TRUSTED_MEMBER_POLICY,
};
pub use verifier::{AuthError, TokenVerifier};
