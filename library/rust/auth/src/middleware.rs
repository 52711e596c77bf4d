//! axum 用の認証・認可ミドルウェア。

use crate::claims::Principal;
use crate::policy::{AuthorizationEngine, PolicyDecision};
use crate::verifier::{AuthError, TokenVerifier};
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

/// ミドルウェアファクトリの戻り値型。
pub type AuthMiddlewareFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthErrorResponse>> + Send>,
>;

/// 認可判定のたびに呼ばれるフック。メトリクス記録などに使う。
pub type DecisionHook = Arc<dyn Fn(&'static str, PolicyDecision) + Send + Sync>;

/// AuthState はミドルウェアが使用する共有状態。
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
    pub engine: Arc<AuthorizationEngine>,
}

/// authenticate は Bearer トークンを検証し、Principal をリクエストエクステンションに格納する。
///
/// Authorization ヘッダーがなければ匿名 Principal を格納して後続へ渡す。
/// ヘッダーがあるのに検証できない場合は 401 を返す。
pub async fn authenticate(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthErrorResponse> {
    let principal = match extract_bearer_token(&req)? {
        Some(token) => {
            let claims = state.verifier.verify_token(&token).map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                AuthErrorResponse::from_auth_error(e)
            })?;
            Principal::from_token(&claims)
        }
        None => Principal::anonymous(),
    };

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// require_policy は指定ポリシーを必須とするミドルウェアファクトリ。
/// authenticate の後に使用すること。
///
/// 許可時はポリシー評価後の Principal（API キー昇格なら userid Claim 付き）で
/// エクステンションを置き換える。
pub fn require_policy(
    engine: Arc<AuthorizationEngine>,
    policy: &'static str,
) -> impl Fn(Request<Body>, Next) -> AuthMiddlewareFuture + Clone {
    require_policy_with_hook(engine, policy, None)
}

/// require_policy_with_hook は require_policy と同じ判定を行い、判定結果ごとに `hook` を呼ぶ。
pub fn require_policy_with_hook(
    engine: Arc<AuthorizationEngine>,
    policy: &'static str,
    hook: Option<DecisionHook>,
) -> impl Fn(Request<Body>, Next) -> AuthMiddlewareFuture + Clone {
    move |mut req: Request<Body>, next: Next| {
        let engine = engine.clone();
        let hook = hook.clone();
        Box::pin(async move {
            let principal = req
                .extensions()
                .get::<Principal>()
                .cloned()
                .unwrap_or_else(Principal::anonymous);

            match engine.authorize(policy, principal, req.headers()) {
                Ok(principal) => {
                    if let Some(hook) = hook {
                        hook(policy, PolicyDecision::Allowed);
                    }
                    req.extensions_mut().insert(principal);
                    Ok(next.run(req).await)
                }
                Err(e) => {
                    if let Some(hook) = hook {
                        hook(policy, PolicyDecision::Denied);
                    }
                    Err(AuthErrorResponse::from_auth_error(e))
                }
            }
        })
    }
}

/// CurrentPrincipal はハンドラ引数で Principal を受け取るためのエクストラクタ。
/// ミドルウェアを通っていないリクエストでは匿名 Principal になる。
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentPrincipal(
            parts
                .extensions
                .get::<Principal>()
                .cloned()
                .unwrap_or_else(Principal::anonymous),
        ))
    }
}

/// Bearer トークンを Authorization ヘッダーから取得する。ヘッダーがなければ None。
fn extract_bearer_token(req: &Request<Body>) -> Result<Option<String>, AuthErrorResponse> {
    let Some(value) = req.headers().get(http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_header = value
        .to_str()
        .map_err(|_| AuthErrorResponse::from_auth_error(AuthError::InvalidAuthHeader))?;

    let parts: Vec<&str> = auth_header.splitn(2, ' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("Bearer") {
        return Err(AuthErrorResponse::from_auth_error(
            AuthError::InvalidAuthHeader,
        ));
    }

    let token = parts[1].trim();
    if token.is_empty() {
        return Err(AuthErrorResponse::from_auth_error(AuthError::MissingToken));
    }

    Ok(Some(token.to_string()))
}

/// AuthErrorResponse は認証・認可エラーの HTTP レスポンス。
#[derive(Debug)]
pub struct AuthErrorResponse {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AuthErrorResponse {
    pub fn from_auth_error(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidAuthHeader => Self::unauthenticated(),
            AuthError::TokenExpired => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "MOVIES_AUTH_TOKEN_EXPIRED".into(),
                message: "トークンの有効期限が切れています".into(),
            },
            AuthError::TokenDecodeFailure(_) => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "MOVIES_AUTH_INVALID_TOKEN".into(),
                message: "トークンが無効です".into(),
            },
            // 匿名なら認証を促し、認証済みなら権限不足とする
            AuthError::AuthorizationDenied {
                authenticated: false,
                ..
            } => Self::unauthenticated(),
            AuthError::AuthorizationDenied {
                authenticated: true,
                ..
            } => Self::forbidden(),
            AuthError::UnknownPolicy(_) => Self::forbidden(),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "MOVIES_AUTH_UNAUTHENTICATED".into(),
            message: "認証が必要です".into(),
        }
    }

    fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "MOVIES_AUTH_FORBIDDEN".into(),
            message: "この操作を実行する権限がありません".into(),
        }
    }
}

impl IntoResponse for AuthErrorResponse {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code,
            "message": self.message,
        });

        (self.status, Json(body)).into_response()
    }
}
