use std::sync::Arc;

use movies_auth::{
    require_policy_with_hook, AuthMiddlewareFuture, AuthorizationEngine, DecisionHook,
    PolicyDecision,
};
use movies_telemetry::Metrics;

/// PolicyState はポリシーミドルウェアが使う共有状態。
#[derive(Clone)]
pub struct PolicyState {
    pub engine: Arc<AuthorizationEngine>,
    pub metrics: Arc<Metrics>,
}

/// require_policy は名前付きポリシーを必須とし、判定結果を
/// `authorization_decisions_total` に記録するミドルウェアファクトリ。
/// authenticate の後に使用すること。
///
/// ルートとポリシーの対応:
/// - 映画の登録・更新 -> Trusted
/// - 映画の削除 -> Admin
/// - 評価の登録・削除・一覧 -> Authenticated
pub fn require_policy(
    state: PolicyState,
    policy: &'static str,
) -> impl Fn(axum::extract::Request, axum::middleware::Next) -> AuthMiddlewareFuture + Clone {
    require_policy_with_hook(state.engine, policy, Some(record_decisions(state.metrics)))
}

fn record_decisions(metrics: Arc<Metrics>) -> DecisionHook {
    Arc::new(move |policy: &'static str, decision: PolicyDecision| {
        metrics.record_authorization(policy, decision.as_str())
    })
}
