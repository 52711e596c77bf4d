//! 名前付きポリシーによる認可判定。
//!
//! ポリシーは要件 (Requirement) の列で、各要件は Principal とリクエストヘッダーを見て
//! Allowed / Denied のどちらかに到達する。ポリシー全体は全要件が Allowed のときだけ
//! Allowed となり、最初の Denied で残りの評価を打ち切る。
//!
//! 要件は Principal を直接書き換えない。API キー昇格のように Claim を追加する要件は
//! 新しい Principal を返し、それが後続の要件とハンドラに渡される。

use std::collections::HashMap;
use std::sync::Arc;

use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::claims::{
    Claim, IdentitySource, Principal, ADMIN_CLAIM, TRUSTED_MEMBER_CLAIM, USER_ID_CLAIM,
};
use crate::verifier::AuthError;

/// 管理者ポリシー名。
pub const ADMIN_POLICY: &str = "Admin";

/// 信頼済みメンバーポリシー名。
pub const TRUSTED_MEMBER_POLICY: &str = "Trusted";

/// 認証済みユーザーポリシー名。
pub const AUTHENTICATED_POLICY: &str = "Authenticated";

/// 共有シークレットヘッダーのデフォルト名。
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// PolicyDecision は要件・ポリシーの判定状態。
///
/// `Unevaluated` から `Allowed` か `Denied` へ一度だけ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Unevaluated,
    Allowed,
    Denied,
}

impl PolicyDecision {
    /// 次の要件の判定を合成する。Denied は終端で上書きされない。
    fn then(self, next: PolicyDecision) -> PolicyDecision {
        match (self, next) {
            (PolicyDecision::Denied, _) => PolicyDecision::Denied,
            (_, next) => next,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Unevaluated => "unevaluated",
            PolicyDecision::Allowed => "allowed",
            PolicyDecision::Denied => "denied",
        }
    }
}

/// Evaluation は単一要件の評価結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Allowed,
    /// Claim を追加した Principal で許可する。後続の評価はこの Principal を使う。
    AllowedAs(Principal),
    Denied,
}

/// Requirement はポリシーを構成する原子的なチェック。
pub trait Requirement: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, principal: &Principal, headers: &HeaderMap) -> Evaluation;
}

/// admin=true または trusted_member=true を要求する。副作用なし。
pub struct TrustedMemberRequirement;

impl Requirement for TrustedMemberRequirement {
    fn name(&self) -> &'static str {
        "trusted_member"
    }

    fn evaluate(&self, principal: &Principal, _headers: &HeaderMap) -> Evaluation {
        if principal.has_claim(ADMIN_CLAIM, "true")
            || principal.has_claim(TRUSTED_MEMBER_CLAIM, "true")
        {
            Evaluation::Allowed
        } else {
            Evaluation::Denied
        }
    }
}

/// 検証済みトークンを持つことを要求する。
pub struct AuthenticatedRequirement;

impl Requirement for AuthenticatedRequirement {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn evaluate(&self, principal: &Principal, _headers: &HeaderMap) -> Evaluation {
        if principal.source() == IdentitySource::Bearer {
            Evaluation::Allowed
        } else {
            Evaluation::Denied
        }
    }
}

/// ApiKeySettings は共有シークレットによる昇格の設定。
#[derive(Clone)]
pub struct ApiKeySettings {
    /// シークレットを運ぶヘッダー名。
    pub header_name: String,
    /// 照合するシークレット値。
    pub secret: SecretString,
    /// 昇格したリクエストに付与するサービスアイデンティティ (userid Claim の値)。
    pub service_user_id: String,
}

impl std::fmt::Debug for ApiKeySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySettings")
            .field("header_name", &self.header_name)
            .field("secret", &"[REDACTED]")
            .field("service_user_id", &self.service_user_id)
            .finish()
    }
}

/// 管理者要件。
///
/// 1. admin=true を持つなら即許可（ヘッダーは見ない）。
/// 2. 共有シークレットヘッダーがなければ拒否。
/// 3. 値が一致しなければ拒否。
/// 4. 一致すればサービスアイデンティティの userid Claim を追加した Principal で許可。
pub struct AdminRequirement {
    settings: ApiKeySettings,
}

impl AdminRequirement {
    pub fn new(settings: ApiKeySettings) -> Self {
        Self { settings }
    }
}

impl Requirement for AdminRequirement {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn evaluate(&self, principal: &Principal, headers: &HeaderMap) -> Evaluation {
        if principal.has_claim(ADMIN_CLAIM, "true") {
            return Evaluation::Allowed;
        }

        // シークレット未設定ならヘッダーによる昇格は無効
        if self.settings.secret.expose_secret().is_empty() {
            return Evaluation::Denied;
        }

        let Some(presented) = headers.get(self.settings.header_name.as_str()) else {
            return Evaluation::Denied;
        };

        // 非 ASCII のヘッダー値は一致し得ないので拒否
        let Ok(presented) = presented.to_str() else {
            return Evaluation::Denied;
        };

        if presented != self.settings.secret.expose_secret() {
            return Evaluation::Denied;
        }

        // 呼び出し元トークンの userid は残さず、サービス ID として扱う
        let augmented = principal.with_replaced_claim(
            Claim::new(USER_ID_CLAIM, self.settings.service_user_id.clone()),
            IdentitySource::ApiKey,
        );
        Evaluation::AllowedAs(augmented)
    }
}

/// Policy は名前付きの要件列。
pub struct Policy {
    name: String,
    requirements: Vec<Arc<dyn Requirement>>,
}

/// PolicyOutcome はポリシー評価の結果と、以降で使う Principal。
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub policy: String,
    pub decision: PolicyDecision,
    pub principal: Principal,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
        }
    }

    pub fn require(mut self, requirement: impl Requirement + 'static) -> Self {
        self.requirements.push(Arc::new(requirement));
        self
    }

    pub fn trusted_member() -> Self {
        Self::new(TRUSTED_MEMBER_POLICY).require(TrustedMemberRequirement)
    }

    pub fn admin(settings: ApiKeySettings) -> Self {
        Self::new(ADMIN_POLICY).require(AdminRequirement::new(settings))
    }

    pub fn authenticated() -> Self {
        Self::new(AUTHENTICATED_POLICY).require(AuthenticatedRequirement)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 要件を順に評価する。
    ///
    /// 要件が 1 つもないポリシーは Unevaluated のまま終わるため拒否扱いとなる。
    pub fn evaluate(&self, principal: Principal, headers: &HeaderMap) -> PolicyOutcome {
        let mut principal = principal;
        let mut decision = PolicyDecision::Unevaluated;

        for requirement in &self.requirements {
            let step = match requirement.evaluate(&principal, headers) {
                Evaluation::Allowed => PolicyDecision::Allowed,
                Evaluation::AllowedAs(augmented) => {
                    principal = augmented;
                    PolicyDecision::Allowed
                }
                Evaluation::Denied => PolicyDecision::Denied,
            };
            decision = decision.then(step);

            debug!(
                policy = %self.name,
                requirement = requirement.name(),
                decision = step.as_str(),
                "requirement evaluated"
            );

            if decision == PolicyDecision::Denied {
                break;
            }
        }

        let decision = match decision {
            PolicyDecision::Allowed => PolicyDecision::Allowed,
            _ => PolicyDecision::Denied,
        };

        PolicyOutcome {
            policy: self.name.clone(),
            decision,
            principal,
        }
    }
}

/// AuthorizationEngine は登録済みポリシーを名前で評価する。
///
/// リクエスト間で共有する可変状態は持たない。
#[derive(Default)]
pub struct AuthorizationEngine {
    policies: HashMap<String, Policy>,
}

impl AuthorizationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admin / Trusted / Authenticated の 3 ポリシーを登録したエンジンを返す。
    pub fn with_default_policies(api_key: ApiKeySettings) -> Self {
        Self::new()
            .register(Policy::admin(api_key))
            .register(Policy::trusted_member())
            .register(Policy::authenticated())
    }

    pub fn register(mut self, policy: Policy) -> Self {
        self.policies.insert(policy.name().to_string(), policy);
        self
    }

    /// 指定ポリシーを評価する。
    ///
    /// 許可された場合は後続処理で使う Principal（昇格時は Claim 追加後のもの）を返す。
    /// 未登録のポリシー名は拒否する。
    pub fn authorize(
        &self,
        policy_name: &str,
        principal: Principal,
        headers: &HeaderMap,
    ) -> Result<Principal, AuthError> {
        let Some(policy) = self.policies.get(policy_name) else {
            warn!(policy = policy_name, "authorization requested for unknown policy");
            return Err(AuthError::UnknownPolicy(policy_name.to_string()));
        };

        let authenticated = principal.is_authenticated();
        let outcome = policy.evaluate(principal, headers);

        match outcome.decision {
            PolicyDecision::Allowed => {
                debug!(
                    policy = policy_name,
                    source = outcome.principal.source().as_str(),
                    "authorization allowed"
                );
                Ok(outcome.principal)
            }
            _ => {
                debug!(policy = policy_name, authenticated, "authorization denied");
                Err(AuthError::AuthorizationDenied {
                    policy: outcome.policy,
                    authenticated,
                })
            }
        }
    }
}
