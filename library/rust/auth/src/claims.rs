//! JWT Claims 構造体とリクエスト単位の Principal。

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// 管理者フラグを表す Claim 名。
pub const ADMIN_CLAIM: &str = "admin";

/// 信頼済みメンバーフラグを表す Claim 名。
pub const TRUSTED_MEMBER_CLAIM: &str = "trusted_member";

/// ユーザー ID を表す Claim 名。API キー経由の昇格時にも同じ名前で注入される。
pub const USER_ID_CLAIM: &str = "userid";

/// TokenClaims は検証済みトークンから取り出した Claims を表す。
///
/// 既知の登録済み Claim 以外はすべて `custom` に保持し、Principal 構築時に
/// (type, value) の組へ展開する。
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// サブジェクト（発行側ではメールアドレスが入ることが多い）
    pub sub: String,

    /// トークン発行者
    #[serde(default)]
    pub iss: Option<String>,

    /// トークンの対象オーディエンス
    #[serde(default)]
    pub aud: Audience,

    /// トークンの有効期限（Unix タイムスタンプ）
    pub exp: u64,

    /// トークンの発行時刻（Unix タイムスタンプ）
    #[serde(default)]
    pub iat: Option<u64>,

    /// JWT ID
    #[serde(default)]
    pub jti: Option<String>,

    /// メールアドレス
    #[serde(default)]
    pub email: Option<String>,

    /// 発行時に付与されたカスタム Claim（admin, trusted_member, userid など）
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

/// Audience は JWT の aud Claim を表す。
/// 文字列または文字列配列のどちらも受け付ける。
#[derive(Debug, Clone, Default)]
pub struct Audience(pub Vec<String>);

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct AudienceVisitor;

        impl<'de> de::Visitor<'de> for AudienceVisitor {
            type Value = Audience;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Audience(vec![v.to_string()]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<String>()? {
                    values.push(v);
                }
                Ok(Audience(values))
            }
        }

        deserializer.deserialize_any(AudienceVisitor)
    }
}

/// Claim は Principal が持つ (type, value) の組。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// IdentitySource は Principal の身元がどこから来たかを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// トークンを持たないリクエスト。
    Anonymous,
    /// 検証済み Bearer トークン。
    Bearer,
    /// 共有シークレットヘッダーによる昇格。
    ApiKey,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::Anonymous => "anonymous",
            IdentitySource::Bearer => "bearer",
            IdentitySource::ApiKey => "api_key",
        }
    }
}

/// Principal は 1 リクエストに紐づく認証済みアイデンティティと Claim 集合。
///
/// 不変値として扱う。Claim の差し替えは [`Principal::with_replaced_claim`] で新しい値を作り、
/// 後続の評価へ明示的に渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    claims: BTreeSet<Claim>,
    source: IdentitySource,
}

impl Principal {
    /// Claim を持たない匿名 Principal を返す。
    pub fn anonymous() -> Self {
        Self {
            claims: BTreeSet::new(),
            source: IdentitySource::Anonymous,
        }
    }

    /// 任意の Claim 集合から Principal を構築する。
    pub fn new(claims: impl IntoIterator<Item = Claim>, source: IdentitySource) -> Self {
        Self {
            claims: claims.into_iter().collect(),
            source,
        }
    }

    /// 検証済みトークンの Claims から Bearer Principal を構築する。
    ///
    /// 真偽値・数値は文字列化し、配列は要素ごとに別の Claim として展開する。
    pub fn from_token(claims: &TokenClaims) -> Self {
        let mut set = BTreeSet::new();
        set.insert(Claim::new("sub", claims.sub.clone()));
        if let Some(ref email) = claims.email {
            set.insert(Claim::new("email", email.clone()));
        }
        if let Some(ref jti) = claims.jti {
            set.insert(Claim::new("jti", jti.clone()));
        }
        for (name, value) in &claims.custom {
            flatten_claim(name, value, &mut set);
        }

        Self {
            claims: set,
            source: IdentitySource::Bearer,
        }
    }

    /// 同じ type の Claim をすべて取り除いてから `claim` を追加した新しい Principal を返す。
    /// userid のように 1 つだけ持つべき Claim の差し替えに使う。
    pub fn with_replaced_claim(&self, claim: Claim, source: IdentitySource) -> Self {
        let mut claims = self.claims.clone();
        claims.retain(|c| c.claim_type != claim.claim_type);
        claims.insert(claim);
        Self { claims, source }
    }

    /// (type, value) が完全一致する Claim を持つかを判定する。
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    /// 指定 type の最初の Claim 値を返す。
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// userid Claim を UUID として返す。存在しないか不正な形式なら None。
    pub fn user_id(&self) -> Option<Uuid> {
        self.find_first(USER_ID_CLAIM)
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn is_authenticated(&self) -> bool {
        self.source != IdentitySource::Anonymous
    }

    pub fn source(&self) -> IdentitySource {
        self.source
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }
}

fn flatten_claim(name: &str, value: &serde_json::Value, out: &mut BTreeSet<Claim>) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::String(s) => {
            out.insert(Claim::new(name, s.clone()));
        }
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_claim(name, item, out);
            }
        }
        // bool / number / object はそのまま JSON 表現を値とする
        other => {
            out.insert(Claim::new(name, other.to_string()));
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Principal{{source={}, sub={:?}, userid={:?}}}",
            self.source.as_str(),
            self.find_first("sub"),
            self.find_first(USER_ID_CLAIM),
        )
    }
}
