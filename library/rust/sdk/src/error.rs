//! SDK エラー定義。

/// SdkError は SDK の処理で発生するエラーを表す。
#[derive(thiserror::Error, Debug)]
pub enum SdkError {
    /// トークン発行元から有効なトークンを得られなかった（失敗応答・タイムアウト・解析不能な本文）。
    /// キャッシュ済みの資格情報はそのまま残る。
    #[error("トークン発行元を利用できません: {0}")]
    IssuerUnavailable(String),

    /// トークンを JWT として解析できない。期限切れと同じ扱いになる。
    #[error("トークンの解析に失敗しました: {0}")]
    TokenDecodeFailure(String),

    /// HTTP リクエスト自体に失敗した。
    #[error("HTTP リクエスト失敗: {0}")]
    Http(String),

    /// API がエラーステータスを返した。
    #[error("API エラー (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("設定エラー: {0}")]
    Config(String),
}

impl SdkError {
    /// API が返した HTTP ステータス。API エラー以外は None。
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
