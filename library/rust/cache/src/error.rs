use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// タグ単位の無効化に失敗した。呼び出し側は warn ログを出し、TTL による失効に任せる。
    #[error("タグの無効化に失敗しました: {tag}: {reason}")]
    InvalidationFailed { tag: String, reason: String },
    #[error("キャッシュエントリが壊れています: {key}")]
    CorruptEntry { key: String },
    #[error("接続エラー: {0}")]
    ConnectionError(String),
}
