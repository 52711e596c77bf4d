use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded::byte_serialize;

/// 映画リソース全体を表すキャッシュタグ。
pub const MOVIES_TAG: &str = "movies";

/// CacheTag はエントリをまとめて無効化するためのラベル。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn movies() -> Self {
        Self::new(MOVIES_TAG)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CacheKey は正規化済みのクエリシグネチャ。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// QuerySignature は読み取りクエリからキャッシュキーを組み立てる。
///
/// パスとパラメータ名は小文字化し、パラメータ名の順に並べる。
/// パス要素・名前・値はパーセントエンコードしてから連結するので、値に `&` や `=` を含んでも
/// 別のクエリと同じキーにはならない。
/// 値の既定値は呼び出し側で適用してから渡すこと（`page` 省略と `page=1` を同じキーにするため）。
#[derive(Debug, Clone)]
pub struct QuerySignature {
    path: String,
    params: BTreeMap<String, String>,
}

impl QuerySignature {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_end_matches('/').to_ascii_lowercase(),
            params: BTreeMap::new(),
        }
    }

    /// パスの末尾に要素を 1 つ追加する。大文字小文字はそのまま保持する。
    pub fn segment(mut self, segment: &str) -> Self {
        self.path.push('/');
        self.path.push_str(&encode(segment));
        self
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// 値が None または空文字列ならパラメータを含めない。
    pub fn param_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value.map(|v| v.to_string()) {
            Some(v) if !v.is_empty() => self.param(name, v),
            _ => self,
        }
    }

    pub fn into_key(self) -> CacheKey {
        if self.params.is_empty() {
            return CacheKey(self.path);
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        CacheKey(format!("{}?{}", self.path, query))
    }
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}
