use uuid::Uuid;

/// Movie はカタログ上の映画を表す。
///
/// `rating` は全ユーザーの平均評価、`user_rating` は問い合わせたユーザー自身の評価で、
/// どちらも読み取り時にリポジトリが埋める。
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year_of_release: i32,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub user_rating: Option<i32>,
}

impl Movie {
    pub fn new(title: String, year_of_release: i32, genres: Vec<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, year_of_release, genres)
    }

    pub fn with_id(id: Uuid, title: String, year_of_release: i32, genres: Vec<String>) -> Self {
        Self {
            id,
            title,
            year_of_release,
            genres,
            rating: None,
            user_rating: None,
        }
    }

    /// タイトルと公開年から導出する URL 用識別子。
    pub fn slug(&self) -> String {
        slugify(&self.title, self.year_of_release)
    }
}

/// 英数字・空白・`_`・`-` 以外を除去して小文字化し、空白を `-` に置き換えて年を付ける。
pub fn slugify(title: &str, year_of_release: i32) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    format!(
        "{}-{}",
        cleaned.to_ascii_lowercase().replace(' ', "-"),
        year_of_release
    )
}
