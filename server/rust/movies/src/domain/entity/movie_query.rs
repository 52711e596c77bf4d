use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    YearOfRelease,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::YearOfRelease => "yearofrelease",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// `sortBy` パラメータを解釈する。`-` 前置は降順、`+` 前置または無印は昇順。
/// 未知のフィールドは None。
pub fn parse_sort(sort_by: &str) -> Option<(SortField, SortOrder)> {
    let (order, field) = match sort_by.strip_prefix('-') {
        Some(rest) => (SortOrder::Descending, rest),
        None => (
            SortOrder::Ascending,
            sort_by.strip_prefix('+').unwrap_or(sort_by),
        ),
    };
    let field = match field.to_ascii_lowercase().as_str() {
        "title" => SortField::Title,
        "yearofrelease" => SortField::YearOfRelease,
        _ => return None,
    };
    Some((field, order))
}

/// MovieQuery は検証済みの一覧取得条件。
#[derive(Debug, Clone, PartialEq)]
pub struct MovieQuery {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub sort: Option<(SortField, SortOrder)>,
    pub page: u32,
    pub page_size: u32,
    pub user_id: Option<Uuid>,
}

impl MovieQuery {
    /// 先頭から読み飛ばす件数。
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}
