use serde::{Deserialize, Serialize};

use super::validation::FieldErrors;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw list query string: `page`, `size`, `sortBy`, `sortDir`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/// Validated paging and sorting. `sort_by` is still an API field name;
/// repositories map it to a column through their own whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_FIELD.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            ..Self::default()
        }
    }

    pub fn sorted(mut self, sort_by: &str, direction: SortDirection) -> Self {
        self.sort_by = sort_by.to_string();
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

impl PageQuery {
    pub fn validate(self) -> Result<PageRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        let page = self.page.unwrap_or(0);
        let size = self.size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
        errors.range_i64("page", page, 0, i64::from(u32::MAX));
        errors.range_i64("size", size, 1, i64::from(MAX_PAGE_SIZE));

        let direction = match self.sort_dir.as_deref().map(str::trim) {
            None | Some("") => SortDirection::Desc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(_) => {
                errors.add("sortDir", "must be 'asc' or 'desc'");
                SortDirection::Desc
            }
        };
        let sort_by = self
            .sort_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string());

        errors.finish(PageRequest {
            page: u32::try_from(page).unwrap_or(0),
            size: u32::try_from(size).unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by,
            direction,
        })
    }
}

/// One page of results plus the totals needed for a pager.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let size = i64::from(request.size.max(1));
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: (total_elements + size - 1) / size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_first_page_of_ten_newest_first() {
        let req = PageQuery::default().validate().unwrap();
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn explicit_values_are_kept() {
        let req = PageQuery {
            page: Some(2),
            size: Some(25),
            sort_by: Some("name".into()),
            sort_dir: Some("ASC".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(req.page, 2);
        assert_eq!(req.size, 25);
        assert_eq!(req.sort_by, "name");
        assert_eq!(req.direction, SortDirection::Asc);
        assert_eq!(req.offset(), 50);
    }

    #[test]
    fn rejects_bad_size_page_and_direction() {
        let errors = PageQuery {
            page: Some(-1),
            size: Some(0),
            sort_by: None,
            sort_dir: Some("sideways".into()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("page").is_some());
        assert!(errors.get("size").is_some());
        assert!(errors.get("sortDir").is_some());
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::new(0, 10);
        let page = PageResponse::new(vec![1, 2, 3], &req, 21);
        assert_eq!(page.total_pages, 3);
        let empty: PageResponse<i32> = PageResponse::new(vec![], &req, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
