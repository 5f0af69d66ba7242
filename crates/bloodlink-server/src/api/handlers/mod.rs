//! Route handlers, one module per resource family.

pub mod accounts;
pub mod admin;
pub mod appointments;
pub mod centers;
pub mod donations;
pub mod requests;
pub mod resources;

use bloodlink_core::repository::Pagination;
use serde::Deserialize;

const MAX_PAGE_SIZE: u64 = 100;

/// `?offset=&limit=` with a capped page size.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}

/// Query structs with their own filters carry `offset` / `limit` inline;
/// `#[serde(flatten)]` does not parse numbers from query strings.
pub fn pagination(offset: Option<u64>, limit: Option<u64>) -> Pagination {
    let default = Pagination::default();
    Pagination {
        offset: offset.unwrap_or(default.offset),
        limit: limit.unwrap_or(default.limit).clamp(1, MAX_PAGE_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        let page = PageQuery {
            offset: Some(20),
            limit: Some(10_000),
        };
        let p = page.pagination();
        assert_eq!(p.offset, 20);
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(PageQuery::default().pagination().limit, 50);
    }
}
