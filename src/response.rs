//! List response envelope.

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize, Debug)]
pub struct PageBody {
    pub data: Vec<Value>,
    pub meta: PageMeta,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct PageMeta {
    pub total: i64,
    pub count: usize,
    pub limit: u32,
    pub offset: u32,
    /// None on the last page.
    pub next_offset: Option<u64>,
    /// 1-based page holding `offset`.
    pub page: u64,
    pub pages: u64,
}

impl PageMeta {
    pub fn new(total: i64, count: usize, limit: u32, offset: u32) -> Self {
        let total_u = total.max(0) as u64;
        let limit_u = limit.max(1) as u64;
        let end = offset as u64 + count as u64;
        PageMeta {
            total,
            count,
            limit,
            offset,
            next_offset: (end < total_u).then_some(end),
            page: offset as u64 / limit_u + 1,
            pages: total_u.div_ceil(limit_u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_points_to_next() {
        let m = PageMeta::new(25, 10, 10, 10);
        assert_eq!(m.next_offset, Some(20));
        assert_eq!((m.page, m.pages), (2, 3));
    }

    #[test]
    fn last_page_has_no_next_offset() {
        let m = PageMeta::new(25, 5, 10, 20);
        assert_eq!(m.next_offset, None);
        assert_eq!(m.page, 3);
    }

    #[test]
    fn empty_table() {
        let m = PageMeta::new(0, 0, 10, 0);
        assert_eq!((m.next_offset, m.page, m.pages), (None, 1, 0));
    }
}
