// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Paged list responses.

use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_fields() {
        let page: PaginatedResponse<String> = serde_json::from_value(json!({
            "data": ["widget"],
            "total": 5,
            "page": 3,
            "pageSize": 2,
            "totalPages": 3,
        }))
        .unwrap();

        assert_eq!(page.data, vec!["widget".to_string()]);
        assert_eq!(page.page_size, 2);
        assert!(!page.has_next_page());
    }
}
