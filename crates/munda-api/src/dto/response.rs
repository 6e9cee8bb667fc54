//! 响应 DTO 定义

use serde::Serialize;
use uuid::Uuid;

use munda_core::dto::PageResult;

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> From<PageResult<T>> for PageResponse<T> {
    fn from(page: PageResult<T>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

/// API 统一成功响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// 删除操作响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_response_camel_case() {
        let page = PageResponse::from(PageResult::new(vec!["a", "b"], 42, 2, 20));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageSize"], 20);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(DeletedResponse { id: Uuid::nil() }))
            .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], Uuid::nil().to_string());
    }
}
