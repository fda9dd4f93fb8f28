use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub subcategory_id: Option<Uuid>,
    pub product_type: Option<bool>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_twenty() {
        let pagination = Pagination {
            page: None,
            per_page: None,
        };
        assert_eq!(pagination.normalize(), (1, 20, 0));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let pagination = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(pagination.normalize(), (1, 100, 0));

        let pagination = Pagination {
            page: Some(-3),
            per_page: Some(0),
        };
        assert_eq!(pagination.normalize(), (1, 1, 0));
    }

    #[test]
    fn offset_follows_page() {
        let pagination = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(pagination.normalize(), (3, 10, 20));
    }
}
