use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::config::CatalogConfig;
use crate::entities::product::{Product, ProductCategory, ProductSearch, SortKey};

#[derive(Clone)]
pub struct SearchService {
    pub db: DatabaseProcessor,
    pub config: CatalogConfig,
}

/// Raw search parameters exactly as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct SearchCatalog {
    pub query: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub products: Vec<Product>,
    pub count: i64,
    pub page: i64,
    pub pages: i64,
}

/// Empty and `"all"` both mean "facet disabled".
fn facet(raw: Option<&str>) -> Option<&str> {
    match raw {
        None | Some("") | Some("all") => None,
        Some(other) => Some(other),
    }
}

/// Parses a `min-max` price range. Returns an error for anything that is
/// present but not two valid numbers.
fn parse_price_range(raw: &str) -> Result<(Decimal, Decimal), framework::Error> {
    let invalid =
        || framework::Error::InvalidInput(format!("invalid price range: {raw}"));
    let (min, max) = raw.split_once('-').ok_or_else(invalid)?;
    let min: Decimal = min.parse().map_err(|_| invalid())?;
    let max: Decimal = max.parse().map_err(|_| invalid())?;
    Ok((min, max))
}

pub fn page_count(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

impl Processor<SearchCatalog> for SearchService {
    type Output = SearchResults;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: SearchCatalog) -> Result<SearchResults, framework::Error> {
        let page = input.page.unwrap_or(1).max(1);
        let page_size = input
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(self.config.default_page_size);

        let name_query = facet(input.query.as_deref()).map(str::to_owned);
        let price = facet(input.price.as_deref())
            .map(parse_price_range)
            .transpose()?;
        let sort = input
            .order
            .as_deref()
            .map(SortKey::parse_or_default)
            .unwrap_or_default();

        // A category string outside the fixed set can never match a row.
        let category = match facet(input.category.as_deref()) {
            None => None,
            Some(raw) => match raw.parse::<ProductCategory>() {
                Ok(category) => Some(category),
                Err(()) => {
                    return Ok(SearchResults {
                        products: Vec::new(),
                        count: 0,
                        page,
                        pages: 0,
                    })
                }
            },
        };

        let result = self
            .db
            .process(ProductSearch {
                name_query,
                category,
                price,
                sort,
                limit: page_size,
                offset: page_size * (page - 1),
            })
            .await?;

        Ok(SearchResults {
            products: result.products,
            count: result.total,
            page,
            pages: page_count(result.total, page_size),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_disables_a_facet() {
        assert_eq!(facet(Some("all")), None);
        assert_eq!(facet(Some("")), None);
        assert_eq!(facet(None), None);
        assert_eq!(facet(Some("shoes")), Some("shoes"));
    }

    #[test]
    fn price_ranges_parse_min_and_max() -> Result<(), framework::Error> {
        let (min, max) = parse_price_range("1-50")?;
        assert_eq!(min, Decimal::from(1));
        assert_eq!(max, Decimal::from(50));
        let (min, max) = parse_price_range("10.50-99.99")?;
        assert_eq!(min, Decimal::new(1050, 2));
        assert_eq!(max, Decimal::new(9999, 2));
        Ok(())
    }

    #[test]
    fn malformed_price_ranges_are_rejected() {
        assert!(parse_price_range("cheap").is_err());
        assert!(parse_price_range("10-").is_err());
        assert!(parse_price_range("-").is_err());
        assert!(parse_price_range("a-b").is_err());
    }

    #[test]
    fn page_count_is_the_ceiling_of_count_over_size() {
        assert_eq!(page_count(0, 3), 0);
        assert_eq!(page_count(1, 3), 1);
        assert_eq!(page_count(3, 3), 1);
        assert_eq!(page_count(4, 3), 2);
        assert_eq!(page_count(10, 3), 4);
    }
}
