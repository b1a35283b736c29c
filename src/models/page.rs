use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `page` is 1-based; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Query filters of one list endpoint, serialized into the query string.
///
/// `polls` tells whether the filtered set can still contain records in a
/// non-terminal state; list views only run their refresh timer when it does.
pub trait ListFilter: Serialize + Clone + PartialEq + Default + Send + Sync + 'static {
    fn polls(&self) -> bool {
        false
    }
}

/// One page of a list endpoint: `{ list, total, page, page_size }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64) as u32
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct PagedBody<T> {
    // Go backends encode an empty slice as `null`.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    list: Vec<T>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    page_size: u32,
}

/// Older backends answer `/accounts`, `/groups` and `/api-keys` with a bare
/// JSON array; both shapes are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody<T> {
    Paged(PagedBody<T>),
    Bare(Option<Vec<T>>),
}

impl<'de, T> Deserialize<'de> for Page<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PageBody::<T>::deserialize(deserializer)? {
            PageBody::Paged(p) => Ok(Page {
                total: p.total,
                page: p.page.max(1),
                page_size: if p.page_size == 0 {
                    p.list.len() as u32
                } else {
                    p.page_size
                },
                list: p.list,
            }),
            PageBody::Bare(list) => {
                let list = list.unwrap_or_default();
                Ok(Page {
                    total: list.len() as u64,
                    page: 1,
                    page_size: list.len() as u32,
                    list,
                })
            }
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_body() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"list":[1,2],"total":42,"page":3,"page_size":2}"#).unwrap();
        assert_eq!(page.list, vec![1, 2]);
        assert_eq!(page.total, 42);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages(), 21);
    }

    #[test]
    fn test_null_list_is_empty() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"list":null,"total":0,"page":1,"page_size":20}"#).unwrap();
        assert!(page.list.is_empty());
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn test_bare_array_body() {
        let page: Page<u32> = serde_json::from_str("[5,6,7]").unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.list, vec![5, 6, 7]);

        let page: Page<u32> = serde_json::from_str("null").unwrap();
        assert!(page.list.is_empty());
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
    }
}
