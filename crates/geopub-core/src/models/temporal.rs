use serde::{Deserialize, Serialize};

/// Temporal coverage of a publication, encoded as two parallel arrays of
/// optional date strings. A point in time is `Some(start)` with `None` end;
/// an interval fills both sides. Entries at the same index belong together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalExtent {
    #[serde(default)]
    pub start: Vec<Option<String>>,
    #[serde(default)]
    pub end: Vec<Option<String>>,
}

impl TemporalExtent {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Single start/end pair, either side optional.
    pub fn pair(start: Option<String>, end: Option<String>) -> Self {
        Self {
            start: vec![start],
            end: vec![end],
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.start.iter().any(Option::is_some) && !self.end.iter().any(Option::is_some)
    }

    pub fn first_start(&self) -> Option<&str> {
        self.start.iter().flatten().next().map(String::as_str)
    }

    pub fn first_end(&self) -> Option<&str> {
        self.end.iter().flatten().next().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(TemporalExtent::empty().is_empty());
        assert!(TemporalExtent::pair(None, None).is_empty());
    }

    #[test]
    fn test_one_sided_pair_is_not_empty() {
        let extent = TemporalExtent::pair(Some("2010".to_string()), None);
        assert!(!extent.is_empty());
        assert_eq!(extent.first_start(), Some("2010"));
        assert_eq!(extent.first_end(), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let extent = TemporalExtent::pair(Some("2010-01-01".to_string()), Some("2012-12-31".to_string()));
        let encoded = serde_json::to_string(&extent).unwrap();
        let decoded: TemporalExtent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, extent);
    }
}
