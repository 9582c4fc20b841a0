use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote request id. The service sends numbers or strings depending on the
/// endpoint version; both are sent back as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Int(id) => write!(f, "{}", id),
            RequestId::Text(id) => f.write_str(id),
        }
    }
}

/// One finished OCR result waiting to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub request_id: RequestId,
    #[serde(default)]
    pub title: String,
    /// Failed download attempts so far. Local only.
    #[serde(skip)]
    pub attempts: u32,
}

impl ResultItem {
    pub fn new(request_id: RequestId, title: impl Into<String>) -> Self {
        Self {
            request_id,
            title: title.into(),
            attempts: 0,
        }
    }
}

/// FIFO of harvested results for one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingResultQueue {
    items: VecDeque<ResultItem>,
}

impl PendingResultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&ResultItem> {
        self.items.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut ResultItem> {
        self.items.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<ResultItem> {
        self.items.pop_front()
    }

    pub fn push_back(&mut self, item: ResultItem) {
        self.items.push_back(item);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultItem> {
        self.items.iter()
    }
}

impl FromIterator<ResultItem> for PendingResultQueue {
    fn from_iter<I: IntoIterator<Item = ResultItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<ResultItem> for PendingResultQueue {
    fn extend<I: IntoIterator<Item = ResultItem>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

/// Answer of a completion poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Processing,
    Done,
}

impl Completion {
    /// Wire text used by the HTTP transport.
    pub fn as_str(&self) -> &'static str {
        match self {
            Completion::Processing => "processing",
            Completion::Done => "ocr done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_accepts_number_and_string() {
        let items: Vec<ResultItem> = serde_json::from_str(
            r#"[{"request_id": 17, "title": "a.pdf", "status": "done"},
                {"request_id": "req-18", "title": "b.pdf"}]"#,
        )
        .unwrap();

        assert_eq!(items[0].request_id, RequestId::Int(17));
        assert_eq!(items[1].request_id, RequestId::Text("req-18".to_string()));
        assert_eq!(items[0].request_id.to_string(), "17");
        assert_eq!(items[0].attempts, 0);
    }

    #[test]
    fn test_missing_title_defaults_to_empty() {
        let item: ResultItem = serde_json::from_str(r#"{"request_id": 3}"#).unwrap();
        assert!(item.title.is_empty());
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue: PendingResultQueue = (1..=3)
            .map(|i| ResultItem::new(RequestId::Int(i), format!("{}.pdf", i)))
            .collect();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_front().unwrap().request_id, RequestId::Int(1));
        assert_eq!(queue.front().unwrap().request_id, RequestId::Int(2));
    }
}
