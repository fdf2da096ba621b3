//! Purpose: Validate an ordered set of upload items and enforce guid uniqueness.
//! Exports: `UploadCollection`, `duplicate_guids`.
//! Role: Unit handed to the uploader; sliced into batches without re-validation.
//! Invariants: Effective guids are pairwise distinct inside a collection.
//! Invariants: Item errors are aggregated across all items, located under `items.<index>`.
//! Invariants: Iteration order is input order; collections are immutable once built.
use crate::core::error::{Error, ErrorKind, ValidationIssue};
use crate::core::fields;
use crate::core::item::UploadItem;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::{Bound, Index, RangeBounds};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadCollection {
    items: Vec<UploadItem>,
}

impl UploadCollection {
    /// Validate every raw record, then check guid uniqueness.
    pub fn validate(raw_items: &[Value]) -> Result<Self, Error> {
        let mut items = Vec::with_capacity(raw_items.len());
        let mut issues = Vec::new();

        for (index, raw) in raw_items.iter().enumerate() {
            let result = fields::as_record(raw, "upload item")
                .map_err(|issue| vec![issue])
                .and_then(UploadItem::from_raw);
            match result {
                Ok(item) => items.push(item),
                Err(item_issues) => issues.extend(
                    item_issues
                        .into_iter()
                        .map(|issue| issue.under(index.to_string()).under("items")),
                ),
            }
        }

        if !issues.is_empty() {
            return Err(Error::validation(issues));
        }
        Self::from_items(items)
    }

    /// Build from already-validated items; only the uniqueness rule runs.
    pub fn from_items(items: Vec<UploadItem>) -> Result<Self, Error> {
        let duplicates = duplicate_guids(&items);
        if !duplicates.is_empty() {
            let listed = duplicates
                .iter()
                .map(|guid| format!("'{guid}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::validation(vec![ValidationIssue::new(
                "items",
                "value_error.duplicate",
                format!("duplicate item guids detected: [{listed}]"),
            )])
            .with_hint("Every item needs a distinct guid (or url when guid is omitted)."));
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&UploadItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UploadItem> {
        self.items.iter()
    }

    /// Sub-collection for `range`, clamped to the collection bounds.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let len = self.items.len();
        let start = match range.start_bound() {
            Bound::Included(start) => *start,
            Bound::Excluded(start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(end) => end.saturating_add(1),
            Bound::Excluded(end) => *end,
            Bound::Unbounded => len,
        }
        .min(len);

        if start >= end {
            return Self::default();
        }
        Self {
            items: self.items[start..end].to_vec(),
        }
    }

    /// Contiguous, order-preserving sub-collections of at most `size` items.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = UploadCollection> + '_ {
        self.items.chunks(size.max(1)).map(|chunk| Self {
            items: chunk.to_vec(),
        })
    }

    /// Array of exclude-unset item objects, as sent in request payloads.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.iter().map(UploadItem::to_value).collect())
    }
}

impl Index<usize> for UploadCollection {
    type Output = UploadItem;

    fn index(&self, index: usize) -> &UploadItem {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a UploadCollection {
    type Item = &'a UploadItem;
    type IntoIter = std::slice::Iter<'a, UploadItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for UploadCollection {
    type Item = UploadItem;
    type IntoIter = std::vec::IntoIter<UploadItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Serialize for UploadCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

impl TryFrom<Vec<UploadItem>> for UploadCollection {
    type Error = Error;

    fn try_from(items: Vec<UploadItem>) -> Result<Self, Error> {
        Self::from_items(items)
    }
}

/// Every effective guid that occurs more than once, most frequent first,
/// ties in order of first appearance.
pub fn duplicate_guids(items: &[UploadItem]) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        counts.entry(item.effective_guid()).or_insert((0, index)).0 += 1;
    }
    let mut duplicates: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(guid, (count, first))| (guid, count, first))
        .collect();
    duplicates.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    duplicates
        .into_iter()
        .map(|(guid, _, _)| guid.to_string())
        .collect()
}

pub(crate) fn ensure_not_empty(collection: &UploadCollection) -> Result<(), Error> {
    if collection.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("upload collection is empty")
            .with_hint("Provide at least one item to upload."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{UploadCollection, duplicate_guids};
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    fn raw_item(guid: &str) -> Value {
        json!({
            "title": "Example Title",
            "date": "2010-01-26T16:14:00+00:00",
            "guid": guid,
            "author": "me",
            "contents": "Example content",
            "language": "en"
        })
    }

    fn raw_items(count: usize) -> Vec<Value> {
        (0..count).map(|index| raw_item(&format!("post{index}"))).collect()
    }

    #[test]
    fn unique_items_keep_input_order() {
        let raw = raw_items(5);
        let collection = UploadCollection::validate(&raw).expect("collection");
        assert_eq!(collection.len(), 5);
        for (index, item) in collection.iter().enumerate() {
            assert_eq!(item, &collection[index]);
            assert_eq!(item.effective_guid(), format!("post{index}"));
        }
        assert_eq!(collection.to_value(), Value::Array(raw));
    }

    #[test]
    fn every_duplicated_guid_is_reported() {
        let raw = vec![
            raw_item("a"),
            raw_item("b"),
            raw_item("a"),
            raw_item("c"),
            raw_item("b"),
            raw_item("b"),
        ];
        let err = UploadCollection::validate(&raw).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].field(), "items");
        assert_eq!(
            err.issues()[0].message,
            "duplicate item guids detected: ['b', 'a']"
        );
    }

    #[test]
    fn url_and_guid_collide_on_effective_guid() {
        let mut by_url = raw_item("unused");
        by_url.as_object_mut().expect("object").remove("guid");
        by_url["url"] = json!("http://www.example.com/post1");
        let by_guid = raw_item("http://www.example.com/post1");

        let err = UploadCollection::validate(&[by_url, by_guid]).expect_err("err");
        assert!(err.issues()[0].message.contains("'http://www.example.com/post1'"));
    }

    #[test]
    fn item_errors_are_aggregated_with_their_index() {
        let mut bad_language = raw_item("x");
        bad_language["language"] = json!("engl");
        let mut bad_date = raw_item("y");
        bad_date["date"] = json!("yesterday");
        let raw = vec![raw_item("ok"), bad_language, bad_date, json!(42)];

        let err = UploadCollection::validate(&raw).expect_err("err");
        let fields: Vec<String> = err.issues().iter().map(|issue| issue.field()).collect();
        assert_eq!(
            fields,
            vec!["items.1.language", "items.2.date", "items.3.__root__"]
        );
    }

    #[test]
    fn duplicates_are_not_checked_until_items_are_valid() {
        let mut invalid = raw_item("a");
        invalid["language"] = json!("xyz");
        let err = UploadCollection::validate(&[raw_item("a"), raw_item("a"), invalid])
            .expect_err("err");
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].field(), "items.2.language");
    }

    #[test]
    fn slices_clamp_and_keep_order() {
        let collection = UploadCollection::validate(&raw_items(5)).expect("collection");
        let middle = collection.slice(1..3);
        assert_eq!(middle.len(), 2);
        assert_eq!(middle[0].effective_guid(), "post1");
        assert_eq!(middle[1].effective_guid(), "post2");
        assert_eq!(collection.slice(3..100).len(), 2);
        assert!(collection.slice(4..2).is_empty());
        assert_eq!(collection.slice(..).len(), 5);
        assert_eq!(collection.get(7), None);
    }

    #[test]
    fn batches_are_contiguous_and_bounded() {
        let collection = UploadCollection::validate(&raw_items(7)).expect("collection");
        let sizes: Vec<usize> = collection.batches(3).map(|batch| batch.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let last = collection.batches(3).last().expect("last");
        assert_eq!(last[0].effective_guid(), "post6");
    }

    #[test]
    fn duplicate_guids_is_empty_for_unique_items() {
        let collection = UploadCollection::validate(&raw_items(3)).expect("collection");
        assert!(duplicate_guids(collection.items()).is_empty());
    }
}
