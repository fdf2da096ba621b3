//! Purpose: Validate and normalize one content record for upload.
//! Exports: `UploadItem`, `Gender`, `EngagementType`, field limit constants.
//! Role: Per-record validation pipeline: field checks first, then cross-field rules.
//! Invariants: Every field-level failure is reported, not just the first.
//! Invariants: Equality and hashing use only the effective guid (guid, else url).
//! Invariants: `to_value` omits fields that were never supplied.
use crate::core::date::normalize_date;
use crate::core::error::{Error, ValidationIssue};
use crate::core::fields::{self, Raw};
use crate::core::geolocation::Geolocation;
use crate::core::text::repair_text;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use url::Url;

pub const LANGUAGE_CHARS: usize = 2;
pub const MAX_CONTENTS_CHARS: usize = 16_384;
pub const MAX_URL_CHARS: usize = 2_083;
pub const MAX_CUSTOM_FIELDS: usize = 10;
/// Custom keys must be strictly shorter than this.
pub const CUSTOM_KEY_CHAR_LIMIT: usize = 100;
/// Custom values must be strictly shorter than this.
pub const CUSTOM_VALUE_CHAR_LIMIT: usize = 10_000;

pub(crate) const IDENTITY_MESSAGE: &str = "must specify either valid guid or url";
pub(crate) const CUSTOM_LENGTH_MESSAGE: &str = "could not validate custom field keys or values. \
     keys must be less than 100 characters. values must be less than 10,000 characters";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Gender::M),
            "F" => Some(Gender::F),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EngagementType {
    Reply,
    Retweet,
    Comment,
}

impl EngagementType {
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementType::Reply => "REPLY",
            EngagementType::Retweet => "RETWEET",
            EngagementType::Comment => "COMMENT",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "REPLY" => Some(EngagementType::Reply),
            "RETWEET" => Some(EngagementType::Retweet),
            "COMMENT" => Some(EngagementType::Comment),
            _ => None,
        }
    }
}

/// A validated, immutable content record.
///
/// Two items compare equal when their effective guids match, regardless of
/// any other field. That is what the platform deduplicates on, so it is what
/// collections deduplicate on too.
#[derive(Clone, Debug)]
pub struct UploadItem {
    title: String,
    author: String,
    language: String,
    date: String,
    contents: String,
    url: Option<String>,
    guid: Option<String>,
    geolocation: Option<Geolocation>,
    custom: Option<BTreeMap<String, String>>,
    age: Option<i64>,
    gender: Option<Gender>,
    page_id: Option<String>,
    parent_guid: Option<String>,
    author_profile_id: Option<String>,
    engagement_type: Option<EngagementType>,
    effective_guid: String,
}

impl UploadItem {
    pub fn validate(raw: &Value) -> Result<Self, Error> {
        let raw = fields::as_record(raw, "upload item")
            .map_err(|issue| Error::validation(vec![issue]))?;
        Self::from_raw(raw).map_err(Error::validation)
    }

    pub(crate) fn from_raw(raw: &Raw) -> Result<Self, Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        let title = fields::required_str(raw, "title", &mut issues);
        let author = fields::required_str(raw, "author", &mut issues);
        let language = fields::required_str(raw, "language", &mut issues)
            .and_then(|language| check_language(language, &mut issues));
        let date = fields::required_str(raw, "date", &mut issues)
            .and_then(|date| match normalize_date(&date) {
                Ok(date) => Some(date),
                Err(message) => {
                    issues.push(ValidationIssue::new("date", "value_error", message));
                    None
                }
            });
        let contents = fields::required_str(raw, "contents", &mut issues)
            .and_then(|contents| check_contents(contents, &mut issues));
        let url = fields::optional_str(raw, "url", &mut issues)
            .and_then(|url| check_url(url, &mut issues));
        let guid = fields::optional_str(raw, "guid", &mut issues).filter(|guid| !guid.is_empty());

        let effective_guid = guid.clone().or_else(|| url.clone());
        if effective_guid.is_none() {
            issues.push(ValidationIssue::new("guid", "value_error", IDENTITY_MESSAGE));
        }

        let geolocation = fields::optional_object(raw, "geolocation", &mut issues).and_then(
            |geo| match Geolocation::from_raw(geo) {
                Ok(geo) => Some(geo),
                Err(nested) => {
                    issues.extend(nested.into_iter().map(|issue| issue.under("geolocation")));
                    None
                }
            },
        );
        let custom = fields::optional_object(raw, "custom", &mut issues)
            .and_then(|custom| check_custom(custom, &mut issues));
        let age = fields::optional_int(raw, "age", &mut issues);
        let gender = fields::optional_str(raw, "gender", &mut issues).and_then(|gender| {
            let parsed = Gender::parse(&gender);
            if parsed.is_none() {
                issues.push(enum_issue("gender", &["M", "F"]));
            }
            parsed
        });
        let page_id = fields::optional_str(raw, "pageId", &mut issues);
        let parent_guid = fields::optional_str(raw, "parentGuid", &mut issues);
        let author_profile_id = fields::optional_str(raw, "authorProfileId", &mut issues);
        let engagement_type =
            fields::optional_str(raw, "engagementType", &mut issues).and_then(|kind| {
                let parsed = EngagementType::parse(&kind);
                if parsed.is_none() {
                    issues.push(enum_issue("engagementType", &["REPLY", "RETWEET", "COMMENT"]));
                }
                parsed
            });

        if !issues.is_empty() {
            return Err(issues);
        }
        let (
            Some(title),
            Some(author),
            Some(language),
            Some(date),
            Some(contents),
            Some(effective_guid),
        ) = (title, author, language, date, contents, effective_guid)
        else {
            return Err(issues);
        };

        Ok(Self {
            title: repair_text(&title),
            author: repair_text(&author),
            language,
            date,
            contents: repair_text(&contents),
            url,
            guid,
            geolocation,
            custom,
            age,
            gender,
            page_id,
            parent_guid,
            author_profile_id,
            engagement_type,
            effective_guid,
        })
    }

    /// Raw-field form with unsupplied fields omitted rather than nulled.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("title".to_string(), Value::from(self.title.as_str()));
        out.insert("author".to_string(), Value::from(self.author.as_str()));
        out.insert("language".to_string(), Value::from(self.language.as_str()));
        out.insert("date".to_string(), Value::from(self.date.as_str()));
        out.insert("contents".to_string(), Value::from(self.contents.as_str()));
        insert_some(&mut out, "url", self.url.as_deref().map(Value::from));
        insert_some(&mut out, "guid", self.guid.as_deref().map(Value::from));
        insert_some(
            &mut out,
            "geolocation",
            self.geolocation.as_ref().map(Geolocation::to_value),
        );
        insert_some(
            &mut out,
            "custom",
            self.custom.as_ref().map(|custom| {
                Value::Object(
                    custom
                        .iter()
                        .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
                        .collect(),
                )
            }),
        );
        insert_some(&mut out, "age", self.age.map(Value::from));
        insert_some(&mut out, "gender", self.gender.map(|g| Value::from(g.as_str())));
        insert_some(&mut out, "pageId", self.page_id.as_deref().map(Value::from));
        insert_some(&mut out, "parentGuid", self.parent_guid.as_deref().map(Value::from));
        insert_some(
            &mut out,
            "authorProfileId",
            self.author_profile_id.as_deref().map(Value::from),
        );
        insert_some(
            &mut out,
            "engagementType",
            self.engagement_type.map(|kind| Value::from(kind.as_str())),
        );
        Value::Object(out)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Canonical ISO-8601 timestamp.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The guid exactly as supplied; see `effective_guid` for identity.
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    pub fn effective_guid(&self) -> &str {
        &self.effective_guid
    }

    pub fn geolocation(&self) -> Option<&Geolocation> {
        self.geolocation.as_ref()
    }

    pub fn custom(&self) -> Option<&BTreeMap<String, String>> {
        self.custom.as_ref()
    }

    pub fn age(&self) -> Option<i64> {
        self.age
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }

    pub fn parent_guid(&self) -> Option<&str> {
        self.parent_guid.as_deref()
    }

    pub fn author_profile_id(&self) -> Option<&str> {
        self.author_profile_id.as_deref()
    }

    pub fn engagement_type(&self) -> Option<EngagementType> {
        self.engagement_type
    }
}

impl PartialEq for UploadItem {
    fn eq(&self, other: &Self) -> bool {
        self.effective_guid == other.effective_guid
    }
}

impl Eq for UploadItem {}

impl Hash for UploadItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.effective_guid.hash(state);
    }
}

impl Serialize for UploadItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn insert_some(out: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value);
    }
}

fn enum_issue(field: &str, permitted: &[&str]) -> ValidationIssue {
    let permitted = permitted
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ");
    ValidationIssue::new(
        field,
        "type_error.enum",
        format!("value is not a valid enumeration member; permitted: {permitted}"),
    )
}

fn check_language(language: String, issues: &mut Vec<ValidationIssue>) -> Option<String> {
    let count = language.chars().count();
    if count > LANGUAGE_CHARS {
        issues.push(ValidationIssue::new(
            "language",
            "value_error.any_str.max_length",
            format!("ensure this value has at most {LANGUAGE_CHARS} characters"),
        ));
        return None;
    }
    if count < LANGUAGE_CHARS {
        issues.push(ValidationIssue::new(
            "language",
            "value_error.any_str.min_length",
            format!("ensure this value has at least {LANGUAGE_CHARS} characters"),
        ));
        return None;
    }
    Some(language)
}

fn check_contents(contents: String, issues: &mut Vec<ValidationIssue>) -> Option<String> {
    if contents.chars().count() > MAX_CONTENTS_CHARS {
        issues.push(ValidationIssue::new(
            "contents",
            "value_error.any_str.max_length",
            format!("ensure this value has at most {MAX_CONTENTS_CHARS} characters"),
        ));
        return None;
    }
    Some(contents)
}

/// Accepts absolute http(s) urls with a host; keeps the caller's spelling.
fn check_url(text: String, issues: &mut Vec<ValidationIssue>) -> Option<String> {
    if text.chars().count() > MAX_URL_CHARS {
        issues.push(ValidationIssue::new(
            "url",
            "value_error.any_str.max_length",
            format!("ensure this value has at most {MAX_URL_CHARS} characters"),
        ));
        return None;
    }
    let issue = match Url::parse(&text) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => ValidationIssue::new(
            "url",
            "value_error.url.scheme",
            "URL scheme not permitted",
        ),
        Ok(url) if url.host_str().is_none_or(str::is_empty) => {
            ValidationIssue::new("url", "value_error.url.host", "URL host invalid")
        }
        Ok(_) => return Some(text),
        Err(url::ParseError::RelativeUrlWithoutBase) => ValidationIssue::new(
            "url",
            "value_error.url.scheme",
            "invalid or missing URL scheme",
        ),
        Err(err) => ValidationIssue::new("url", "value_error.url", format!("invalid URL: {err}")),
    };
    issues.push(issue);
    None
}

/// Count and length rules run independently so both can be reported.
fn check_custom(
    raw: &Raw,
    issues: &mut Vec<ValidationIssue>,
) -> Option<BTreeMap<String, String>> {
    let mut custom = BTreeMap::new();
    let mut valid = true;
    for (key, value) in raw {
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            _ => {
                issues.push(
                    ValidationIssue::new(key, "type_error.str", "str type expected").under("custom"),
                );
                valid = false;
                continue;
            }
        };
        custom.insert(key.clone(), text);
    }

    if custom.len() > MAX_CUSTOM_FIELDS {
        issues.push(ValidationIssue::new(
            "custom",
            "value_error",
            format!(
                "{} custom fields found. Must not exceed {MAX_CUSTOM_FIELDS}.",
                custom.len()
            ),
        ));
        valid = false;
    }
    let too_long = custom.iter().any(|(key, value)| {
        key.chars().count() >= CUSTOM_KEY_CHAR_LIMIT
            || value.chars().count() >= CUSTOM_VALUE_CHAR_LIMIT
    });
    if too_long {
        issues.push(ValidationIssue::new("custom", "value_error", CUSTOM_LENGTH_MESSAGE));
        valid = false;
    }

    valid.then_some(custom)
}
