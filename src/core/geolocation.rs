//! Purpose: Validate the optional location descriptor attached to an upload item.
//! Exports: `Geolocation`.
//! Role: Leaf validator used by `UploadItem` for its `geolocation` field.
//! Invariants: latitude and longitude are both present or both absent.
//! Invariants: At least one of id, zipcode, or the lat/long pair is present.
//! Invariants: Empty id/zipcode strings normalize to absent.
use crate::core::error::{Error, ValidationIssue};
use crate::core::fields::{self, Raw};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub(crate) const PAIR_MESSAGE: &str = "must specify both valid latitude and longitude";
pub(crate) const IDENTIFIER_MESSAGE: &str = "must specify zipcode, id, or latitude and longitude";

#[derive(Clone, Debug, PartialEq)]
pub struct Geolocation {
    id: Option<String>,
    zipcode: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl Geolocation {
    pub fn validate(raw: &Value) -> Result<Self, Error> {
        let raw = fields::as_record(raw, "geolocation")
            .map_err(|issue| Error::validation(vec![issue]))?;
        Self::from_raw(raw).map_err(Error::validation)
    }

    /// Issue locations are relative to the geolocation object; callers nest them.
    pub(crate) fn from_raw(raw: &Raw) -> Result<Self, Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let id = fields::optional_str(raw, "id", &mut issues).filter(|id| !id.is_empty());
        let zipcode =
            fields::optional_str(raw, "zipcode", &mut issues).filter(|zip| !zip.is_empty());

        let before = issues.len();
        let latitude = fields::optional_float(raw, "latitude", &mut issues);
        let longitude = fields::optional_float(raw, "longitude", &mut issues);
        let coordinates_parsed = issues.len() == before;

        if coordinates_parsed {
            match (latitude, longitude) {
                (Some(_), None) => {
                    issues.push(ValidationIssue::new("longitude", "value_error", PAIR_MESSAGE));
                }
                (None, Some(_)) => {
                    issues.push(ValidationIssue::new("latitude", "value_error", PAIR_MESSAGE));
                }
                (Some(_), Some(_)) => {}
                (None, None) => {
                    if id.is_none() && zipcode.is_none() {
                        issues.push(ValidationIssue::new(
                            "zipcode",
                            "value_error",
                            IDENTIFIER_MESSAGE,
                        ));
                    }
                }
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            id,
            zipcode,
            latitude,
            longitude,
        })
    }

    /// Only the fields that are present; absent fields are omitted, not nulled.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if let Some(id) = &self.id {
            out.insert("id".to_string(), Value::from(id.as_str()));
        }
        if let Some(zipcode) = &self.zipcode {
            out.insert("zipcode".to_string(), Value::from(zipcode.as_str()));
        }
        if let Some(latitude) = self.latitude {
            out.insert("latitude".to_string(), Value::from(latitude));
        }
        if let Some(longitude) = self.longitude {
            out.insert("longitude".to_string(), Value::from(longitude));
        }
        Value::Object(out)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn zipcode(&self) -> Option<&str> {
        self.zipcode.as_deref()
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl Serialize for Geolocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
