// 🏠 Property features - raw form input and the encoded model input
//
// The categorical codes must be the ones the predictor was trained with.
// They live in one versioned table (FeatureEncoding) instead of inline
// literals, and predictors declare which version they expect.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORICAL INPUTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostedBy {
    Owner,
    Dealer,
    Builder,
}

impl PostedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostedBy::Owner => "Owner",
            PostedBy::Dealer => "Dealer",
            PostedBy::Builder => "Builder",
        }
    }

    pub fn parse(label: &str) -> Result<Self, ValidationError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(PostedBy::Owner),
            "dealer" => Ok(PostedBy::Dealer),
            "builder" => Ok(PostedBy::Builder),
            _ => Err(ValidationError::UnknownCategory {
                field: "posted_by",
                value: label.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BhkOrRk {
    Bhk,
    Rk,
}

impl BhkOrRk {
    pub fn as_str(&self) -> &'static str {
        match self {
            BhkOrRk::Bhk => "BHK",
            BhkOrRk::Rk => "RK",
        }
    }

    pub fn parse(label: &str) -> Result<Self, ValidationError> {
        match label.trim().to_ascii_uppercase().as_str() {
            "BHK" => Ok(BhkOrRk::Bhk),
            "RK" => Ok(BhkOrRk::Rk),
            _ => Err(ValidationError::UnknownCategory {
                field: "bhk_or_rk",
                value: label.to_string(),
            }),
        }
    }
}

/// Parse a yes/no toggle.
pub fn parse_yes_no(field: &'static str, raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(ValidationError::UnknownCategory {
            field,
            value: raw.to_string(),
        }),
    }
}

// ============================================================================
// PROPERTY FORM (what the caller submits)
// ============================================================================

pub const BHK_RANGE: (u32, u32) = (1, 10);
pub const SQUARE_FT_RANGE: (f64, f64) = (100.0, 10_000.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyForm {
    pub city: String,
    /// Locality, free text, may be empty
    pub area: String,
    pub country: String,
    pub posted_by: PostedBy,
    pub under_construction: bool,
    pub rera: bool,
    pub bhk_no: u32,
    pub bhk_or_rk: BhkOrRk,
    pub square_ft: f64,
    pub ready_to_move: bool,
    pub resale: bool,
    pub longitude: f64,
    pub latitude: f64,
}

impl Default for PropertyForm {
    fn default() -> Self {
        PropertyForm {
            city: "Delhi NCR".to_string(),
            area: "Whitefield".to_string(),
            country: "India".to_string(),
            posted_by: PostedBy::Owner,
            under_construction: false,
            rera: false,
            bhk_no: 2,
            bhk_or_rk: BhkOrRk::Bhk,
            square_ft: 1000.0,
            ready_to_move: false,
            resale: false,
            longitude: 77.59,
            latitude: 12.97,
        }
    }
}

impl PropertyForm {
    /// Cities offered by the form. Anything else is accepted as free text.
    pub const CITIES: [&'static str; 7] = [
        "Bengaluru",
        "Mumbai",
        "Delhi NCR",
        "Hyderabad",
        "Chennai",
        "Pune",
        "Other",
    ];

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.city.trim().is_empty() {
            return Err(ValidationError::MissingField("city"));
        }
        check_range("bhk_no", self.bhk_no as f64, BHK_RANGE.0 as f64, BHK_RANGE.1 as f64)?;
        check_range("square_ft", self.square_ft, SQUARE_FT_RANGE.0, SQUARE_FT_RANGE.1)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons, so test for the accepted interval
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

// ============================================================================
// FEATURE VECTOR (what the predictor consumes)
// ============================================================================

/// Column names, in training order.
pub const FEATURE_NAMES: [&str; 10] = [
    "POSTED_BY",
    "UNDER_CONSTRUCTION",
    "RERA",
    "BHK_NO.",
    "BHK_OR_RK",
    "SQUARE_FT",
    "READY_TO_MOVE",
    "RESALE",
    "LONGITUDE",
    "LATITUDE",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureVector {
    #[serde(rename = "POSTED_BY")]
    pub posted_by: i64,
    #[serde(rename = "UNDER_CONSTRUCTION")]
    pub under_construction: i64,
    #[serde(rename = "RERA")]
    pub rera: i64,
    #[serde(rename = "BHK_NO.")]
    pub bhk_no: i64,
    #[serde(rename = "BHK_OR_RK")]
    pub bhk_or_rk: i64,
    #[serde(rename = "SQUARE_FT")]
    pub square_ft: f64,
    #[serde(rename = "READY_TO_MOVE")]
    pub ready_to_move: i64,
    #[serde(rename = "RESALE")]
    pub resale: i64,
    #[serde(rename = "LONGITUDE")]
    pub longitude: f64,
    #[serde(rename = "LATITUDE")]
    pub latitude: f64,
}

impl FeatureVector {
    /// Values paired with their column names, in training order.
    pub fn columns(&self) -> [(&'static str, f64); 10] {
        [
            (FEATURE_NAMES[0], self.posted_by as f64),
            (FEATURE_NAMES[1], self.under_construction as f64),
            (FEATURE_NAMES[2], self.rera as f64),
            (FEATURE_NAMES[3], self.bhk_no as f64),
            (FEATURE_NAMES[4], self.bhk_or_rk as f64),
            (FEATURE_NAMES[5], self.square_ft),
            (FEATURE_NAMES[6], self.ready_to_move as f64),
            (FEATURE_NAMES[7], self.resale as f64),
            (FEATURE_NAMES[8], self.longitude),
            (FEATURE_NAMES[9], self.latitude),
        ]
    }

    /// Parse a stored or caller-supplied payload. Any other shape is rejected.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| ValidationError::MalformedPayload(e.to_string()))
    }
}

// ============================================================================
// ENCODING TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEncoding {
    pub version: &'static str,
    pub posted_by: [(PostedBy, i64); 3],
    pub bhk_or_rk: [(BhkOrRk, i64); 2],
}

/// Category codes as assigned at training time (labels in sorted order).
pub const CATEGORY_CODES_V1: FeatureEncoding = FeatureEncoding {
    version: "category-codes-v1",
    posted_by: [
        (PostedBy::Builder, 0),
        (PostedBy::Dealer, 1),
        (PostedBy::Owner, 2),
    ],
    bhk_or_rk: [(BhkOrRk::Bhk, 0), (BhkOrRk::Rk, 1)],
};

impl Default for FeatureEncoding {
    fn default() -> Self {
        CATEGORY_CODES_V1
    }
}

impl FeatureEncoding {
    pub fn posted_by_code(&self, value: PostedBy) -> i64 {
        self.posted_by
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, code)| *code)
            .unwrap_or_default()
    }

    pub fn bhk_or_rk_code(&self, value: BhkOrRk) -> i64 {
        self.bhk_or_rk
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, code)| *code)
            .unwrap_or_default()
    }

    /// Validate the form and map it onto the model's input columns.
    pub fn encode(&self, form: &PropertyForm) -> Result<FeatureVector, ValidationError> {
        form.validate()?;
        Ok(FeatureVector {
            posted_by: self.posted_by_code(form.posted_by),
            under_construction: flag(form.under_construction),
            rera: flag(form.rera),
            bhk_no: form.bhk_no as i64,
            bhk_or_rk: self.bhk_or_rk_code(form.bhk_or_rk),
            square_ft: form.square_ft,
            ready_to_move: flag(form.ready_to_move),
            resale: flag(form.resale),
            longitude: form.longitude,
            latitude: form.latitude,
        })
    }
}

fn flag(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_codes_follow_sorted_labels() {
        let enc = CATEGORY_CODES_V1;
        assert_eq!(enc.posted_by_code(PostedBy::Builder), 0);
        assert_eq!(enc.posted_by_code(PostedBy::Dealer), 1);
        assert_eq!(enc.posted_by_code(PostedBy::Owner), 2);
        assert_eq!(enc.bhk_or_rk_code(BhkOrRk::Bhk), 0);
        assert_eq!(enc.bhk_or_rk_code(BhkOrRk::Rk), 1);
    }

    #[test]
    fn test_every_label_has_a_distinct_code() {
        let enc = FeatureEncoding::default();
        let mut codes: Vec<i64> = enc.posted_by.iter().map(|(_, c)| *c).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn test_encode_default_form() {
        let mut form = PropertyForm::default();
        form.rera = true;
        form.resale = true;

        let fv = CATEGORY_CODES_V1.encode(&form).unwrap();
        assert_eq!(fv.posted_by, 2);
        assert_eq!(fv.under_construction, 0);
        assert_eq!(fv.rera, 1);
        assert_eq!(fv.resale, 1);
        assert_eq!(fv.bhk_no, 2);
        assert_eq!(fv.square_ft, 1000.0);
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let mut form = PropertyForm::default();
        form.square_ft = 50.0;
        let err = CATEGORY_CODES_V1.encode(&form).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "square_ft", .. }));

        let mut form = PropertyForm::default();
        form.latitude = f64::NAN;
        assert!(CATEGORY_CODES_V1.encode(&form).is_err());

        let mut form = PropertyForm::default();
        form.bhk_no = 0;
        assert!(CATEGORY_CODES_V1.encode(&form).is_err());
    }

    #[test]
    fn test_encode_requires_city() {
        let mut form = PropertyForm::default();
        form.city = "  ".to_string();
        assert_eq!(
            CATEGORY_CODES_V1.encode(&form).unwrap_err(),
            ValidationError::MissingField("city")
        );
    }

    #[test]
    fn test_payload_uses_training_column_names() {
        let fv = CATEGORY_CODES_V1.encode(&PropertyForm::default()).unwrap();
        let json = serde_json::to_value(&fv).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), FEATURE_NAMES.len());
        for name in FEATURE_NAMES {
            assert!(obj.contains_key(name), "missing column {}", name);
        }
    }

    #[test]
    fn test_payload_shape_is_enforced() {
        let fv = CATEGORY_CODES_V1.encode(&PropertyForm::default()).unwrap();
        let mut json = serde_json::to_value(&fv).unwrap();
        assert_eq!(FeatureVector::from_payload(&json).unwrap(), fv);

        json["EXTRA"] = serde_json::json!(1);
        assert!(FeatureVector::from_payload(&json).is_err());

        let missing = serde_json::json!({ "POSTED_BY": 0 });
        assert!(FeatureVector::from_payload(&missing).is_err());
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(PostedBy::parse("dealer").unwrap(), PostedBy::Dealer);
        assert_eq!(BhkOrRk::parse("rk").unwrap(), BhkOrRk::Rk);
        assert!(PostedBy::parse("agent").is_err());
        assert!(parse_yes_no("rera", "Yes").unwrap());
        assert!(!parse_yes_no("rera", "No").unwrap());
        assert!(parse_yes_no("rera", "maybe").is_err());
    }
}
