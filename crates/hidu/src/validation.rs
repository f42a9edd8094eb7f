//! Write-payload validation.
//!
//! [`MENU_ITEM_RULES`] is the one place field constraints live. Create
//! payloads must satisfy every rule; update payloads must satisfy the rule of
//! every field they carry. Untyped payloads (CLI input, seed catalogs) go
//! through [`Validator::parse_create`] / [`Validator::parse_update`], which
//! additionally reject unrecognized and missing fields.

use crate::services::{CreateMenuItemInput, UpdateMenuItemInput};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A single constraint on a payload field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// String must contain at least this many characters
    MinLength(usize),
    /// Number must be finite and at least this value
    Min(f64),
}

/// A rule bound to a wire field name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
}

/// Constraint table for menu item payloads.
pub const MENU_ITEM_RULES: &[FieldRule] = &[
    FieldRule {
        field: "id",
        rule: Rule::MinLength(3),
    },
    FieldRule {
        field: "name",
        rule: Rule::MinLength(3),
    },
    FieldRule {
        field: "description",
        rule: Rule::MinLength(10),
    },
    FieldRule {
        field: "price",
        rule: Rule::Min(0.0),
    },
    FieldRule {
        field: "priceLarge",
        rule: Rule::Min(0.0),
    },
    FieldRule {
        field: "category",
        rule: Rule::MinLength(2),
    },
];

/// Fields accepted by a create payload; `true` marks required ones.
const CREATE_FIELDS: &[(&str, bool)] = &[
    ("id", true),
    ("name", true),
    ("description", true),
    ("price", true),
    ("priceLarge", false),
    ("category", true),
    ("imageUrl", true),
    ("isPopular", false),
    ("isBestSeller", false),
    ("isNew", false),
    ("isAvailable", false),
];

/// A violated constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every violation found in one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.violations.iter().map(|v| v.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new(field, message)],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn into_result(violations: Vec<Violation>) -> Result<(), ValidationErrors> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { violations })
    }
}

/// Checks write payloads against a constraint table
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    rules: &'static [FieldRule],
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(MENU_ITEM_RULES)
    }
}

impl Validator {
    pub fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    fn rule_for(&self, field: &str) -> Option<Rule> {
        self.rules.iter().find(|r| r.field == field).map(|r| r.rule)
    }

    fn check_str(&self, field: &str, value: &str, out: &mut Vec<Violation>) {
        if let Some(Rule::MinLength(min)) = self.rule_for(field) {
            if value.chars().count() < min {
                out.push(Violation::new(
                    field,
                    format!(
                        "{} must be longer than or equal to {} characters",
                        field, min
                    ),
                ));
            }
        }
    }

    fn check_number(&self, field: &str, value: f64, out: &mut Vec<Violation>) {
        if !value.is_finite() {
            out.push(Violation::new(
                field,
                format!("{} must be a finite number", field),
            ));
            return;
        }
        if let Some(Rule::Min(min)) = self.rule_for(field) {
            if value < min {
                out.push(Violation::new(
                    field,
                    format!("{} must not be less than {}", field, min),
                ));
            }
        }
    }

    /// Validate a typed create payload
    pub fn validate_create(&self, input: &CreateMenuItemInput) -> Result<(), ValidationErrors> {
        let mut violations = Vec::new();
        self.check_str("id", &input.business_id, &mut violations);
        self.check_str("name", &input.name, &mut violations);
        self.check_str("description", &input.description, &mut violations);
        self.check_number("price", input.price, &mut violations);
        if let Some(price_large) = input.price_large {
            self.check_number("priceLarge", price_large, &mut violations);
        }
        self.check_str("category", &input.category, &mut violations);
        self.check_str("imageUrl", &input.image_url, &mut violations);
        into_result(violations)
    }

    /// Validate a typed update payload. An empty patch is valid.
    pub fn validate_update(&self, input: &UpdateMenuItemInput) -> Result<(), ValidationErrors> {
        let mut violations = Vec::new();
        if let Some(name) = &input.name {
            self.check_str("name", name, &mut violations);
        }
        if let Some(description) = &input.description {
            self.check_str("description", description, &mut violations);
        }
        if let Some(price) = input.price {
            self.check_number("price", price, &mut violations);
        }
        if let Some(price_large) = input.price_large {
            self.check_number("priceLarge", price_large, &mut violations);
        }
        if let Some(category) = &input.category {
            self.check_str("category", category, &mut violations);
        }
        if let Some(image_url) = &input.image_url {
            self.check_str("imageUrl", image_url, &mut violations);
        }
        into_result(violations)
    }

    /// Parse and validate an untyped create payload
    pub fn parse_create(&self, payload: Value) -> Result<CreateMenuItemInput, ValidationErrors> {
        let allowed: Vec<&str> = CREATE_FIELDS.iter().map(|(f, _)| *f).collect();
        let mut violations = check_shape(&payload, &allowed)?;

        if let Value::Object(map) = &payload {
            for (field, required) in CREATE_FIELDS {
                if *required && map.get(*field).is_none_or(Value::is_null) {
                    violations.push(Violation::new(
                        *field,
                        format!("{} should not be empty", field),
                    ));
                }
            }
        }
        into_result(violations)?;

        let input: CreateMenuItemInput = typed(payload)?;
        self.validate_create(&input)?;
        Ok(input)
    }

    /// Parse and validate an untyped update payload
    pub fn parse_update(&self, payload: Value) -> Result<UpdateMenuItemInput, ValidationErrors> {
        let allowed: Vec<&str> = CREATE_FIELDS
            .iter()
            .map(|(f, _)| *f)
            .filter(|f| *f != "id")
            .collect();
        into_result(check_shape(&payload, &allowed)?)?;

        let input: UpdateMenuItemInput = typed(payload)?;
        self.validate_update(&input)?;
        Ok(input)
    }
}

/// Require a JSON object and report fields outside `allowed`.
fn check_shape(payload: &Value, allowed: &[&str]) -> Result<Vec<Violation>, ValidationErrors> {
    let Value::Object(map) = payload else {
        return Err(ValidationErrors::single(
            "input",
            "input must be an object",
        ));
    };

    Ok(map
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .map(|key| Violation::new(key.as_str(), format!("property {} should not exist", key)))
        .collect())
}

fn typed<T: DeserializeOwned>(payload: Value) -> Result<T, ValidationErrors> {
    serde_json::from_value(payload)
        .map_err(|e| ValidationErrors::single("input", format!("invalid input: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "id": "cf-008",
            "name": "Cà phê sữa dừa",
            "description": "Cà phê với sữa dừa thơm ngon",
            "price": 20000,
            "category": "coffee",
            "imageUrl": "https://example.com/image.jpg"
        })
    }

    #[test]
    fn parse_create_accepts_valid_payload() {
        let input = Validator::default().parse_create(valid_payload()).unwrap();
        assert_eq!(input.business_id, "cf-008");
        assert_eq!(input.price, 20000.0);
        assert!(input.is_available.is_none());
    }

    #[test]
    fn short_name_is_rejected() {
        let mut payload = valid_payload();
        payload["name"] = json!("Cà");

        let err = Validator::default().parse_create(payload).unwrap_err();
        assert!(err.has_field("name"));
        assert_eq!(
            err.violations[0].message,
            "name must be longer than or equal to 3 characters"
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // 3 characters, 7 bytes in UTF-8
        let mut payload = valid_payload();
        payload["name"] = json!("Trà");
        assert!(Validator::default().parse_create(payload).is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut payload = valid_payload();
        payload["price"] = json!(-1);
        payload["priceLarge"] = json!(-5);

        let err = Validator::default().parse_create(payload).unwrap_err();
        assert!(err.has_field("price"));
        assert!(err.has_field("priceLarge"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut payload = valid_payload();
        payload["price"] = json!(0);
        assert!(Validator::default().parse_create(payload).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let payload = json!({
            "id": "c",
            "name": "ab",
            "description": "short",
            "price": -1,
            "category": "c",
            "imageUrl": "x"
        });

        let err = Validator::default().parse_create(payload).unwrap_err();
        for field in ["id", "name", "description", "price", "category"] {
            assert!(err.has_field(field), "missing violation for {}", field);
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut payload = valid_payload();
        payload["color"] = json!("brown");

        let err = Validator::default().parse_create(payload).unwrap_err();
        assert!(err.has_field("color"));
        assert_eq!(err.violations[0].message, "property color should not exist");
    }

    #[test]
    fn storage_id_is_not_client_settable() {
        let mut payload = valid_payload();
        payload["_id"] = json!("507f1f77bcf86cd799439011");

        let err = Validator::default().parse_create(payload).unwrap_err();
        assert!(err.has_field("_id"));
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let payload = json!({ "id": "cf-010", "price": 1000 });

        let err = Validator::default().parse_create(payload).unwrap_err();
        for field in ["name", "description", "category", "imageUrl"] {
            assert!(err.has_field(field), "missing violation for {}", field);
        }
    }

    #[test]
    fn wrong_types_are_rejected() {
        let mut payload = valid_payload();
        payload["price"] = json!("cheap");

        let err = Validator::default().parse_create(payload).unwrap_err();
        assert!(err.has_field("input"));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = Validator::default().parse_create(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "input must be an object");
    }

    #[test]
    fn empty_update_is_valid() {
        let input = Validator::default().parse_update(json!({})).unwrap();
        assert!(input.is_empty());
    }

    #[test]
    fn update_applies_create_constraints_to_present_fields() {
        let err = Validator::default()
            .parse_update(json!({ "description": "too short", "category": "x" }))
            .unwrap_err();
        assert!(err.has_field("description"));
        assert!(err.has_field("category"));
    }

    #[test]
    fn update_rejects_business_id() {
        let err = Validator::default()
            .parse_update(json!({ "id": "cf-999" }))
            .unwrap_err();
        assert!(err.has_field("id"));
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let input = UpdateMenuItemInput {
            price: Some(f64::NAN),
            ..Default::default()
        };
        let err = Validator::default().validate_update(&input).unwrap_err();
        assert_eq!(err.violations[0].message, "price must be a finite number");
    }

    #[test]
    fn display_joins_messages() {
        let err = Validator::default()
            .parse_update(json!({ "name": "a", "price": -2 }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "name must be longer than or equal to 3 characters; price must not be less than 0"
        );
    }
}
