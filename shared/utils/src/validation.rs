use crate::error::{FoodxError, FoodxResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

pub fn validate_model<T: Validate>(model: &T) -> FoodxResult<()> {
    model.validate().map_err(|errors| validation_error(&errors))
}

/// Builds a `Validation` error carrying every field message.
pub fn validation_error(errors: &ValidationErrors) -> FoodxError {
    let by_field = collect_messages(errors);
    let field = if by_field.len() == 1 {
        by_field.keys().next().cloned().unwrap_or_else(|| "model".to_string())
    } else {
        "model".to_string()
    };
    FoodxError::Validation {
        field,
        message: format_validation_errors(errors),
        errors: by_field,
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    collect_messages(errors)
        .into_iter()
        .flat_map(|(_, messages)| messages)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Messages keyed by field path; nested structs use `parent.child`, schema-level rules use
/// the name the rule gave its error.
fn collect_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    collect_into(errors, None, &mut out);
    out
}

fn collect_into(errors: &ValidationErrors, prefix: Option<&str>, out: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let key = if *field == "__all__" {
                        error.code.to_string()
                    } else {
                        path.clone()
                    };
                    out.entry(key).or_default().push(describe(field, error));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_into(nested, prefix, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_path = format!("{}[{}]", path, index);
                    collect_into(nested, Some(&item_path), out);
                }
            }
        }
    }
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "email" => "Invalid email format".to_string(),
        "length" => format!("Length validation failed for field '{}'", field),
        "range" => format!("Value out of range for field '{}'", field),
        "required" => format!("Field '{}' is required", field),
        code => format!("Validation failed for field '{}': {}", field, code),
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
            )
            .ok()
        })
        .as_ref()
}

pub fn validate_email_address(email: &str) -> FoodxResult<()> {
    let valid = email_regex().map(|re| re.is_match(email.trim())).unwrap_or(false);
    if !valid {
        return Err(FoodxError::validation("email", "Invalid email address format"));
    }
    Ok(())
}

/// Splits `"Jane Doe <jane@example.com>"` into its display name and lowercased address.
/// A bare address comes back without a name.
pub fn extract_email_address(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    if let (Some(start), Some(end)) = (raw.rfind('<'), raw.rfind('>')) {
        if start < end {
            let address = raw[start + 1..end].trim().to_lowercase();
            let name = raw[..start].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| name.to_string());
            return (name, address);
        }
    }
    (None, raw.trim_matches(|c| c == '<' || c == '>').trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodx_database::RepositoryError;
    use proptest::prelude::*;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Email must be a valid email address"))]
        email: String,
        #[validate(length(min = 1))]
        company: String,
    }

    #[test]
    fn test_validation_error_lists_every_field() {
        let input = Signup {
            email: "not-an-email".into(),
            company: String::new(),
        };
        let error = validate_model(&input).unwrap_err();

        match error {
            FoodxError::Validation { field, errors, message } => {
                assert_eq!(field, "model");
                assert_eq!(errors.len(), 2);
                assert_eq!(errors["email"], vec!["Email must be a valid email address".to_string()]);
                assert!(message.contains("company"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_extract_email_address() {
        assert_eq!(
            extract_email_address("Jane Doe <Jane@Example.com>"),
            (Some("Jane Doe".to_string()), "jane@example.com".to_string())
        );
        assert_eq!(
            extract_email_address("\"Sales\" <sales@andes.example>"),
            (Some("Sales".to_string()), "sales@andes.example".to_string())
        );
        assert_eq!(extract_email_address(" buyer@fresh.example "), (None, "buyer@fresh.example".to_string()));
    }

    #[test]
    fn test_email_address_validation() {
        assert!(validate_email_address("buyer@fresh.example").is_ok());
        assert!(validate_email_address("buyer@").is_err());
    }

    #[test]
    fn test_unknown_field_is_a_validation_error() {
        let error: FoodxError = RepositoryError::unknown_field("products", "colour").into();
        assert_eq!(error.http_status_code(), 400);
    }

    proptest! {
        #[test]
        fn prop_extracted_address_is_lowercase(local in "[a-zA-Z]{1,10}", domain in "[a-zA-Z]{1,10}") {
            let raw = format!("Someone <{}@{}.com>", local, domain);
            let (_, address) = extract_email_address(&raw);
            prop_assert_eq!(address, format!("{}@{}.com", local, domain).to_lowercase());
        }
    }
}
