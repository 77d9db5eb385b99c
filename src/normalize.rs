//! Monetary field normalization.
//!
//! Every monetary field of a dataset is resolved once into a plain JSON
//! number before routing. Null or absent fields are left alone; other
//! non-numeric, non-string values are passed through for Typesense to
//! judge against the schema.

use serde_json::{Number, Value};

use crate::datasets::Dataset;
use crate::decimal;
use crate::error::DecodeError;
use crate::models::{Document, MonetaryValue};

/// Decode the dataset's monetary fields in place.
///
/// On failure the document may be partially normalized; callers drop it.
pub fn normalize_document(doc: &mut Document, dataset: &Dataset) -> Result<(), DecodeError> {
    for &field in dataset.monetary_fields {
        let Some(value) = doc.get_mut(field) else {
            continue;
        };
        let parsed = match serde_json::from_value::<MonetaryValue>(value.clone()) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let number = resolve(parsed, dataset.decimal_scale).map_err(|e| DecodeError::Field {
            field: field.to_string(),
            source: Box::new(e),
        })?;
        *value = Value::Number(number);
    }
    Ok(())
}

fn resolve(value: MonetaryValue, scale: u32) -> Result<Number, DecodeError> {
    let resolved = match value {
        MonetaryValue::Raw(n) => n,
        MonetaryValue::Encoded(text) => decimal::decode(&text, scale)?,
    };
    Number::from_f64(resolved).ok_or(DecodeError::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::TRANSACTION;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_encoded_fields_become_numbers() {
        // "MDk=" is 12345
        let mut d = doc(json!({"TRANID": 1, "BILL_AMT": "MDk=", "REFUND_AMT": "AA=="}));
        normalize_document(&mut d, &TRANSACTION).unwrap();
        assert!((d["BILL_AMT"].as_f64().unwrap() - 123.45).abs() < 1e-9);
        assert_eq!(d["REFUND_AMT"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn test_numeric_fields_pass_through() {
        let mut d = doc(json!({"BILL_AMT": 99.5, "ACTUAL_AMT": 10}));
        normalize_document(&mut d, &TRANSACTION).unwrap();
        assert_eq!(d["BILL_AMT"], json!(99.5));
        assert_eq!(d["ACTUAL_AMT"].as_f64().unwrap(), 10.0);
    }

    #[test]
    fn test_non_monetary_strings_untouched() {
        let mut d = doc(json!({"STATUS": "MDk=", "BILL_AMT": null}));
        normalize_document(&mut d, &TRANSACTION).unwrap();
        assert_eq!(d["STATUS"], "MDk=");
        assert!(d["BILL_AMT"].is_null());
    }

    #[test]
    fn test_overflowing_amount_is_an_error() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let mut payload = vec![0xffu8; 130];
        payload[0] = 0x7f;
        let mut d = doc(json!({"TRANID": 1, "BILL_AMT": STANDARD.encode(&payload)}));

        let err = normalize_document(&mut d, &TRANSACTION).unwrap_err();
        assert!(err.to_string().contains("BILL_AMT"));
        assert!(matches!(
            err,
            DecodeError::Field { source, .. } if *source == DecodeError::OutOfRange
        ));
    }

    #[test]
    fn test_invalid_encoding_names_field() {
        let mut d = doc(json!({"DEF_AMT": "%%%"}));
        let err = normalize_document(&mut d, &TRANSACTION).unwrap_err();
        assert!(err.to_string().contains("DEF_AMT"));
    }
}
