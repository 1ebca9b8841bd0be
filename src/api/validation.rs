use actix_web::HttpResponse;
use serde::Serialize;

/// Shared error body shape for every protocol-level failure.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

/// JsonConfig with standardized error handling for validated JSON bodies.
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| {
        let mut fields = serde_json::Map::new();

        match err {
            actix_web_validator::Error::Validate(validation_errors) => {
                for (field, errors) in validation_errors.field_errors() {
                    let messages: Vec<String> = errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("Validation error in field: {}", field))
                        })
                        .collect();
                    fields.insert(field.to_string(), serde_json::json!({ "errors": messages }));
                }
            }
            actix_web_validator::Error::Deserialize(de_err) => {
                fields.insert(
                    "message".to_string(),
                    serde_json::json!(format!("Invalid JSON body: {}", de_err)),
                );
            }
            _ => {
                fields.insert("message".to_string(), serde_json::json!("Validation error"));
            }
        }

        let error_response = ErrorResponse {
            error: "Validation failed".to_string(),
            fields: serde_json::Value::Object(fields),
        };
        actix_web::error::InternalError::from_response(
            "",
            HttpResponse::BadRequest().json(error_response),
        )
        .into()
    })
}
