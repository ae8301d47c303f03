//! User-facing error messages.
//!
//! `to_display_message` is the only way a failure should reach a person.
//! Precedence: structured detail first, then the per-status text, then
//! network wording or the raw message, then the generic fallback.

use crate::detail::{ErrorDetail, validation_lines};
use crate::error::GatewayError;

pub const MSG_BAD_REQUEST: &str = "Datos inválidos. Revisa los campos.";
pub const MSG_SESSION_EXPIRED: &str = "Sesión expirada. Inicia sesión nuevamente.";
pub const MSG_FORBIDDEN: &str = "No tienes permisos para esta acción.";
pub const MSG_NOT_FOUND: &str = "El recurso no fue encontrado.";
pub const MSG_CONFLICT: &str = "Ya existe un registro con estos datos.";
pub const MSG_UNPROCESSABLE: &str = "Error de validación. Revisa los campos.";
pub const MSG_SERVER_ERROR: &str = "Error del servidor. Intenta de nuevo.";
pub const MSG_NETWORK: &str = "Error de conexión. Verifica tu internet.";
pub const MSG_UNKNOWN: &str = "Error desconocido. Intenta de nuevo.";

/// Display text for a gateway failure.
pub fn to_display_message(err: &GatewayError) -> String {
    describe(err.detail(), err.status(), Some(err.message()))
}

/// Display text for any error. Gateway failures go through the full table;
/// everything else is judged by its message alone.
pub fn display_message_for(err: &(dyn std::error::Error + 'static)) -> String {
    match err.downcast_ref::<GatewayError>() {
        Some(gateway_err) => to_display_message(gateway_err),
        None => describe(&ErrorDetail::Absent, None, Some(&err.to_string())),
    }
}

/// The mapping table over the raw failure parts.
pub fn describe(detail: &ErrorDetail, status: Option<u16>, message: Option<&str>) -> String {
    match detail {
        ErrorDetail::Validation(errors) if !errors.is_empty() => return validation_lines(errors),
        ErrorDetail::Message(text) => return text.clone(),
        _ => {}
    }

    if let Some(text) = status.and_then(status_message) {
        return text.to_string();
    }

    match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(message) if is_network_message(message) => MSG_NETWORK.to_string(),
        Some(message) => message.to_string(),
        None => MSG_UNKNOWN.to_string(),
    }
}

fn status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some(MSG_BAD_REQUEST),
        401 => Some(MSG_SESSION_EXPIRED),
        403 => Some(MSG_FORBIDDEN),
        404 => Some(MSG_NOT_FOUND),
        409 => Some(MSG_CONFLICT),
        422 => Some(MSG_UNPROCESSABLE),
        500 => Some(MSG_SERVER_ERROR),
        _ => None,
    }
}

fn is_network_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("network") || lower.contains("fetch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::FieldError;

    #[test]
    fn test_validation_entries_win_over_status() {
        let detail =
            ErrorDetail::Validation(vec![FieldError::new(&["body", "email"], "invalid")]);
        assert_eq!(describe(&detail, Some(422), None), "email: invalid");
    }

    #[test]
    fn test_string_detail_is_verbatim() {
        let detail = ErrorDetail::Message("Stock insuficiente".to_string());
        assert_eq!(describe(&detail, Some(400), None), "Stock insuficiente");
    }

    #[test]
    fn test_status_table() {
        let cases = [
            (400, MSG_BAD_REQUEST),
            (401, MSG_SESSION_EXPIRED),
            (403, MSG_FORBIDDEN),
            (404, MSG_NOT_FOUND),
            (409, MSG_CONFLICT),
            (422, MSG_UNPROCESSABLE),
            (500, MSG_SERVER_ERROR),
        ];
        for (status, expected) in cases {
            assert_eq!(
                describe(&ErrorDetail::Absent, Some(status), Some("HTTP x")),
                expected
            );
        }
    }

    #[test]
    fn test_structured_detail_falls_through_to_status() {
        let detail = ErrorDetail::Structured(serde_json::json!({"code": 1}));
        assert_eq!(describe(&detail, Some(409), Some("{\"code\":1}")), MSG_CONFLICT);
    }

    #[test]
    fn test_network_wording() {
        assert_eq!(
            describe(&ErrorDetail::Absent, None, Some("Network connection failed: refused")),
            MSG_NETWORK
        );
        assert_eq!(
            describe(&ErrorDetail::Absent, None, Some("Failed to fetch")),
            MSG_NETWORK
        );
    }

    #[test]
    fn test_plain_message_and_fallback() {
        assert_eq!(
            describe(&ErrorDetail::Absent, Some(418), Some("HTTP 418")),
            "HTTP 418"
        );
        assert_eq!(describe(&ErrorDetail::Absent, None, None), MSG_UNKNOWN);
        assert_eq!(describe(&ErrorDetail::Absent, None, Some("   ")), MSG_UNKNOWN);
    }

    #[test]
    fn test_gateway_error_mapping() {
        assert_eq!(to_display_message(&GatewayError::forbidden()), MSG_FORBIDDEN);
        assert_eq!(
            to_display_message(&GatewayError::unauthorized()),
            MSG_SESSION_EXPIRED
        );
    }

    #[test]
    fn test_display_message_for_foreign_error() {
        let io = std::io::Error::other("disk quota exceeded");
        assert_eq!(display_message_for(&io), "disk quota exceeded");

        let wrapped = GatewayError::from_response(404, ErrorDetail::Absent);
        assert_eq!(display_message_for(&wrapped), MSG_NOT_FOUND);
    }

    #[test]
    fn test_pure_and_deterministic() {
        let detail =
            ErrorDetail::Validation(vec![FieldError::new(&["body", "price"], "must be positive")]);
        let first = describe(&detail, Some(422), Some("x"));
        let second = describe(&detail, Some(422), Some("x"));
        assert_eq!(first, second);
    }
}
