//! Conversions from external infrastructure errors into domain errors.

use crmbatch_domain::CrmError;
use reqwest::Error as HttpError;

/// Method label used for failures raised below the remote-method level.
pub const HTTP_LAYER: &str = "http";

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CrmError);

impl From<InfraError> for CrmError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CrmError> for InfraError {
    fn from(value: CrmError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCrmError {
    fn into_crm(self) -> CrmError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CrmError */
/* -------------------------------------------------------------------------- */

impl IntoCrmError for HttpError {
    fn into_crm(self) -> CrmError {
        // Webhook URLs embed the access secret.
        let err = self.without_url();
        if err.is_builder() {
            return CrmError::Config(format!("invalid HTTP request: {err}"));
        }

        if err.is_timeout() {
            return CrmError::remote(HTTP_LAYER, "HTTP request timed out");
        }

        if err.is_connect() {
            return CrmError::remote(HTTP_LAYER, "HTTP connection failure");
        }

        if err.is_decode() {
            return CrmError::Protocol(format!("undecodable HTTP response body: {err}"));
        }

        if let Some(status) = err.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return CrmError::remote(HTTP_LAYER, message);
        }

        CrmError::remote(HTTP_LAYER, err.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_crm())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml / url → CrmError */
/* -------------------------------------------------------------------------- */

impl IntoCrmError for serde_json::Error {
    fn into_crm(self) -> CrmError {
        CrmError::Protocol(format!("invalid JSON payload: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_crm())
    }
}

impl IntoCrmError for toml::de::Error {
    fn into_crm(self) -> CrmError {
        CrmError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_crm())
    }
}

impl IntoCrmError for url::ParseError {
    fn into_crm(self) -> CrmError {
        CrmError::Config(format!("invalid webhook URL: {self}"))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(value.into_crm())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
