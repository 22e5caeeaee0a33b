//! Parameter and credential Secrets attached to service resources

use k8s_openapi::api::core::v1::Secret;
use kf_conditions::ConditionUpdate;

/// Key of a parameters Secret holding the JSON object sent to the broker
pub const PARAMS_SECRET_KEY: &str = "params";

fn secret_value<'a>(secret: &'a Secret, key: &str) -> Option<&'a [u8]> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return Some(value.0.as_slice());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(String::as_bytes)
}

/// Whether a parameters Secret has been filled in by the client
///
/// The `params` key must be present and hold valid JSON.
pub fn params_populated_update(secret: &Secret) -> ConditionUpdate {
    let Some(contents) = secret_value(secret, PARAMS_SECRET_KEY) else {
        return ConditionUpdate::unknown(
            "SecretNotPopulated",
            format!("secret is missing key: {PARAMS_SECRET_KEY:?}"),
        );
    };

    if serde_json::from_slice::<serde_json::Value>(contents).is_err() {
        return ConditionUpdate::failure(
            "SecretInvalid",
            format!("secret key {PARAMS_SECRET_KEY:?} must be valid JSON"),
        );
    }

    ConditionUpdate::Success
}

/// Update for a Secret that doesn't exist yet
pub(crate) fn secret_missing(message: &str) -> ConditionUpdate {
    ConditionUpdate::unknown("SecretMissing", message)
}
