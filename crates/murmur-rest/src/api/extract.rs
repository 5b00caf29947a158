//! Request extractors.

use std::collections::BTreeMap;

use axum::{
    Form,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};

use super::error::ApiError;

/// Submitted form fields.
///
/// Requests without a body content type carry no fields rather than being rejected,
/// so validation messages can be answered for bare POSTs.
#[derive(Debug, Clone, Default)]
pub struct FormFields(pub BTreeMap<String, String>);

impl FormFields {
    /// A field's value, `None` when missing or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Non-empty fields other than `excluded`.
    pub fn non_empty_except<'a>(
        &'a self,
        excluded: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.0
            .iter()
            .filter(move |(k, v)| !v.is_empty() && !excluded.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !req.headers().contains_key(CONTENT_TYPE) {
            return Ok(Self::default());
        }

        let Form(fields) = Form::<BTreeMap<String, String>>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        FormFields(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_get_treats_empty_as_missing() {
        let form = fields(&[("message", ""), ("reason", "spam")]);
        assert_eq!(form.get("message"), None);
        assert_eq!(form.get("reason"), Some("spam"));
        assert_eq!(form.get("missing"), None);
    }

    #[test]
    fn test_non_empty_except() {
        let form = fields(&[("key", "users"), ("value", ""), ("a", "1"), ("b", ""), ("c", "3")]);
        let rest: Vec<_> = form.non_empty_except(&["key", "value"]).collect();
        assert_eq!(rest, vec![("a", "1"), ("c", "3")]);
    }
}
