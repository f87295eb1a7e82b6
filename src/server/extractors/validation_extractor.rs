use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::server::error::Error;

/// query string that has been deserialized and run through validator
pub struct ValidatedQuery<T>(pub T);

/// json body that has been deserialized and run through validator
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| Error::BadRequest(e.to_string().replace('\n', ", ")))?;

        Ok(ValidatedQuery(value))
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| Error::BadRequest(e.to_string().replace('\n', ", ")))?;

        Ok(ValidatedJson(value))
    }
}
