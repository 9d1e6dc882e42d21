use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body extractor whose rejections render as `bad_request` errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `bad_request` errors.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
