use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::ReceiptCreate;
use super::repo;
use super::repo_types::ReceiptWithItems;
use crate::auth::repo_types::User;
use crate::state::AppState;

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("OCR failed to extract any text from the image.")]
    NoText,

    #[error("Failed to parse the receipt text.")]
    Unparsed,

    #[error("Validation error for parsed receipt: {0}")]
    Invalid(String),

    #[error("User not found")]
    UnknownUser,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReceiptError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReceiptError::NoText | ReceiptError::Invalid(_) => StatusCode::BAD_REQUEST,
            ReceiptError::UnknownUser => StatusCode::UNAUTHORIZED,
            ReceiptError::Unparsed | ReceiptError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReceiptError> for (StatusCode, String) {
    fn from(e: ReceiptError) -> Self {
        (e.status(), e.to_string())
    }
}

/// Image → OCR text → parser mapping → validated receipt. Touches no database.
pub async fn extract_receipt(
    st: &AppState,
    upload: UploadItem<'_>,
) -> Result<ReceiptCreate, ReceiptError> {
    let image = st.images.persist(upload.body, upload.content_type).await?;

    let text = st.ocr.extract_text(image.path()).await;
    drop(image);
    if text.trim().is_empty() {
        warn!("ocr produced no text");
        return Err(ReceiptError::NoText);
    }

    let parsed = st.parser.parse(&text).await;
    if parsed.is_empty() {
        error!("parser returned nothing for ocr text");
        return Err(ReceiptError::Unparsed);
    }

    ReceiptCreate::from_parsed(parsed).map_err(|msg| {
        warn!(error = %msg, "parsed receipt failed validation");
        ReceiptError::Invalid(msg)
    })
}

/// Runs the full upload pipeline and stores the receipt for `user_id`.
/// The owner is checked first so a token for a deleted account never reaches OCR or the model.
pub async fn process_upload(
    st: &AppState,
    user_id: Uuid,
    upload: UploadItem<'_>,
) -> Result<ReceiptWithItems, ReceiptError> {
    if User::find_by_id(&st.db, user_id).await?.is_none() {
        warn!(%user_id, "upload for unknown user");
        return Err(ReceiptError::UnknownUser);
    }

    let receipt = extract_receipt(st, upload).await?;
    let saved = repo::create_receipt(&st.db, user_id, &receipt).await?;
    info!(
        %user_id,
        receipt_id = %saved.receipt.id,
        items = saved.items.len(),
        category = %receipt.category,
        "receipt stored"
    );
    Ok(saved)
}
