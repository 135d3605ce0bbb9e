//! HTTP handlers for sales (stock-out), CSV imports and menu sales

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::StockOutTransaction;
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{OWNER_ONLY, OWNER_OR_STAFF};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::ledger::LedgerQuery;
use crate::services::stock::{CsvImportOutcome, ManualSaleInput, MenuSaleInput, MenuSaleOutcome};
use crate::services::LedgerService;
use crate::AppState;

const CSV_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "text/plain",
    "application/vnd.ms-excel",
];

pub async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<PaginatedResponse<StockOutTransaction>>> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let scope = state.tenancy.resolve(&user)?;
    let sales = LedgerService::new(state.db).list_sales(&scope, query).await?;
    Ok(Json(sales))
}

/// Record a manual stock-out
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ManualSaleInput>,
) -> AppResult<(StatusCode, Json<StockOutTransaction>)> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let sale = state.stock.record_manual_sale(&user, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn update_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<ManualSaleInput>,
) -> AppResult<Json<StockOutTransaction>> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let sale = state.stock.update_manual_sale(&user, sale_id, input).await?;
    Ok(Json(sale))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_any_role(OWNER_ONLY)?;
    state.stock.delete_manual_sale(&user, sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sell menu portions through the recipe
pub async fn sell_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<MenuSaleInput>,
) -> AppResult<(StatusCode, Json<MenuSaleOutcome>)> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let outcome = state.stock.sell_menu(&user, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Upload accepted by the import endpoint
#[derive(Debug)]
pub struct CsvUpload {
    pub text: String,
    pub note: Option<String>,
}

fn upload_error(message: &str) -> AppError {
    AppError::invalid("file", message)
}

/// Accept a file by its name or, failing that, its declared content type
pub fn is_csv_upload(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    if file_name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".csv")) {
        return true;
    }
    content_type.is_some_and(|ct| {
        let essence = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
        CSV_CONTENT_TYPES.contains(&essence.as_str())
    })
}

/// Decode the uploaded bytes, enforcing the size limit and UTF-8
pub fn decode_csv_bytes(bytes: &[u8], max_bytes: usize) -> AppResult<String> {
    if bytes.is_empty() {
        return Err(upload_error("Uploaded file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(upload_error(&format!(
            "File is larger than {} KiB",
            max_bytes / 1024
        )));
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| upload_error("File must be UTF-8 text"))
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> AppResult<CsvUpload> {
    let mut text = None;
    let mut note = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(&e.body_text()))?
    {
        match field.name() {
            Some("note") => {
                let value = field.text().await.map_err(|e| upload_error(&e.body_text()))?;
                note = Some(value).filter(|v| !v.trim().is_empty());
            }
            Some("file") => {
                if !is_csv_upload(field.file_name(), field.content_type()) {
                    return Err(upload_error("Only .csv files are accepted"));
                }
                let bytes = field.bytes().await.map_err(|e| upload_error(&e.body_text()))?;
                text = Some(decode_csv_bytes(&bytes, max_bytes)?);
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| upload_error("A CSV file is required"))?;
    Ok(CsvUpload { text, note })
}

/// Import a cashier sales sheet (multipart `file`, optional `note`)
pub async fn import_sales_csv(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<CsvImportOutcome>)> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let upload = read_upload(multipart, state.config.stock.csv_max_bytes).await?;

    let outcome = state
        .stock
        .process_sales_csv(&user, &upload.text, upload.note.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_upload_detection() {
        assert!(is_csv_upload(Some("penjualan.CSV"), None));
        assert!(is_csv_upload(Some("export"), Some("text/csv; charset=utf-8")));
        assert!(!is_csv_upload(Some("laporan.xlsx"), Some("application/octet-stream")));
        assert!(!is_csv_upload(None, None));
    }

    #[test]
    fn test_decode_enforces_limit_and_encoding() {
        assert_eq!(decode_csv_bytes(b"menu,qty\n", 1024).unwrap(), "menu,qty\n");
        assert!(decode_csv_bytes(b"", 1024).is_err());
        assert!(decode_csv_bytes(&[b'a'; 2048], 1024).is_err());
        assert!(decode_csv_bytes(&[0xff, 0xfe, 0x00], 1024).is_err());
    }
}
