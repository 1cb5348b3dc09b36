//! Installment inquiries and the admin customer workflow.
//!
//! Customer status is advanced manually by an admin; the payment core only
//! ever creates customers, never moves them through the workflow.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use super::CustomerDto;
use crate::models::{Customer, CustomerStatus, PaymentStatus};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInquiryRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Course id is required"))]
    pub course_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InquiryResponse {
    pub success: bool,
    pub customer: CustomerDto,
}

/// Capture an installment inquiry as a lead.
pub async fn create_inquiry(
    State(state): State<AppState>,
    Json(payload): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<InquiryResponse>), AppError> {
    payload.validate()?;

    let course = state
        .repository
        .get_course(&payload.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Course not found")))?;

    let now = DateTime::now();
    let customer = Customer {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        course_id: payload.course_id,
        course_name: course.title,
        amount_paid: None,
        payment_status: PaymentStatus::InstallmentPending,
        status: CustomerStatus::InstallmentPending,
        message: payload.message,
        created_at: now,
        updated_at: now,
    };
    state.repository.create_customer(&customer).await?;

    tracing::info!(
        email = %customer.email,
        course_id = %customer.course_id,
        "Installment inquiry recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(InquiryResponse {
            success: true,
            customer: customer.into(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ListCustomersResponse {
    pub success: bool,
    pub customers: Vec<CustomerDto>,
    pub total_count: i64,
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListCustomersQuery>,
) -> Result<Json<ListCustomersResponse>, AppError> {
    let status_filter = match params.status.as_deref() {
        Some(raw) => Some(CustomerStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Invalid customer status: {}", raw))
        })?),
        None => None,
    };

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0);

    let (customers, total_count) = state
        .repository
        .list_customers(status_filter, limit, offset)
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(ListCustomersResponse {
        success: true,
        customers: customers.into_iter().map(Into::into).collect(),
        total_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Advance the manual customer workflow.
pub async fn update_customer_status(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<StatusCode, AppError> {
    let status = CustomerStatus::parse(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid customer status: {}",
            payload.status
        ))
    })?;

    let updated = state
        .repository
        .update_customer_status(&customer_id.to_string(), status)
        .await
        .map_err(AppError::DatabaseError)?;

    if !updated {
        return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
    }

    tracing::info!(customer_id = %customer_id, status = ?status, "Customer status updated");
    Ok(StatusCode::NO_CONTENT)
}
