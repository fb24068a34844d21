use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ConsultationBooking;
use crate::AppState;

#[derive(Deserialize)]
pub struct BookingRequest {
    pub org_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub preferred_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking: ConsultationBooking,
    pub calendly_url: Option<String>,
    /// Present when consultations are sold through Stripe.
    pub checkout_url: Option<String>,
}

fn validate(request: &BookingRequest) -> Result<()> {
    if request.org_id.trim().is_empty() {
        return Err(Error::InvalidRequest("org_id is required".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(Error::InvalidRequest("name is required".to_string()));
    }
    let email = request.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::InvalidRequest(format!("invalid email: {}", email))),
    }
}

async fn book(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingResponse>> {
    validate(&request)?;

    let mut booking = ConsultationBooking::new(
        request.org_id,
        request.name.trim().to_string(),
        request.email.trim().to_string(),
    );
    booking.preferred_date = request.preferred_date;
    booking.notes = request.notes.filter(|n| !n.trim().is_empty());
    state.store.create_booking(&booking)?;

    let checkout_url = match &state.config.stripe.consultation_price_id {
        Some(price_id) => state
            .stripe
            .create_checkout_session(&booking.org_id, price_id)
            .await?
            .url,
        None => None,
    };

    Ok(Json(BookingResponse {
        booking,
        calendly_url: state.config.consultation.calendly_url.clone(),
        checkout_url,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/consultations", post(book))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("ada@localhost", false)]
    #[case("@example.com", false)]
    #[case("ada.example.com", false)]
    fn test_email_validation(#[case] email: &str, #[case] ok: bool) {
        let request = BookingRequest {
            org_id: "00D1".to_string(),
            name: "Ada".to_string(),
            email: email.to_string(),
            preferred_date: None,
            notes: None,
        };
        assert_eq!(validate(&request).is_ok(), ok);
    }
}
