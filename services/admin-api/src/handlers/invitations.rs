use axum::{extract::State, response::Json};
use foodx_database::UnitOfWorkFactory;
use foodx_utils::{validate_email_address, FoodxError, FoodxResult, PortalUrls};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::record_change;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationRole {
    Supplier,
    Buyer,
}

impl InvitationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supplier => "supplier",
            Self::Buyer => "buyer",
        }
    }

    fn portal<'a>(&self, portals: &'a PortalUrls) -> &'a str {
        match self {
            Self::Supplier => &portals.supplier_portal,
            Self::Buyer => &portals.buyer_portal,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvitationRequest {
    pub email: String,
    pub role: InvitationRole,
    pub inviter_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationResponse {
    pub invitation_id: Uuid,
    pub email: String,
    pub role: InvitationRole,
    pub invitation_url: String,
    pub sent: bool,
}

/// Registration link into the portal of the invited party.
pub fn invitation_url(portals: &PortalUrls, role: InvitationRole, invitation_id: Uuid) -> String {
    format!(
        "{}/register?invite={}&role={}",
        role.portal(portals).trim_end_matches('/'),
        invitation_id,
        role.as_str()
    )
}

/// POST /api/v1/invitations
pub async fn send_invitation<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(request): Json<InvitationRequest>,
) -> FoodxResult<Json<InvitationResponse>> {
    let email = request.email.trim().to_lowercase();
    validate_email_address(&email)?;

    let invitation_id = Uuid::new_v4();
    let url = invitation_url(&state.config.portal_urls, request.role, invitation_id);
    let inviter = request
        .inviter_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("The FoodX team");

    if !state.mail.send_invitation(&email, &url, inviter).await {
        warn!(%invitation_id, role = request.role.as_str(), "Invitation email was not delivered");
        return Err(FoodxError::email_delivery(format!("Invitation to {} could not be sent", email)));
    }

    record_change("invitation", request.role.as_str());
    info!(%invitation_id, role = request.role.as_str(), transport = state.mail.transport_name(), "Invitation sent");
    Ok(Json(InvitationResponse {
        invitation_id,
        email,
        role: request.role,
        invitation_url: url,
        sent: true,
    }))
}
