use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::info;

use crate::{
    blockchain_manager::{LendingPoolReader, LendingPoolWriter, Wallet},
    cancellation::CancellationToken,
    errors::ActionError,
    lending_session::{ActionReceipt, LendingSession, PositionSnapshot},
    position_aggregator::{LendingAction, Percentage},
};

/// Writes are served one at a time against the single session
pub type SharedSession<C> = Arc<Mutex<LendingSession<C>>>;

/// Router state. Reads come from the published snapshots and never wait for
/// the session lock, which an action holds until its last refresh pass.
pub struct ApiState<C: LendingPoolReader + LendingPoolWriter + Wallet> {
    pub session: SharedSession<C>,
    pub snapshots: watch::Receiver<PositionSnapshot>,
}

impl<C: LendingPoolReader + LendingPoolWriter + Wallet> ApiState<C> {
    pub fn new(session: LendingSession<C>) -> Self {
        let snapshots = session.subscribe();
        Self {
            session: Arc::new(Mutex::new(session)),
            snapshots,
        }
    }

    pub fn latest_snapshot(&self) -> PositionSnapshot {
        self.snapshots.borrow().clone()
    }
}

impl<C: LendingPoolReader + LendingPoolWriter + Wallet> Clone for ApiState<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountResponse {
    pub action: LendingAction,
    pub percentage: u8,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// `ActionError` rendered as `{"error": kind, "message": text}`
#[derive(Debug)]
pub struct ApiError(pub ActionError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ActionError::WalletNotConnected => StatusCode::UNAUTHORIZED,
            ActionError::InvalidAmount | ActionError::NoBalance => StatusCode::BAD_REQUEST,
            ActionError::InsufficientBalance | ActionError::InsufficientCollateral => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ActionError::UserRejected => StatusCode::CONFLICT,
            ActionError::ContractCallFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(error: ActionError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

pub fn router<C>(state: ApiState<C>) -> Router
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/position", get(get_position::<C>))
        .route("/position/refresh", post(refresh_position::<C>))
        .route("/amount/:action/:percentage", get(get_amount::<C>))
        .route("/actions/:action", post(execute_action::<C>))
        .with_state(state)
}

/// Serves the session until `shutdown` is cancelled
pub async fn serve<C>(
    state: ApiState<C>,
    port: u16,
    shutdown: CancellationToken,
) -> Result<()>
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Starting lending position server on {}", addr);

    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Lending position server failed")?;

    info!("Lending position server stopped");
    Ok(())
}

async fn get_position<C>(State(state): State<ApiState<C>>) -> Json<PositionSnapshot>
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    Json(state.latest_snapshot())
}

async fn refresh_position<C>(State(state): State<ApiState<C>>) -> Json<PositionSnapshot>
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    Json(state.session.lock().await.refresh().await)
}

async fn get_amount<C>(
    State(state): State<ApiState<C>>,
    Path((action, percentage)): Path<(LendingAction, u8)>,
) -> Result<Json<AmountResponse>, ApiError>
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    let amount = state
        .latest_snapshot()
        .position
        .resolve_percentage_amount(action, Percentage::try_from(percentage)?)?;

    Ok(Json(AmountResponse {
        action,
        percentage,
        amount,
    }))
}

async fn execute_action<C>(
    State(state): State<ApiState<C>>,
    Path(action): Path<LendingAction>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionReceipt>, ApiError>
where
    C: LendingPoolReader + LendingPoolWriter + Wallet + 'static,
{
    let receipt = state
        .session
        .lock()
        .await
        .execute_action(action, &request.amount)
        .await?;

    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lending_session::{SessionSettings, SessionState},
        testing::{account_data, settings, units, FakeLendingPool},
    };
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn open_state(pool: FakeLendingPool) -> ApiState<FakeLendingPool> {
        let mut session =
            LendingSession::new(Arc::new(pool), settings(), SessionSettings::default());
        session.open().await;
        ApiState::new(session)
    }

    fn funded_pool() -> FakeLendingPool {
        FakeLendingPool::with(|state| {
            state.native_balance = Ok(units(dec!(2)));
            state.receipt_balance = Ok(units(dec!(40)));
            state.account_data = Ok(account_data(dec!(40), dec!(10), dec!(20), dec!(2.5)));
        })
    }

    #[test]
    fn test_error_status_codes() {
        let status = |error| ApiError(error).into_response().status();

        assert_eq!(status(ActionError::WalletNotConnected), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ActionError::NoBalance), StatusCode::BAD_REQUEST);
        assert_eq!(status(ActionError::InvalidAmount), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ActionError::InsufficientCollateral),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(ActionError::UserRejected), StatusCode::CONFLICT);
        assert_eq!(
            status(ActionError::ContractCallFailed("reverted".to_string())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_get_position_returns_snapshot() {
        let state = open_state(funded_pool()).await;

        let Json(snapshot) = get_position(State(state)).await;

        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(snapshot.position.borrowed_balance, dec!(10));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["supplied_balance"], "40");
        assert_eq!(json["state"], "ready");
    }

    #[tokio::test]
    async fn test_get_amount() {
        let state = open_state(funded_pool()).await;

        let Json(response) =
            get_amount(State(state.clone()), Path((LendingAction::Borrow, 75)))
                .await
                .unwrap();
        assert_eq!(response.amount, dec!(15));

        let error = get_amount(State(state), Path((LendingAction::Repay, 30)))
            .await
            .unwrap_err();
        assert_eq!(error.0, ActionError::InvalidAmount);
    }

    #[tokio::test]
    async fn test_get_amount_without_balance() {
        let state = open_state(FakeLendingPool::default()).await;

        let error = get_amount(State(state), Path((LendingAction::Withdraw, 100)))
            .await
            .unwrap_err();

        assert_eq!(error.0, ActionError::NoBalance);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_action() {
        let state = open_state(funded_pool()).await;

        let Json(receipt) = execute_action(
            State(state.clone()),
            Path(LendingAction::Repay),
            Json(ActionRequest {
                amount: "1.5".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(receipt.snapshot.state, SessionState::Ready);

        let error = execute_action(
            State(state),
            Path(LendingAction::Withdraw),
            Json(ActionRequest {
                amount: "41".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(error.0, ActionError::InsufficientBalance);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_answer_while_action_refreshes() {
        let state = open_state(funded_pool()).await;

        let action = tokio::spawn(execute_action(
            State(state.clone()),
            Path(LendingAction::Borrow),
            Json(ActionRequest {
                amount: "5".to_string(),
            }),
        ));
        // the action is now waiting on its first refresh pass
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.session.try_lock().is_err());

        let Json(snapshot) = tokio::time::timeout(
            Duration::from_millis(1),
            get_position(State(state.clone())),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.state, SessionState::Confirmed);

        let Json(response) = tokio::time::timeout(
            Duration::from_millis(1),
            get_amount(State(state.clone()), Path((LendingAction::Repay, 100))),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(response.amount, dec!(10));

        let Json(receipt) = action.await.unwrap().unwrap();
        assert_eq!(receipt.snapshot.state, SessionState::Ready);
        assert_eq!(state.latest_snapshot().state, SessionState::Ready);
    }
}
