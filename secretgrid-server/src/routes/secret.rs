use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{error::ServerError, state::AppState};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<api::LoginRequest>,
) -> Result<Json<api::LoginResponse>, ServerError> {
    state.login(&credentials).await?;
    log::info!("Credentials set for region {}", credentials.region);
    Ok(Json(api::LoginResponse {
        message: "Credentials set successfully".to_owned(),
    }))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<api::RowFilter>,
) -> Result<Json<Vec<api::SecretRow>>, ServerError> {
    let sync = state.sync().await?;
    Ok(Json(sync.list_secrets(&filter).await?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<api::UpdateRequest>>,
) -> Result<Json<Vec<api::UpdateOutcome>>, ServerError> {
    let sync = state.sync().await?;
    Ok(Json(sync.update_secrets(&batch).await))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use api::{LoginResponse, SecretRow, UpdateOutcome};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{test_server, vault::memory::MemoryVault};

    fn credentials(access_key_id: &str) -> Value {
        json!({
            "accessKeyId": access_key_id,
            "secretAccessKey": "wJalrXUtnFEMI",
            "region": "eu-central-1"
        })
    }

    async fn logged_in(vault: &Arc<MemoryVault>) -> TestServer {
        let server = test_server(Arc::clone(vault)).await;
        server
            .post("/secrets")
            .json(&credentials("AKIDEXAMPLE"))
            .await
            .assert_status_ok();
        server
    }

    #[tokio::test]
    async fn login_confirms_credentials() {
        let server = test_server(Arc::new(MemoryVault::default())).await;

        let response = server
            .post("/secrets")
            .json(&credentials("AKIDEXAMPLE"))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<LoginResponse>(),
            LoginResponse {
                message: "Credentials set successfully".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn invalid_credentials_are_unauthorized() {
        let server = test_server(Arc::new(MemoryVault::default())).await;

        let response = server.post("/secrets").json(&credentials("WRONG")).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body = response.json::<UpdateOutcome>();
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("Invalid vault credentials"));
    }

    #[tokio::test]
    async fn requests_before_login_are_rejected() {
        let server = test_server(Arc::new(MemoryVault::default())).await;

        server
            .get("/secrets")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/updateSecret")
            .json(&json!([]))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn list_rows() {
        let vault = Arc::new(MemoryVault::with_secrets([
            ("prod/db", r#"{"user": "admin", "conn": {"host": "db.internal"}}"#),
            ("prod/api", r#"{"token": "abc"}"#),
        ]));
        let server = logged_in(&vault).await;

        let all = server.get("/secrets").await;
        all.assert_status_ok();
        assert_eq!(all.json::<Vec<SecretRow>>().len(), 3);

        let filtered = server
            .get("/secrets")
            .add_query_param("name", "prod/db")
            .add_query_param("path", "conn.%")
            .await;
        filtered.assert_status_ok();
        assert_eq!(
            filtered.json::<Vec<SecretRow>>(),
            vec![SecretRow {
                name: "prod/db".to_owned(),
                path: "conn.host".to_owned(),
                value: json!("db.internal"),
            }]
        );
    }

    #[tokio::test]
    async fn list_reports_unavailable_vault() {
        let vault = Arc::new(MemoryVault::with_secrets([("a", "{}")]));
        let server = logged_in(&vault).await;
        vault.set_unavailable(true);

        server
            .get("/secrets")
            .await
            .assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn update_batch_reports_each_item() {
        let vault = Arc::new(MemoryVault::with_secrets([
            ("a", r#"{"db": {"pass": "old"}}"#),
            ("b", r#"{}"#),
        ]));
        let server = logged_in(&vault).await;

        let response = server
            .post("/updateSecret")
            .json(&json!([
                {"secretName": "a", "jmsPaths": ["db.pass"], "newValues": ["new"]},
                {"secretName": "b", "jmsPaths": ["x.y"], "newValues": ["new"]},
                {"secretName": "a", "jmsPaths": ["db.user"], "newValues": ["root"]}
            ]))
            .await;

        response.assert_status_ok();
        let outcomes = response.json::<Vec<UpdateOutcome>>();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], UpdateOutcome::success());
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[2], UpdateOutcome::success());
        assert_eq!(
            serde_json::from_str::<Value>(&vault.value("a").unwrap()).unwrap(),
            json!({"db": {"pass": "new", "user": "root"}})
        );
    }

    #[tokio::test]
    async fn relogin_clears_cached_rows() {
        let vault = Arc::new(MemoryVault::with_secrets([("a", r#"{"x": 1}"#)]));
        let server = logged_in(&vault).await;
        server.get("/secrets").await.assert_status_ok();
        assert_eq!(vault.fetches(), 1);

        server
            .post("/secrets")
            .json(&credentials("AKIDEXAMPLE"))
            .await
            .assert_status_ok();
        server.get("/secrets").await.assert_status_ok();
        assert_eq!(vault.fetches(), 2);
    }
}
