mod common;

use axum::http::StatusCode;
use common::{approx, setup_test_app, setup_with_source};
use copydesk::datasource::RemoteProfile;
use copydesk::{MockProfileSource, ProfileSource, ProfileSourceError, WalletPolicy};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_health_and_ready() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profileDirectory"], false);
}

#[tokio::test]
async fn test_user_lifecycle() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let older = app.create_user("older").await;
    let newer = app.create_user("newer").await;

    let (_, users) = app.get("/v1/users").await;
    assert_eq!(users[0]["uniqueId"], newer.as_str());
    assert_eq!(users[1]["uniqueId"], older.as_str());

    let (status, _) = app
        .post("/v1/users", json!({"username": "dup", "email": "older@example.com"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/v1/users", json!({"username": "", "email": "x@example.com"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/v1/users/{}", older),
            Some(json!({"username": "renamed", "email": "renamed@example.com", "status": "Inactive"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["username"], "renamed");
    assert_eq!(updated["status"], "Inactive");

    let (status, _) = app.send("DELETE", &format!("/v1/users/{}", older), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/v1/users/{}", older)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, count) = app.get("/v1/users/count").await;
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_refresh_from_profile_directory() {
    let row: RemoteProfile = serde_json::from_value(json!({
        "id": "p1", "unique_id": "R1000", "username": "remote",
        "email": "remote@example.com", "phone_code": "+33", "phone": "600"
    }))
    .unwrap();
    let source: Arc<dyn ProfileSource> = Arc::new(MockProfileSource::new().with_profile(row));
    let app = setup_with_source(WalletPolicy::Signed, Some(source)).await;

    let (status, report) = app.send("POST", "/v1/users/refresh", None).await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["created"], 1);

    let (status, user) = app.get("/v1/users/R1000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["phoneCode"], "+33");
}

#[tokio::test]
async fn test_refresh_failures_are_bad_gateway() {
    let failing: Arc<dyn ProfileSource> =
        Arc::new(MockProfileSource::new().failing(ProfileSourceError::RateLimited));
    let app = setup_with_source(WalletPolicy::Signed, Some(failing)).await;
    let (status, body) = app.send("POST", "/v1/users/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());

    let unconfigured = setup_test_app(WalletPolicy::Signed).await;
    let (status, _) = unconfigured.send("POST", "/v1/users/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_account_requests_follow_plan_capacity() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let user = app.create_user("lena").await;
    let request = |no: &str| json!({"userId": user, "accountNo": no, "password": "pw"});

    let (status, _) = app.post("/v1/accounts/request", request("1001")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.assign_plan(&user, "Silver").await;
    for no in ["1001", "1002"] {
        let (status, account) = app.post("/v1/accounts/request", request(no)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(account["status"], "Pending");
        assert_eq!(account["server"], "MT4-Live");
    }
    let (status, _) = app.post("/v1/accounts/request", request("1003")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, account) = app
        .post(
            "/v1/accounts",
            json!({"userId": user, "accountNo": "2001", "password": "pw", "status": "Approved"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["status"], "Approved");

    let (_, pending) = app.get("/v1/accounts?status=Pending").await;
    assert_eq!(pending.as_array().unwrap().len(), 2);
    let (status, _) = app.get("/v1/accounts?status=Lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, mine) = app.get(&format!("/v1/users/{}/accounts", user)).await;
    assert_eq!(mine.as_array().unwrap().len(), 3);

    let (_, dashboard) = app.get(&format!("/v1/dashboard/customer/{}", user)).await;
    assert_eq!(dashboard["approvedAccounts"], 1);
}

#[tokio::test]
async fn test_wallet_management() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let user = app.create_user("mo").await;

    let (status, wallet) = app
        .post("/v1/wallets", json!({"userId": user, "balance": 10}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    approx(&wallet["balance"], 10.0);

    let (status, _) = app
        .post("/v1/wallets", json!({"userId": user, "balance": 5}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, total) = app.get("/v1/wallets/total").await;
    approx(&total["total"], 10.0);

    let (status, archived) = app
        .send("POST", &format!("/v1/wallets/{}/archive", user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(archived["archivedAt"].is_number());

    let (_, active) = app.get("/v1/wallets").await;
    assert!(active.as_array().unwrap().is_empty());
    let (_, old) = app.get("/v1/wallets?archived=true").await;
    assert_eq!(old.as_array().unwrap().len(), 1);

    let (status, _) = app.get(&format!("/v1/wallets/{}", user)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post("/v1/wallets", json!({"userId": user}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_transactions_and_admin_dashboard() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let nina = app.create_user("nina").await;
    let omar = app.create_user("omar").await;
    app.assign_plan(&nina, "Silver").await;
    app.assign_plan(&omar, "Gold").await;

    app.post(
        "/v1/pnl",
        json!({"userIds": [nina, omar], "date": "2025-03-01", "symbol": "EURUSD", "totalPnL": 100}),
    )
    .await;
    app.post(
        "/v1/pnl",
        json!({"userIds": [omar], "date": "2025-03-03", "symbol": "XAUUSD", "totalPnL": 20}),
    )
    .await;

    let (_, all) = app.get("/v1/transactions").await;
    let txs = all["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 3);
    assert_eq!(txs[0]["symbol"], "XAUUSD");
    assert_eq!(txs[0]["username"], "omar");
    // 60 + 50 + 10
    approx(&all["summary"]["realized"], 120.0);
    approx(&all["summary"]["unrealized"], 120.0);

    let (_, filtered) = app.get("/v1/transactions?search=xau").await;
    assert_eq!(filtered["transactions"].as_array().unwrap().len(), 1);
    let (_, filtered) = app.get("/v1/transactions?search=NINA").await;
    assert_eq!(filtered["transactions"].as_array().unwrap().len(), 1);

    let (status, dashboard) = app
        .get("/v1/dashboard/admin?from=2025-03-01&to=2025-03-03")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["totalUsers"], 2);
    assert_eq!(dashboard["activeWallets"], 2);
    approx(&dashboard["netPlatformShare"], 120.0);
    let daily = dashboard["dailyPnl"].as_array().unwrap();
    assert_eq!(daily.len(), 3);
    approx(&daily[0]["pnl"], 200.0);
    approx(&daily[1]["pnl"], 0.0);
    approx(&daily[2]["pnl"], 20.0);

    let (_, customer) = app
        .get(&format!(
            "/v1/dashboard/customer/{}?from=2025-03-01&to=2025-03-03",
            omar
        ))
        .await;
    // Gold customer share is 50%
    approx(&customer["earnings"], 60.0);
    approx(&customer["walletBalance"], 60.0);
    approx(&customer["dailyPnl"][2]["pnl"], 20.0);

    let (status, _) = app
        .get("/v1/dashboard/admin?from=2025-03-04&to=2025-03-03")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get("/v1/dashboard/admin?from=0001-01-01&to=9999-12-31")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    let (status, _) = app
        .get(&format!(
            "/v1/dashboard/customer/{}?from=2000-01-01&to=2025-03-03",
            omar
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_catalog_and_reassignment() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let (_, catalog) = app.get("/v1/plans").await;
    assert_eq!(catalog.as_array().unwrap().len(), 3);
    assert_eq!(catalog[0]["name"], "Silver");

    let user = app.create_user("pia").await;
    app.assign_plan(&user, "Silver").await;
    let second = app.assign_plan(&user, "Gold").await;
    assert_eq!(second["firstAssignment"], false);
    assert_eq!(second["walletCreated"], false);

    let (_, plan) = app.get(&format!("/v1/user-plans/{}", user)).await;
    assert_eq!(plan["plan"], "Gold");

    let (status, _) = app
        .post("/v1/user-plans", json!({"userId": "GHOST", "plan": "Gold"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("DELETE", &format!("/v1/user-plans/{}", user), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/v1/user-plans/{}", user)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_team_permissions() {
    let app = setup_test_app(WalletPolicy::Signed).await;
    let (status, member) = app
        .post(
            "/v1/team",
            json!({"name": "Quinn", "email": "quinn@example.com", "role": "support"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = member["id"].as_str().unwrap().to_string();
    assert_eq!(member["permissions"]["chat"]["delete"], true);

    let can = |module: &str, action: &str| {
        format!("/v1/team/{}/can?module={}&action={}", id, module, action)
    };
    let (_, allowed) = app.get(&can("pnl", "edit")).await;
    assert_eq!(allowed["allowed"], false);

    let (status, perms) = app
        .send(
            "PATCH",
            &format!("/v1/team/{}/permissions", id),
            Some(json!({"module": "pnl", "action": "edit", "value": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(perms["pnl"]["edit"], true);
    let (_, allowed) = app.get(&can("pnl", "edit")).await;
    assert_eq!(allowed["allowed"], true);

    let (_, allowed) = app
        .get("/v1/team/D000/can?module=pnl&action=view")
        .await;
    assert_eq!(allowed["allowed"], false);
    let (status, _) = app.get("/v1/team/D000/permissions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/v1/team/{}", id),
            Some(json!({"name": "Quinn R", "email": "quinn@example.com", "role": "manager"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "manager");
    assert_eq!(updated["permissions"]["pnl"]["edit"], true);

    let (status, _) = app.send("DELETE", &format!("/v1/team/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, members) = app.get("/v1/team").await;
    assert!(members.as_array().unwrap().is_empty());
}
