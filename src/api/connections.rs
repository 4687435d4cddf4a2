use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::auth::AuthenticatedUser;
use crate::services::connection_service::{self, ConnectionRequest, Decision, UpdateConnectionRequest};
use crate::state::AppState;

// ==================== LISTINGS ====================

#[utoipa::path(
    get,
    path = "/connections",
    tag = "Connections",
    responses(
        (status = 200, description = "Caller's pending and accepted edges", body = Vec<crate::models::ConnectionEdge>),
        (status = 401, description = "Not signed in")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_connections(state: web::Data<AppState>, caller: AuthenticatedUser) -> HttpResponse {
    log::info!("🔗 GET /connections - caller: {}", caller.user_id());

    match connection_service::list_connections(state.store(), &caller).await {
        Ok(connections) => HttpResponse::Ok().json(serde_json::json!({ "connections": connections })),
        Err(e) => {
            log::error!("❌ Failed to list connections: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/connections/accepted",
    tag = "Connections",
    responses(
        (status = 200, description = "Accepted peers of the caller", body = Vec<crate::models::AcceptedConnection>),
        (status = 401, description = "Not signed in")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_accepted(state: web::Data<AppState>, caller: AuthenticatedUser) -> HttpResponse {
    log::info!("🔗 GET /connections/accepted - caller: {}", caller.user_id());

    match connection_service::list_accepted(state.store(), &caller).await {
        Ok(connections) => HttpResponse::Ok().json(serde_json::json!({ "connections": connections })),
        Err(e) => {
            log::error!("❌ Failed to list accepted connections: {}", e);
            e.error_response()
        }
    }
}

// ==================== LIFECYCLE ====================

#[utoipa::path(
    post,
    path = "/connections/request",
    tag = "Connections",
    request_body = ConnectionRequest,
    responses(
        (status = 201, description = "Pending request created"),
        (status = 400, description = "Missing target or self-request"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Target user not found"),
        (status = 409, description = "A pending or accepted connection already exists")
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn request_connection(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    request: web::Json<ConnectionRequest>,
) -> HttpResponse {
    log::info!("🤝 POST /connections/request - {} → {}", caller.user_id(), request.to_user_id);

    match connection_service::request_connection(state.store(), &state.hub, &caller, &request.to_user_id).await {
        Ok(connection) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "connection": connection
        })),
        Err(e) => {
            log::warn!("❌ Connection request failed: {}", e);
            e.error_response()
        }
    }
}

/// PATCH /connections/{connection_id} - accept or reject a pending request
pub async fn update_connection(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<UpdateConnectionRequest>,
) -> HttpResponse {
    let connection_id = path.into_inner();
    log::info!(
        "📝 PATCH /connections/{} - status: {}, caller: {}",
        connection_id,
        request.status.as_str(),
        caller.user_id()
    );

    let decision = match Decision::from_status(request.status) {
        Ok(decision) => decision,
        Err(e) => return e.error_response(),
    };

    match connection_service::respond_to_request(state.store(), &state.hub, &caller, &connection_id, decision).await {
        Ok(details) => {
            let from_user_id = details.connection.from_user_id.clone();
            let to_user_id = details.connection.to_user_id.clone();
            HttpResponse::Ok().json(serde_json::json!({
                "connection": details,
                "fromUserId": from_user_id,
                "toUserId": to_user_id
            }))
        }
        Err(e) => {
            log::warn!("❌ Connection {} update failed: {}", connection_id, e);
            e.error_response()
        }
    }
}

/// DELETE /connections/{connection_id}
pub async fn delete_connection(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
) -> HttpResponse {
    let connection_id = path.into_inner();
    log::info!("🗑️  DELETE /connections/{} - caller: {}", connection_id, caller.user_id());

    match connection_service::remove_connection(state.store(), &state.hub, &caller, &connection_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::warn!("❌ Connection {} removal failed: {}", connection_id, e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{self, testing::{body_json, test_state, TestUser}};
    use crate::models::Role;
    use crate::services::FanoutEvent;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_request_accept_flow() {
        let state = test_state();
        let alice = TestUser::create(&state, "Alice", Role::Mentee).await;
        let bob = TestUser::create(&state, "Bob", Role::Mentor).await;
        let mut alice_live = state.hub.join(&alice.id).unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::routes)).await;

        let req = test::TestRequest::post()
            .uri("/connections/request")
            .insert_header(alice.bearer())
            .set_json(serde_json::json!({ "toUserId": bob.id }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["connection"]["status"], "PENDING");
        let connection_id = body["connection"]["id"].as_str().unwrap().to_string();

        // The request lands in the recipient's inbox
        let req = test::TestRequest::get().uri("/notifications").insert_header(bob.bearer()).to_request();
        let inbox = body_json(test::call_service(&app, req).await).await;
        assert_eq!(inbox["notifications"][0]["type"], "CONNECTION_REQUEST");
        assert_eq!(inbox["notifications"][0]["connectionId"], connection_id.as_str());

        let req = test::TestRequest::patch()
            .uri(&format!("/connections/{}", connection_id))
            .insert_header(bob.bearer())
            .set_json(serde_json::json!({ "status": "ACCEPTED" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["connection"]["status"], "ACCEPTED");
        assert_eq!(body["connection"]["fromUser"]["name"], "Alice");
        assert_eq!(body["fromUserId"], alice.id.as_str());
        assert_eq!(body["toUserId"], bob.id.as_str());

        assert_eq!(
            alice_live.try_recv(),
            Some(FanoutEvent::connection_accepted(&bob.id, &connection_id))
        );

        // Accepted listing is symmetric
        for (me, peer) in [(&alice, &bob), (&bob, &alice)] {
            let req = test::TestRequest::get()
                .uri("/connections/accepted")
                .insert_header(me.bearer())
                .to_request();
            let body = body_json(test::call_service(&app, req).await).await;
            let connections = body["connections"].as_array().unwrap();
            assert_eq!(connections.len(), 1);
            assert_eq!(connections[0]["user"]["id"], peer.id.as_str());
        }

        // Second accept loses
        let req = test::TestRequest::patch()
            .uri(&format!("/connections/{}", connection_id))
            .insert_header(bob.bearer())
            .set_json(serde_json::json!({ "status": "ACCEPTED" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        // Alice's acceptance notice is shown once
        let req = test::TestRequest::get().uri("/notifications").insert_header(alice.bearer()).to_request();
        let inbox = body_json(test::call_service(&app, req).await).await;
        assert_eq!(inbox["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(inbox["notifications"][0]["type"], "CONNECTION_ACCEPTED");
        let req = test::TestRequest::get().uri("/notifications").insert_header(alice.bearer()).to_request();
        let inbox = body_json(test::call_service(&app, req).await).await;
        assert!(inbox["notifications"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_guards_on_request_and_update() {
        let state = test_state();
        let alice = TestUser::create(&state, "Alice", Role::Mentee).await;
        let bob = TestUser::create(&state, "Bob", Role::Mentor).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::routes)).await;

        let request = |who: &TestUser, to: &str| {
            test::TestRequest::post()
                .uri("/connections/request")
                .insert_header(who.bearer())
                .set_json(serde_json::json!({ "toUserId": to }))
                .to_request()
        };

        let res = test::call_service(&app, request(&alice, &alice.id)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = test::call_service(&app, request(&alice, "ghost")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = test::call_service(&app, request(&alice, &bob.id)).await;
        let connection_id = body_json(res).await["connection"]["id"].as_str().unwrap().to_string();

        let res = test::call_service(&app, request(&bob, &alice.id)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        // The sender cannot accept their own request
        let req = test::TestRequest::patch()
            .uri(&format!("/connections/{}", connection_id))
            .insert_header(alice.bearer())
            .set_json(serde_json::json!({ "status": "ACCEPTED" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::patch()
            .uri(&format!("/connections/{}", connection_id))
            .insert_header(bob.bearer())
            .set_json(serde_json::json!({ "status": "PENDING" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::patch()
            .uri(&format!("/connections/{}", connection_id))
            .insert_header(bob.bearer())
            .set_json(serde_json::json!({ "status": "MAYBE" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_tampered_token_is_401() {
        let state = test_state();
        let alice = TestUser::create(&state, "Alice", Role::Mentee).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::routes)).await;

        let mut parts: Vec<String> = alice.token.split('.').map(str::to_string).collect();
        let flipped = if parts[2].starts_with('A') { 'B' } else { 'A' };
        let signature = format!("{}{}", flipped, &parts[2][1..]);
        parts[2] = signature;
        let tampered = parts.join(".");

        let req = test::TestRequest::get()
            .uri("/connections")
            .insert_header(("Authorization", format!("Bearer {}", tampered)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["error"], "Unauthorized");
    }

    #[actix_web::test]
    async fn test_only_participants_delete() {
        let state = test_state();
        let alice = TestUser::create(&state, "Alice", Role::Mentee).await;
        let bob = TestUser::create(&state, "Bob", Role::Mentor).await;
        let carol = TestUser::create(&state, "Carol", Role::Mentor).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::routes)).await;

        let req = test::TestRequest::post()
            .uri("/connections/request")
            .insert_header(alice.bearer())
            .set_json(serde_json::json!({ "toUserId": bob.id }))
            .to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        let connection_id = body["connection"]["id"].as_str().unwrap().to_string();

        let delete = |who: &TestUser| {
            test::TestRequest::delete()
                .uri(&format!("/connections/{}", connection_id))
                .insert_header(who.bearer())
                .to_request()
        };

        assert_eq!(test::call_service(&app, delete(&carol)).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/connections").insert_header(bob.bearer()).to_request();
        let body = body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["connections"][0]["userId"], alice.id.as_str());
        assert_eq!(body["connections"][0]["status"], "PENDING");

        assert_eq!(test::call_service(&app, delete(&bob)).await.status(), StatusCode::OK);
        assert_eq!(test::call_service(&app, delete(&alice)).await.status(), StatusCode::NOT_FOUND);
    }
}
