use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{configure, AppState, TENANT_HEADER};
use crate::config::AuthConfig;
use crate::domain::catalog::{MenuItemCreate, RestaurantCreate, SectionCreate};
use crate::domain::identity::{Role, UserCreate};
use crate::domain::pricing::Money;
use crate::domain::tenant::{TenantCreate, TenantId};
use crate::metrics::Metrics;
use crate::storage::{DocumentStore, Storage};

const ADMIN_EMAIL: &str = "root@platform.test";
const ADMIN_PASSWORD: &str = "platform-secret";
const PASSWORD: &str = "correct-horse";

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(App::new().app_data(web::Data::new($state.clone())).configure(configure)).await
    };
}

/// Send a request and return the status plus the decoded JSON body (null when empty)
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let bytes = test::read_body(resp).await;
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

async fn state() -> AppState {
    state_with(Storage::in_memory()).await
}

async fn state_with(storage: Storage) -> AppState {
    let auth = AuthConfig {
        jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
        issuer: "food-delivery".to_string(),
        token_ttl_minutes: 60,
        password_iterations: 1,
    };
    let state = AppState::new(storage, &auth, Arc::new(Metrics::new().unwrap()));
    state
        .identity
        .ensure_platform_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    state
}

struct Shop {
    tenant: TenantId,
    admin_token: String,
    customer_token: String,
    customer_id: Uuid,
    restaurant_id: Uuid,
    item_id: Uuid,
}

async fn token(state: &AppState, slug: &str, email: &str) -> String {
    state
        .identity
        .login(Some(slug), email, PASSWORD)
        .await
        .unwrap()
        .1
        .access_token
}

/// A tenant with an admin, a customer and one restaurant selling a 10.00 item.
/// Orders under 15.00 (after discounts) are refused; delivery costs 2.99.
async fn shop(state: &AppState, slug: &str) -> Shop {
    let tenant = state
        .tenants
        .create(TenantCreate {
            name: format!("Shop {slug}"),
            slug: slug.to_string(),
            contact_email: None,
        })
        .await
        .unwrap()
        .id;

    let admin_email = format!("admin@{slug}.test");
    let customer_email = format!("customer@{slug}.test");
    for (email, role) in [(&admin_email, Role::TenantAdmin), (&customer_email, Role::Customer)] {
        state
            .identity
            .create_user(
                tenant,
                UserCreate {
                    email: email.clone(),
                    display_name: "Test User".to_string(),
                    password: PASSWORD.to_string(),
                    role,
                },
            )
            .await
            .unwrap();
    }

    let restaurant = state
        .catalog
        .create_restaurant(
            tenant,
            RestaurantCreate {
                name: "Pizzeria".to_string(),
                description: None,
                address: "1 Main St".to_string(),
                phone: None,
                delivery_fee: Money::from_cents(299),
                minimum_order: Money::from_cents(1500),
            },
        )
        .await
        .unwrap();
    let section = state
        .catalog
        .create_section(
            tenant,
            restaurant.id,
            SectionCreate {
                name: "Pizza".to_string(),
                description: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let item = state
        .catalog
        .create_item(
            tenant,
            restaurant.id,
            MenuItemCreate {
                section_id: section.id,
                category_id: None,
                name: "Margherita".to_string(),
                description: None,
                price: Money::from_cents(1000),
                is_available: None,
            },
        )
        .await
        .unwrap();

    let (customer, _) = state
        .identity
        .login(Some(slug), &customer_email, PASSWORD)
        .await
        .unwrap();

    Shop {
        tenant,
        admin_token: token(state, slug, &admin_email).await,
        customer_token: token(state, slug, &customer_email).await,
        customer_id: customer.id,
        restaurant_id: restaurant.id,
        item_id: item.id,
    }
}

fn order_body(shop: &Shop, quantity: u32) -> Value {
    json!({
        "restaurant_id": shop.restaurant_id,
        "lines": [{ "menu_item_id": shop.item_id, "quantity": quantity }],
        "delivery_address": {
            "street": "742 Evergreen Terrace",
            "city": "Springfield",
            "postal_code": "49007"
        }
    })
}

#[actix_web::test]
async fn test_login_and_me() {
    let state = state().await;
    let app = test_app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "platform_admin");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::get().uri("/api/auth/me").insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[actix_web::test]
async fn test_requests_without_token_are_rejected() {
    let state = state().await;
    let app = test_app!(state);

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/restaurants"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/restaurants")
            .insert_header(bearer("not-a-token"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_platform_admin_onboards_tenant() {
    let state = state().await;
    let app = test_app!(state);
    let (_, issued) = state.identity.login(None, ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    let root = issued.access_token;

    let (status, tenant) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/tenants")
            .insert_header(bearer(&root))
            .set_json(json!({ "name": "Acme Foods", "slug": "acme" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tenant["slug"], "acme");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/tenants")
            .insert_header(bearer(&root))
            .set_json(json!({ "name": "Other Acme", "slug": "acme" }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let new_admin = json!({
        "email": "owner@acme.test",
        "display_name": "Owner",
        "password": PASSWORD,
        "role": "tenant_admin"
    });

    // Tenant-scoped routes need the X-Tenant header for platform admins
    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&root))
            .set_json(new_admin.clone())
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, user) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&root))
            .insert_header((TENANT_HEADER, "acme"))
            .set_json(new_admin)
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "tenant_admin");

    // The new tenant admin can log in but cannot manage tenants
    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "tenant": "acme",
            "email": "owner@acme.test",
            "password": PASSWORD
        }))
    );
    assert_eq!(status, StatusCode::OK);
    let owner = body["access_token"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        test::TestRequest::get().uri("/api/tenants").insert_header(bearer(&owner))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send!(
        app,
        test::TestRequest::get().uri("/api/users").insert_header(bearer(&owner))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_customer_cannot_manage_menu() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/restaurants")
            .insert_header(bearer(&shop.customer_token))
            .set_json(json!({ "name": "Shadow Kitchen", "address": "Nowhere" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, restaurants) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/restaurants")
            .insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restaurants.as_array().unwrap().len(), 1);

    let (status, items) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/restaurants/{}/items", shop.restaurant_id))
            .insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items[0]["name"], "Margherita");
}

#[actix_web::test]
async fn test_discount_shows_in_quote() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (status, discount) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/restaurants/{}/discounts", shop.restaurant_id))
            .insert_header(bearer(&shop.admin_token))
            .set_json(json!({
                "name": "Ten percent off",
                "scope": { "type": "restaurant" },
                "kind": { "type": "percentage", "basis_points": 1000 }
            }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, quote) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders/quote")
            .insert_header(bearer(&shop.customer_token))
            .set_json(json!({
                "restaurant_id": shop.restaurant_id,
                "lines": [{ "menu_item_id": shop.item_id, "quantity": 2 }]
            }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["subtotal"], 2000);
    assert_eq!(quote["discount_total"], 200);
    assert_eq!(quote["delivery_fee"], 299);
    assert_eq!(quote["total"], 2099);
    assert_eq!(quote["lines"][0]["discount"]["discount_id"], discount["id"]);
}

#[actix_web::test]
async fn test_order_below_minimum_is_unprocessable() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 1))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unprocessable");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 0))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_order_lifecycle() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (status, order) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 2))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 2299);
    assert_eq!(order["customer_id"], json!(shop.customer_id));
    let id = order["id"].as_str().unwrap().to_string();

    let step = |action: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/{action}"))
            .insert_header(bearer(&shop.admin_token))
    };

    let (status, order) = send!(app, step("confirm").set_json(json!({ "estimated_ready_minutes": 20 })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "confirmed");

    // Once confirmed, the customer can no longer cancel
    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/cancel"))
            .insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(app, step("confirm"));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send!(app, step("deliver"));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send!(app, step("ready"));
    assert_eq!(status, StatusCode::OK);
    let (status, order) = send!(app, step("dispatch").set_json(json!({ "courier": "Sam" })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["courier"], "Sam");
    let (status, order) = send!(app, step("deliver"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "delivered");

    let (status, _) = send!(app, step("cancel"));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, events) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/orders/{id}/events"))
            .insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_data"]["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["Placed", "Confirmed", "ReadyForPickup", "OutForDelivery", "Delivered"]);

    let (status, listed) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/orders?status=delivered")
            .insert_header(bearer(&shop.admin_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

}

#[actix_web::test]
async fn test_customer_cancels_pending_order() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (_, order) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 2))
    );
    let id = order["id"].as_str().unwrap();

    let (status, order) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/cancel"))
            .insert_header(bearer(&shop.customer_token))
            .set_json(json!({ "reason": "Changed my mind" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "canceled");
    assert_eq!(order["cancel_reason"], "Changed my mind");
    assert_eq!(order["canceled_by"], json!(shop.customer_id));
}

#[actix_web::test]
async fn test_revoked_accounts_lose_access_immediately() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);
    let user_uri = format!("/api/users/{}", shop.customer_id);
    let place = || {
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 2))
    };

    // A role change applies to tokens issued before it
    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&user_uri)
            .insert_header(bearer(&shop.admin_token))
            .set_json(json!({ "role": "staff" }))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send!(app, place());
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&user_uri)
            .insert_header(bearer(&shop.admin_token))
            .set_json(json!({ "role": "customer", "is_active": false }))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send!(app, place());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&user_uri)
            .insert_header(bearer(&shop.admin_token))
    );
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send!(app, place());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send!(
        app,
        test::TestRequest::get().uri("/api/auth/me").insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let orders = state.orders.list(shop.tenant, &Default::default()).await.unwrap();
    assert!(orders.is_empty());
}

#[actix_web::test]
async fn test_customer_cancel_is_judged_on_the_event_stream() {
    let storage = Storage::in_memory();
    let state = state_with(storage.clone()).await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);

    let (_, placed) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&shop.customer_token))
            .set_json(order_body(&shop, 2))
    );
    let id: Uuid = serde_json::from_value(placed["id"].clone()).unwrap();
    let pending = state.orders.get(shop.tenant, id).await.unwrap();

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/confirm"))
            .insert_header(bearer(&shop.admin_token))
    );
    assert_eq!(status, StatusCode::OK);

    // The read model lags behind and still shows the order as pending
    storage.orders.update(&pending).await.unwrap();

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/cancel"))
            .insert_header(bearer(&shop.customer_token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let history = state.orders.history(shop.tenant, id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].event_type, "OrderConfirmed");
}

#[actix_web::test]
async fn test_orders_are_isolated() {
    let state = state().await;
    let acme = shop(&state, "acme").await;
    let globex = shop(&state, "globex").await;

    state
        .identity
        .create_user(
            acme.tenant,
            UserCreate {
                email: "other@acme.test".to_string(),
                display_name: "Other Customer".to_string(),
                password: PASSWORD.to_string(),
                role: Role::Customer,
            },
        )
        .await
        .unwrap();
    let other_customer = token(&state, "acme", "other@acme.test").await;
    let app = test_app!(state);

    let (_, order) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&acme.customer_token))
            .set_json(order_body(&acme, 2))
    );
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let (status, _) = send!(app, test::TestRequest::get().uri(&uri).insert_header(bearer(&other_customer)));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send!(
        app,
        test::TestRequest::get().uri("/api/orders").insert_header(bearer(&other_customer))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    // Another tenant's admin sees nothing either
    let (status, _) = send!(app, test::TestRequest::get().uri(&uri).insert_header(bearer(&globex.admin_token)));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/restaurants/{}", acme.restaurant_id))
            .insert_header(bearer(&globex.admin_token))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(app, test::TestRequest::get().uri(&uri).insert_header(bearer(&acme.admin_token)));
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_inactive_tenant_is_locked_out() {
    let state = state().await;
    let shop = shop(&state, "acme").await;
    let app = test_app!(state);
    let (_, issued) = state.identity.login(None, ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/tenants/{}", shop.tenant))
            .insert_header(bearer(&issued.access_token))
            .set_json(json!({ "is_active": false }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/restaurants")
            .insert_header(bearer(&shop.admin_token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}
