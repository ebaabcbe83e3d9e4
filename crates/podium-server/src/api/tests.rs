use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use tower::ServiceExt;

use podium_shared::token::{issue_token, TokenClaims};
use podium_shared::{PostId, PostType, Role, UserId};
use podium_store::{Database, NewPost, NewUser};

use super::{build_router, AppState};
use crate::auth::SignedTokenVerifier;
use crate::config::ServerConfig;

struct TestApp {
    router: Router,
    state: AppState,
    issuer: SigningKey,
    next_user: std::cell::Cell<u32>,
}

impl TestApp {
    fn new() -> Self {
        let issuer = SigningKey::generate(&mut OsRng);
        let verifier = SignedTokenVerifier::new(issuer.verifying_key().to_bytes());
        let state = AppState::new(
            Database::open_in_memory().unwrap(),
            Arc::new(verifier),
            ServerConfig::default(),
        );
        Self {
            router: build_router(state.clone()),
            state,
            issuer,
            next_user: std::cell::Cell::new(0),
        }
    }

    fn user(&self, role: Role) -> UserId {
        let n = self.next_user.get() + 1;
        self.next_user.set(n);
        let db = self.state.db.lock().unwrap();
        db.create_user(&NewUser {
            name: format!("User {n}"),
            email: format!("user{n}@example.com"),
            password_hash: "hash".to_string(),
            role,
        })
        .unwrap()
        .id
    }

    fn post(&self, author: UserId, post_type: PostType) -> PostId {
        let mut db = self.state.db.lock().unwrap();
        db.create_post(&NewPost {
            author_id: author,
            title: "Original title".to_string(),
            description: "Original description".to_string(),
            post_type,
            media: vec!["uploads/a.jpg".to_string(), "uploads/b.mp4".to_string()],
        })
        .unwrap()
        .id
    }

    fn token(&self, user_id: UserId, role: Role) -> String {
        issue_token(
            &TokenClaims {
                user_id,
                role,
                expires_at: Utc::now() + Duration::hours(1),
            },
            &self.issuer,
        )
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn rate(&self, token: &str, post: PostId, rating: Value) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/posts/vote",
            Some(token),
            Some(json!({ "postId": post.to_string(), "rating": rating })),
        )
        .await
    }

    fn post_title(&self, post: PostId) -> String {
        self.state.db.lock().unwrap().get_post(post).unwrap().title
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn preflight_gets_empty_ok() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/posts/vote")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ─── Listing ───

#[tokio::test]
async fn anonymous_listing_has_no_personal_rating() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Video);
    for value in [3.0, 4.0, 5.0] {
        let rater = app.user(Role::Viewer);
        let (status, _) = app.rate(&app.token(rater, Role::Viewer), post, json!(value)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.send(Method::GET, "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &body[0];
    assert_eq!(listed["id"], post.to_string());
    assert_eq!(listed["hasVoted"], false);
    assert_eq!(listed["userRating"], 0.0);
    assert_eq!(listed["avgRating"], 4.0);
    assert_eq!(listed["voteCount"], 3);
    assert_eq!(listed["thumbnail"], "uploads/a.jpg");
    assert_eq!(listed["media"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn listing_shows_viewer_rating() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Blog);
    let rater = app.user(Role::Viewer);
    let token = app.token(rater, Role::Viewer);
    app.rate(&token, post, json!(4.5)).await;

    let (_, body) = app.send(Method::GET, "/api/posts", Some(&token), None).await;
    assert_eq!(body[0]["userRating"], 4.5);
    assert_eq!(body[0]["hasVoted"], true);
}

#[tokio::test]
async fn listing_filters_and_limits() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    app.post(author, PostType::Video);
    app.post(author, PostType::Audio);
    app.post(author, PostType::Audio);

    let (_, body) = app
        .send(Method::GET, "/api/posts?type=audio", None, None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.send(Method::GET, "/api/posts?limit=1", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app
        .send(Method::GET, "/api/posts?status=approved", None, None)
        .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_rejects_bad_parameters() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/posts?limit=lots", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send(Method::GET, "/api/posts?type=podcast", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Ratings ───

#[tokio::test]
async fn rating_requires_identity() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Video);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/vote",
            None,
            Some(json!({ "postId": post.0, "rating": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/vote",
            Some("garbage.token"),
            Some(json!({ "postId": post.0, "rating": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rating_boundaries() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Video);
    let rater = app.user(Role::Viewer);
    let token = app.token(rater, Role::Viewer);

    for bad in [json!(0), json!(0.4), json!(5.5), json!(1.25), json!(-1), Value::Null] {
        let (status, _) = app.rate(&token, post, bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {bad} accepted");
    }
    for good in [0.5, 5.0] {
        let (status, body) = app.rate(&token, post, json!(good)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userRating"], good);
    }
}

#[tokio::test]
async fn rating_rejects_bad_post_ids() {
    let app = TestApp::new();
    let rater = app.user(Role::Viewer);
    let token = app.token(rater, Role::Viewer);

    let (status, _) = app.rate(&token, PostId(0), json!(3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.rate(&token, PostId(77), json!(3)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn fourth_vote_moves_the_average() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Audio);
    for value in [3.0, 4.0, 5.0] {
        let rater = app.user(Role::Viewer);
        app.rate(&app.token(rater, Role::Viewer), post, json!(value)).await;
    }

    let late = app.user(Role::Viewer);
    let (status, body) = app.rate(&app.token(late, Role::Viewer), post, json!(2.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avgRating"], 3.5);
    assert_eq!(body["voteCount"], 4);
    assert_eq!(body["userRating"], 2.0);
}

#[tokio::test]
async fn revote_replaces_previous_rating() {
    let app = TestApp::new();
    let author = app.user(Role::Creator);
    let post = app.post(author, PostType::Audio);
    let rater = app.user(Role::Viewer);
    let token = app.token(rater, Role::Viewer);

    app.rate(&token, post, json!(1.0)).await;
    let (_, body) = app.rate(&token, post, json!(5.0)).await;
    assert_eq!(body["voteCount"], 1);
    assert_eq!(body["avgRating"], 5.0);
}

// ─── Post mutation ───

#[tokio::test]
async fn non_owner_cannot_update_post() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let intruder = app.user(Role::Creator);
    let post = app.post(owner, PostType::Blog);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&app.token(intruder, Role::Creator)),
            Some(json!({ "id": post.to_string(), "title": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(app.post_title(post), "Original title");
}

#[tokio::test]
async fn owner_and_admin_can_update_post() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let admin = app.user(Role::Admin);
    let post = app.post(owner, PostType::Blog);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&app.token(owner, Role::Creator)),
            Some(json!({ "id": post.0, "title": "  Renamed  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Renamed");
    assert_eq!(body["post"]["description"], "Original description");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&app.token(admin, Role::Admin)),
            Some(json!({ "id": post.0, "description": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["description"], "");
    assert_eq!(body["post"]["title"], "Renamed");
}

#[tokio::test]
async fn update_without_fields_is_rejected() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let post = app.post(owner, PostType::Blog);
    let token = app.token(owner, Role::Creator);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&token),
            Some(json!({ "id": post.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No fields to update");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&token),
            Some(json!({ "id": post.0, "title": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.post_title(post), "Original title");
}

#[tokio::test]
async fn update_of_missing_post_is_not_found() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/update",
            Some(&app.token(owner, Role::Creator)),
            Some(json!({ "id": 404, "title": "Ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_then_moderate_post() {
    let app = TestApp::new();
    let creator = app.user(Role::Creator);
    let admin = app.user(Role::Admin);
    let viewer = app.user(Role::Viewer);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts",
            Some(&app.token(creator, Role::Creator)),
            Some(json!({
                "title": "My clip",
                "description": "",
                "type": "video",
                "media": ["uploads/clip.mp4"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["views"], 0);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/status",
            Some(&app.token(viewer, Role::Viewer)),
            Some(json!({ "id": id, "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts/status",
            Some(&app.token(admin, Role::Admin)),
            Some(json!({ "id": id, "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["status"], "approved");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/status",
            Some(&app.token(admin, Role::Admin)),
            Some(json!({ "id": id, "status": "archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_post_validates_input() {
    let app = TestApp::new();
    let creator = app.user(Role::Creator);
    let token = app.token(creator, Role::Creator);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({ "title": " ", "type": "video" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({ "title": "Song", "type": "podcast" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts",
            None,
            Some(json!({ "title": "Song", "type": "audio" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_post_checks_ownership() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let other = app.user(Role::Viewer);
    let post = app.post(owner, PostType::Video);
    let uri = format!("/api/posts/{post}");

    let (status, _) = app
        .send(Method::DELETE, &uri, Some(&app.token(other, Role::Viewer)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::DELETE, &uri, Some(&app.token(owner, Role::Creator)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = app
        .send(Method::DELETE, &uri, Some(&app.token(owner, Role::Creator)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::DELETE,
            "/api/posts/abc",
            Some(&app.token(owner, Role::Creator)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn view_counter_increments() {
    let app = TestApp::new();
    let owner = app.user(Role::Creator);
    let post = app.post(owner, PostType::Video);

    for expected in 1..=3 {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/posts/view",
                None,
                Some(json!({ "postId": post.to_string() })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["views"], expected);
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts/view",
            None,
            Some(json!({ "post_id": 999 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── User votes ───

#[tokio::test]
async fn self_vote_is_rejected() {
    let app = TestApp::new();
    let user = app.user(Role::Creator);
    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/vote",
            Some(&app.token(user, Role::Creator)),
            Some(json!({ "candidateId": user.to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot vote for yourself");
}

#[tokio::test]
async fn toggling_twice_restores_the_count() {
    let app = TestApp::new();
    let voter = app.user(Role::Viewer);
    let candidate = app.user(Role::Creator);
    let token = app.token(voter, Role::Viewer);
    let body = json!({ "candidate_id": candidate.0 });

    let (status, first) = app
        .send(Method::POST, "/api/users/vote", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["action"], "voted");
    assert_eq!(first["votes"], 1);
    assert_eq!(first["hasVoted"], true);

    let (_, tallies) = app
        .send(Method::GET, "/api/users/votes", Some(&token), None)
        .await;
    assert_eq!(tallies["votesByCandidate"][candidate.to_string()], 1);
    assert_eq!(tallies["myVotes"][candidate.to_string()], true);

    let (_, second) = app
        .send(Method::POST, "/api/users/vote", Some(&token), Some(body))
        .await;
    assert_eq!(second["action"], "unvoted");
    assert_eq!(second["votes"], 0);
    assert_eq!(second["hasVoted"], false);
}

#[tokio::test]
async fn vote_tallies_without_identity() {
    let app = TestApp::new();
    let voter = app.user(Role::Viewer);
    let candidate = app.user(Role::Creator);
    app.send(
        Method::POST,
        "/api/users/vote",
        Some(&app.token(voter, Role::Viewer)),
        Some(json!({ "candidateId": candidate.0 })),
    )
    .await;

    let (status, tallies) = app.send(Method::GET, "/api/users/votes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tallies["votesByCandidate"][candidate.to_string()], 1);
    assert!(tallies["myVotes"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn vote_for_unknown_user_is_not_found() {
    let app = TestApp::new();
    let voter = app.user(Role::Viewer);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/users/vote",
            Some(&app.token(voter, Role::Viewer)),
            Some(json!({ "candidateId": 4040 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Profile ───

#[tokio::test]
async fn profile_score_combines_views_and_ratings() {
    let app = TestApp::new();
    let creator = app.user(Role::Creator);
    let post = app.post(creator, PostType::Video);
    for value in [2.5, 3.0, 3.5] {
        let rater = app.user(Role::Viewer);
        app.rate(&app.token(rater, Role::Viewer), post, json!(value)).await;
    }
    app.state
        .db
        .lock()
        .unwrap()
        .conn()
        .execute("UPDATE posts SET views = 100 WHERE id = ?1", [post.0])
        .unwrap();

    let (status, body) = app
        .send(
            Method::GET,
            "/api/users/profile",
            Some(&app.token(creator, Role::Creator)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], creator.to_string());
    assert!(body["user"].get("passwordHash").is_none());
    assert_eq!(body["stats"]["totalViews"], 100);
    assert_eq!(body["stats"]["totalVotes"], 3);
    assert_eq!(body["stats"]["totalScore"], 118);
    assert_eq!(body["stats"]["avgRating"], 3.0);
    assert_eq!(body["stats"]["videoSubmissions"], 1);
    assert_eq!(body["recentActivity"][0]["votes"], 3);
}

#[tokio::test]
async fn profile_requires_identity() {
    let app = TestApp::new();
    let (status, _) = app
        .send(Method::GET, "/api/users/profile", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_applies_and_validates() {
    let app = TestApp::new();
    let me = app.user(Role::Creator);
    let other = app.user(Role::Creator);
    let token = app.token(me, Role::Creator);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": " Ada ", "studentId": "S-42", "avatar": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["studentId"], "S-42");
    assert!(body["user"]["avatar"].is_null());

    let taken = format!("user{}@example.com", other.0);
    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "email": taken })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    let (status, _) = app
        .send(Method::POST, "/api/users/profile", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_rejects_null_name_and_email() {
    let app = TestApp::new();
    let me = app.user(Role::Viewer);
    let token = app.token(me, Role::Viewer);

    for body in [json!({ "name": null }), json!({ "email": null })] {
        let (status, _) = app
            .send(Method::POST, "/api/users/profile", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "email": "a(b)@x,y.z" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid email is required");
}

#[tokio::test]
async fn profile_update_stores_hashed_password() {
    let app = TestApp::new();
    let me = app.user(Role::Viewer);
    let token = app.token(me, Role::Viewer);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].get("passwordHash").is_none());

    let stored: String = app
        .state
        .db
        .lock()
        .unwrap()
        .conn()
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            [me.0],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored.starts_with("$argon2"));
    assert_ne!(stored, "correct horse");
}
