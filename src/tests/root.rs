use axum::http::StatusCode;

use crate::tests::helper;

#[sqlx::test]
async fn test_root_empty(pool: sqlx::SqlitePool) {
    let mut test_app = helper::setup_test_app(pool).await;

    let (status_code, content_type, body) = helper::root(&mut test_app.app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(Some(mime::TEXT_HTML_UTF_8.to_string()), content_type);
    assert!(body.contains("No aliases yet."));
}

#[sqlx::test]
async fn test_root_lists_aliases(pool: sqlx::SqlitePool) {
    let mut test_app = helper::setup_test_app(pool).await;

    helper::maybe_generate(&mut test_app.app).await;
    helper::maybe_generate(&mut test_app.app).await;

    let aliases = helper::list_aliases(&mut test_app.app).await;
    let (deleted, active) = (&aliases[0], &aliases[1]);

    helper::call(&mut test_app.app, "delete", deleted.id).await;

    let (status_code, _, body) = helper::root(&mut test_app.app).await;
    assert_eq!(StatusCode::OK, status_code);

    // active first, even though it is older
    let active_position = body.find(&active.address).unwrap();
    let deleted_position = body.find(&deleted.address).unwrap();
    assert!(active_position < deleted_position);

    assert!(body.contains(&format!("/api/renew?id={}", active.id)));
    assert!(!body.contains(&format!("/api/renew?id={}", deleted.id)));
    assert!(body.contains(&format!("/api/recreate?id={}", deleted.id)));
}
