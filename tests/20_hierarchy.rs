mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn standard_division_cascade_and_reactivation() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;

    let division: Value = client
        .get(server.url(&format!("/api/divisions/{}", division_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(division["data"]["name"], "A");
    assert_eq!(division["data"]["fullName"], "6th Standard-A");
    assert_eq!(division["data"]["studentCount"], 0);

    // Same division name in any case is a duplicate
    let res = client
        .post(server.url("/api/divisions"))
        .bearer_auth(&token)
        .json(&json!({ "name": " A ", "standardId": standard_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "DUPLICATE_DIVISION");

    common::create_student(server, &client, &token, &standard_id, &division_id, "Meera").await?;
    common::create_student(server, &client, &token, &standard_id, &division_id, "Kabir").await?;

    let res = client
        .delete(server.url(&format!("/api/standards/{}", standard_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["deactivatedDivisions"], 1);
    assert_eq!(body["data"]["deactivatedStudents"], 2);

    let res = client
        .get(server.url(&format!("/api/standards/{}", standard_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Creating the same name again revives the old record
    let res = client
        .post(server.url("/api/standards"))
        .bearer_auth(&token)
        .json(&json!({ "name": "6th Standard" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Standard reactivated successfully");
    assert_eq!(body["data"]["id"], standard_id.as_str());
    Ok(())
}

#[tokio::test]
async fn teachers_cannot_see_each_others_classes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let owner = common::register_teacher(server, &client).await?;
    let other = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &owner).await?;

    let res = client
        .get(server.url(&format!("/api/standards/{}", standard_id)))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(server.url(&format!("/api/divisions/{}", division_id)))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let list: Value = client
        .get(server.url("/api/standards"))
        .bearer_auth(&other)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(0));

    // Adding a division under someone else's standard
    let res = client
        .post(server.url("/api/divisions"))
        .bearer_auth(&other)
        .json(&json!({ "name": "B", "standardId": standard_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn renaming_a_standard_refreshes_division_names() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, _) = common::create_class(server, &client, &token).await?;

    let res = client
        .put(server.url(&format!("/api/standards/{}", standard_id)))
        .bearer_auth(&token)
        .json(&json!({ "name": "7th Standard" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let divisions: Value = client
        .get(server.url(&format!("/api/divisions/by-standard/{}", standard_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(divisions["data"][0]["fullName"], "7th Standard-A");
    Ok(())
}
