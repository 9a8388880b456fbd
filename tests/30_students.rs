mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn student_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;

    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Meera Shah",
            "standardId": standard_id,
            "divisionId": division_id,
            "rollNumber": "7",
            "parentContact": { "phone": "9876543210", "email": "Parent@Mail.com" }
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let student_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["parentContact"]["email"], "parent@mail.com");

    // Roll number is unique within the division
    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Kabir", "standardId": standard_id, "divisionId": division_id, "rollNumber": "7" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "DUPLICATE_ROLL_NUMBER");

    // Without a roll number the next free one is assigned
    let body: Value = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Kabir", "standardId": standard_id, "divisionId": division_id }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["rollNumber"], "8");

    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Tara",
            "standardId": standard_id,
            "divisionId": division_id,
            "parentContact": { "phone": "12345" }
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let list: Value = client
        .get(server.url(&format!("/api/students?divisionId={}&page=1&limit=10", division_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list["data"]["students"].as_array().map(Vec::len), Some(2));
    assert_eq!(list["data"]["pagination"]["totalItems"], 2);

    let res = client
        .put(server.url(&format!("/api/students/{}", student_id)))
        .bearer_auth(&token)
        .json(&json!({ "name": "Meera S." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(server.url(&format!("/api/students/{}", student_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/api/students/{}", student_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn listing_another_teachers_division_is_forbidden() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let owner = common::register_teacher(server, &client).await?;
    let other = common::register_teacher(server, &client).await?;
    let (_, division_id) = common::create_class(server, &client, &owner).await?;

    let res = client
        .get(server.url(&format!("/api/students/by-division/{}", division_id)))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn import_reports_created_duplicates_and_errors() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;
    common::create_student(server, &client, &token, &standard_id, &division_id, "Existing").await?;

    let res = client
        .post(server.url("/api/students/import"))
        .bearer_auth(&token)
        .json(&json!({
            "standardId": standard_id,
            "divisionId": division_id,
            "students": [
                { "name": "Aarav", "rollNumber": 5.0, "dateOfBirth": "14/08/2012", "parentPhone": "+91 98765 43210" },
                { "name": "Diya", "uid": "STU-22" },
                { "name": "Clash", "rollNumber": "1" },
                { "rollNumber": "9" },
                { "name": "Bad Mail", "parentEmail": "not-an-email" }
            ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let data = &body["data"];

    assert_eq!(data["successCount"], 2);
    assert_eq!(data["duplicateCount"], 1);
    assert_eq!(data["errorCount"], 2);
    assert_eq!(data["duplicates"][0]["field"], "rollNumber");
    assert_eq!(data["errors"][0]["row"], 4);

    let aarav = &data["students"][0];
    assert_eq!(aarav["rollNumber"], "5");
    assert_eq!(aarav["dateOfBirth"], "2012-08-14");
    assert_eq!(aarav["parentContact"]["phone"], "9876543210");

    // Running counter continues after the highest existing roll number
    assert_eq!(data["students"][1]["rollNumber"], "2");
    Ok(())
}

#[tokio::test]
async fn empty_import_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;

    let res = client
        .post(server.url("/api/students/import"))
        .bearer_auth(&token)
        .json(&json!({ "standardId": standard_id, "divisionId": division_id, "students": [] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn roll_numbers_are_unique_per_division_only() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_a) = common::create_class(server, &client, &token).await?;

    let body: Value = client
        .post(server.url("/api/divisions"))
        .bearer_auth(&token)
        .json(&json!({ "name": "B", "standardId": standard_id }))
        .send()
        .await?
        .json()
        .await?;
    let division_b = body["data"]["id"].as_str().unwrap().to_string();

    let student = |division: &str| json!({ "name": "Roll One", "standardId": standard_id, "divisionId": division, "rollNumber": "1" });

    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&student(&division_a))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&student(&division_a))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url("/api/students"))
        .bearer_auth(&token)
        .json(&student(&division_b))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(())
}
