mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn pdf_part() -> Result<Part> {
    Ok(Part::bytes(b"%PDF-1.4 worksheet".to_vec())
        .file_name("worksheet.pdf")
        .mime_str("application/pdf")?)
}

#[tokio::test]
async fn upload_list_update_delete() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;
    let student_id = common::create_student(server, &client, &token, &standard_id, &division_id, "Meera").await?;

    let form = Form::new()
        .text("title", "Fractions worksheet")
        .text("studentId", student_id.clone())
        .text("subject", "Maths")
        .text("tags", "homework, fractions")
        .part("file", pdf_part()?);
    let res = client
        .post(server.url("/api/uploads"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let upload_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["type"], "document");
    assert_eq!(body["data"]["tags"], json!(["homework", "fractions"]));
    assert_eq!(body["data"]["file"]["originalName"], "worksheet.pdf");

    let list: Value = client
        .get(server.url(&format!("/api/uploads/student/{}?type=document", student_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list["data"]["uploads"].as_array().map(Vec::len), Some(1));

    let images: Value = client
        .get(server.url(&format!("/api/uploads/student/{}?type=image", student_id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(images["data"]["uploads"].as_array().map(Vec::len), Some(0));

    let res = client
        .get(server.url(&format!("/api/uploads/student/{}?type=audio", student_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url(&format!("/api/uploads/{}", upload_id)))
        .bearer_auth(&token)
        .json(&json!({ "title": "Fractions (revised)", "tags": ["revision"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["tags"], json!(["revision"]));

    let res = client
        .delete(server.url(&format!("/api/uploads/{}", upload_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/api/uploads/{}", upload_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn upload_requires_file_and_allowed_type() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;
    let student_id = common::create_student(server, &client, &token, &standard_id, &division_id, "Kabir").await?;

    let form = Form::new().text("title", "No file").text("studentId", student_id.clone());
    let res = client
        .post(server.url("/api/uploads"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "No file uploaded");

    let script = Part::bytes(b"#!/bin/sh".to_vec())
        .file_name("run.sh")
        .mime_str("application/x-sh")?;
    let form = Form::new()
        .text("title", "Script")
        .text("studentId", student_id)
        .part("file", script);
    let res = client
        .post(server.url("/api/uploads"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn student_profile_picture() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::register_teacher(server, &client).await?;
    let (standard_id, division_id) = common::create_class(server, &client, &token).await?;
    let student_id = common::create_student(server, &client, &token, &standard_id, &division_id, "Diya").await?;

    let image = Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("diya.png")
        .mime_str("image/png")?;
    let res = client
        .post(server.url(&format!("/api/students/{}/profile-picture", student_id)))
        .bearer_auth(&token)
        .multipart(Form::new().part("profilePicture", image))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["data"]["profilePicture"]["url"].as_str().is_some());
    Ok(())
}
